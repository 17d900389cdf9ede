//! Observable state cells
//!
//! A thin wrapper over `tokio::sync::watch` so UI layers can read the latest
//! value or subscribe to changes without knowing who mutates it.

use tokio::sync::watch;

/// A value with change notification
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate in place and notify subscribers
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// Read without cloning
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Subscribe to future changes
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let cell = Observable::new(1u32);
        let mut rx = cell.subscribe();

        cell.update(|v| *v += 1);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn test_set_without_subscribers() {
        let cell = Observable::new(String::from("idle"));
        cell.set("loading".to_string());
        assert_eq!(cell.with(|s| s.len()), 7);
    }
}
