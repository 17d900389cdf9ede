//! Shared test utilities for settings
//!
//! Provides test_preferences(), backed by an in-memory database with the
//! full schema applied.

use super::{Database, Preferences, SettingsStore};

/// Create preferences over a fresh in-memory database
pub async fn test_preferences() -> Preferences {
    let db = Database::new(None)
        .await
        .expect("Failed to create test database");
    Preferences::new(SettingsStore::new(db.pool().clone()))
}
