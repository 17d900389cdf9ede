//! Saved views
//!
//! Generated images are written as `viewpoint_<unix millis>.png` into the
//! gallery directory, which is created on first save. A name already taken
//! gets a `_<n>` suffix; existing files are never overwritten.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Suffixes tried before giving up on a crowded millisecond
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Outcome of saving an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    Saved { path: PathBuf },
    Failed { message: String },
}

/// Directory of saved views
#[derive(Debug, Clone)]
pub struct Gallery {
    dir: PathBuf,
}

impl Gallery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for an image saved at the given time
    pub fn generated_filename(unix_millis: i64) -> String {
        format!("viewpoint_{}.png", unix_millis)
    }

    /// File name for the `attempt`th save within the same millisecond
    fn candidate_filename(unix_millis: i64, attempt: u32) -> String {
        match attempt {
            0 => Self::generated_filename(unix_millis),
            n => format!("viewpoint_{}_{}.png", unix_millis, n),
        }
    }

    /// Create a file that did not exist before and write the bytes to it
    async fn write_new(&self, unix_millis: i64, bytes: &[u8]) -> std::io::Result<PathBuf> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(Self::candidate_filename(unix_millis, attempt));
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next name", path.display());
                    continue;
                }
                Err(e) => return Err(e),
            };
            file.write_all(bytes).await?;
            file.flush().await?;
            return Ok(path);
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "no free file name for this timestamp",
        ))
    }

    /// Save image bytes
    pub async fn save(&self, bytes: &[u8]) -> SaveResult {
        if bytes.is_empty() {
            return SaveResult::Failed {
                message: "No image to save".to_string(),
            };
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Failed to create gallery {}: {}", self.dir.display(), e);
            return SaveResult::Failed {
                message: format!("Failed to save image: {}", e),
            };
        }

        let now = chrono::Utc::now().timestamp_millis();
        match self.write_new(now, bytes).await {
            Ok(path) => {
                info!("Saved view to {} ({} bytes)", path.display(), bytes.len());
                SaveResult::Saved { path }
            }
            Err(e) => {
                warn!("Failed to save view in {}: {}", self.dir.display(), e);
                SaveResult::Failed {
                    message: format!("Failed to save image: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename() {
        assert_eq!(
            Gallery::generated_filename(1_700_000_000_123),
            "viewpoint_1700000000123.png"
        );
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path().join("nested").join("gallery"));

        let SaveResult::Saved { path } = gallery.save(b"png bytes").await else {
            panic!("expected Saved");
        };
        assert_eq!(path.parent(), Some(gallery.dir()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("viewpoint_"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn test_same_millisecond_saves_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path());

        let first = gallery.write_new(42, b"first").await.unwrap();
        let second = gallery.write_new(42, b"second").await.unwrap();
        let third = gallery.write_new(42, b"third").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "viewpoint_42.png");
        assert_eq!(second.file_name().unwrap(), "viewpoint_42_1.png");
        assert_eq!(third.file_name().unwrap(), "viewpoint_42_2.png");
        assert_eq!(std::fs::read(&first).unwrap(), b"first");
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_save_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the directory should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();

        let gallery = Gallery::new(&blocked);
        assert!(matches!(
            gallery.save(b"png").await,
            SaveResult::Failed { .. }
        ));
        assert!(matches!(
            Gallery::new(dir.path()).save(b"").await,
            SaveResult::Failed { .. }
        ));
    }
}
