//! Upload directory storage
//!
//! Files are keyed only by their sanitized client-supplied name. A second
//! upload under the same name replaces the first.

use std::path::{Path, PathBuf};

use tokio::fs;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Device names Windows refuses to use as file names, regardless of extension
const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3",
];

/// A file written by [`UploadStore::save`]
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    pub size: usize,
}

/// Flat directory of uploaded files
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Open the store, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        tracing::debug!(dir = %root.display(), "Upload directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under the sanitized form of `client_name`.
    ///
    /// Returns `Ok(None)` without touching the disk when nothing usable is
    /// left of the name. The bytes land in a temporary file first and are
    /// renamed into place, so readers never see a partial file.
    pub async fn save(&self, client_name: &str, data: &[u8]) -> Result<Option<StoredFile>> {
        let Some(name) = secure_filename(client_name) else {
            return Ok(None);
        };

        let path = self.root.join(&name);
        if path.parent() != Some(self.root.as_path()) {
            return Err(AppError::Internal(format!(
                "Sanitized name escaped upload directory: {}",
                name
            )));
        }

        let temp = self.root.join(format!(".{}.part", Uuid::new_v4()));
        if let Err(e) = fs::write(&temp, data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        Ok(Some(StoredFile {
            name,
            path,
            size: data.len(),
        }))
    }
}

/// Reduce a client-supplied file name to something safe to join onto the upload directory.
///
/// Accented letters are decomposed so their ASCII base survives, path
/// separators become word breaks, words are joined with `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing dots and
/// underscores are trimmed. `None` means nothing usable was left.
pub fn secure_filename(raw: &str) -> Option<String> {
    let spaced: String = raw
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return None;
    }

    let stem = trimmed.split('.').next().unwrap_or(trimmed);
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
    {
        return Some(format!("_{}", trimmed));
    }

    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_secure_filename_strips_traversal() {
        assert_eq!(secure_filename("../../etc/passwd").as_deref(), Some("etc_passwd"));
        assert_eq!(
            secure_filename("..\\..\\windows\\system32\\drivers").as_deref(),
            Some("windows_system32_drivers")
        );
        assert_eq!(secure_filename("/absolute/path.txt").as_deref(), Some("absolute_path.txt"));
    }

    #[test]
    fn test_secure_filename_cleans_characters() {
        assert_eq!(secure_filename("My cool movie.mov").as_deref(), Some("My_cool_movie.mov"));
        assert_eq!(secure_filename("report.txt").as_deref(), Some("report.txt"));
        assert_eq!(secure_filename("a;b$c|d.txt").as_deref(), Some("abcd.txt"));
        assert_eq!(secure_filename(".hidden").as_deref(), Some("hidden"));
    }

    #[test]
    fn test_secure_filename_keeps_accented_letters() {
        assert_eq!(secure_filename("café.txt").as_deref(), Some("cafe.txt"));
        assert_eq!(secure_filename("résumé.pdf").as_deref(), Some("resume.pdf"));
        assert_eq!(secure_filename("naïve file.txt").as_deref(), Some("naive_file.txt"));
        // Compatibility forms fold to their plain letters
        assert_eq!(secure_filename("ﬁle.txt").as_deref(), Some("file.txt"));
    }

    #[test]
    fn test_secure_filename_empty_results() {
        assert_eq!(secure_filename(""), None);
        assert_eq!(secure_filename(".."), None);
        assert_eq!(secure_filename("../.."), None);
        assert_eq!(secure_filename("日本語"), None);
    }

    #[test]
    fn test_secure_filename_device_names() {
        assert_eq!(secure_filename("nul").as_deref(), Some("_nul"));
        assert_eq!(secure_filename("CON.txt").as_deref(), Some("_CON.txt"));
        assert_eq!(secure_filename("console.txt").as_deref(), Some("console.txt"));
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("uploads");

        let store = UploadStore::open(&root).await.unwrap();
        assert!(store.root().is_dir());

        // Opening again is fine
        UploadStore::open(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_stays_inside_root() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::open(temp.path().join("uploads")).await.unwrap();

        let stored = store
            .save("../../etc/passwd", b"root:x:0:0")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stored.name, "etc_passwd");
        assert_eq!(stored.path.parent(), Some(store.root()));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"root:x:0:0");
        assert!(!temp.path().join("etc").exists());
    }

    #[tokio::test]
    async fn test_save_last_write_wins() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::open(temp.path()).await.unwrap();

        store.save("report.txt", b"first").await.unwrap();
        store.save("report.txt", b"second").await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read(temp.path().join("report.txt")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_save_unusable_name_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::open(temp.path()).await.unwrap();

        assert!(store.save("..", b"data").await.unwrap().is_none());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
