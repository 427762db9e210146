use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use ow_core::ports::PassphrasePort;
use ow_core::security::SecretString;

/// Wallet database passphrase kept in a single owner-only file.
///
/// A missing or blank file means no passphrase has been set up.
pub struct FilePassphraseStore {
    path: PathBuf,
}

impl FilePassphraseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PassphrasePort for FilePassphraseStore {
    async fn load(&self) -> Result<Option<SecretString>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => SecretString::new(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read passphrase failed: {}", self.path.display()))
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = tokio::fs::metadata(&self.path).await {
                if metadata.permissions().mode() & 0o077 != 0 {
                    warn!(
                        path = %self.path.display(),
                        "passphrase file is readable by other users"
                    );
                }
            }
        }

        let trimmed = content.expose().trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(trimmed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_means_no_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePassphraseStore::new(dir.path().join("passphrase"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn trailing_newline_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passphrase");
        std::fs::write(&path, "correct horse battery staple\n").unwrap();

        let secret = FilePassphraseStore::new(&path).load().await.unwrap().unwrap();

        assert_eq!(secret.expose(), "correct horse battery staple");
    }

    #[tokio::test]
    async fn blank_file_means_no_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passphrase");
        std::fs::write(&path, "\n").unwrap();

        assert!(FilePassphraseStore::new(&path).load().await.unwrap().is_none());
    }
}
