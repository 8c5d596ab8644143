//! Encrypted credential file.

use crate::error::{ClientError, ClientResult};
use larder_core::crypto::{self, CredentialRecord};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads and writes the sealed credential record.
///
/// With no path configured every load returns `None` and every store is a
/// no-op.
pub struct CredentialStore {
    path: Option<PathBuf>,
    secret: String,
}

impl CredentialStore {
    /// Creates a store sealing records with `secret`.
    pub fn new(path: Option<PathBuf>, secret: impl Into<String>) -> Self {
        Self {
            path,
            secret: secret.into(),
        }
    }

    /// Returns the configured path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads the record. A missing file is `Ok(None)`.
    pub async fn load(&self) -> ClientResult<Option<CredentialRecord>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let blob = match tokio::fs::read(path).await {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::persistence(format!(
                    "read {}: {e}",
                    path.display()
                )))
            }
        };

        crypto::decrypt(&blob, &self.secret)
            .map(Some)
            .map_err(|e| ClientError::persistence(format!("open {}: {e}", path.display())))
    }

    /// Seals and writes the record, creating parent directories.
    pub async fn store(&self, record: &CredentialRecord) -> ClientResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let blob = crypto::encrypt(record, &self.secret)
            .map_err(|e| ClientError::persistence(format!("seal record: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ClientError::persistence(format!("create {}: {e}", parent.display()))
            })?;
        }

        tokio::fs::write(path, blob)
            .await
            .map_err(|e| ClientError::persistence(format!("write {}: {e}", path.display())))
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record() -> CredentialRecord {
        CredentialRecord {
            client_id: Some("c0ffee".into()),
            access_token: Some("a1".into()),
            refresh_token: Some("r1".into()),
        }
    }

    #[tokio::test]
    async fn disabled_store() {
        let store = CredentialStore::new(None, "pw");
        store.store(&record()).await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_is_no_record() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(Some(dir.path().join("creds.json")), "pw");
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("creds.json");
        let store = CredentialStore::new(Some(path.clone()), "pw");

        store.store(&record()).await.unwrap();
        assert!(path.exists());
        assert_eq!(store.load().await.unwrap(), Some(record()));
    }

    #[tokio::test]
    async fn wrong_secret_is_persistence_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("creds.json");
        CredentialStore::new(Some(path.clone()), "first")
            .store(&record())
            .await
            .unwrap();

        let err = CredentialStore::new(Some(path), "second")
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Persistence(_)));
    }

    #[test]
    fn debug_redacts_secret() {
        let store = CredentialStore::new(None, "hunter2");
        assert!(!format!("{store:?}").contains("hunter2"));
    }
}
