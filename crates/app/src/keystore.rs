use std::io::Write;
use std::path::{Path, PathBuf};

use common::crypto::{KeyPair, KeyStore};
use common::envelope::UserId;

#[derive(Debug, thiserror::Error)]
pub enum FileKeyStoreError {
    #[error("key file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("key file {0} is unreadable: {1}")]
    Corrupt(PathBuf, serde_json::Error),
    #[error("failed to encode key pair: {0}")]
    Encode(serde_json::Error),
}

/// One JSON file per identity under `keys/`
///
/// Saves go through a temp file in the same directory followed by a
/// rename, so a reader sees either the old pair or the new one.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, identity: UserId) -> PathBuf {
        self.dir.join(format!("{}.json", identity))
    }
}

impl KeyStore for FileKeyStore {
    type Error = FileKeyStoreError;

    fn load(&self, identity: UserId) -> Result<Option<KeyPair>, Self::Error> {
        let path = self.path_for(identity);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let pair = serde_json::from_str(&raw).map_err(|e| FileKeyStoreError::Corrupt(path, e))?;
        Ok(Some(pair))
    }

    fn save(&self, identity: UserId, pair: &KeyPair) -> Result<(), Self::Error> {
        std::fs::create_dir_all(&self.dir)?;
        let encoded = serde_json::to_vec_pretty(pair).map_err(FileKeyStoreError::Encode)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(identity))
            .map_err(|e| FileKeyStoreError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(tmp.path());
        let pair = store.load_or_generate(4).unwrap();

        let reopened = FileKeyStore::new(tmp.path());
        assert_eq!(reopened.load(4).unwrap(), Some(pair.clone()));
        assert_eq!(reopened.load_or_generate(4).unwrap(), pair);
    }

    #[test]
    fn test_missing_identity_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(tmp.path());
        assert!(store.load(1).unwrap().is_none());
    }

    #[test]
    fn test_regenerate_overwrites_without_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(tmp.path());
        let first = store.load_or_generate(9).unwrap();
        let second = store.regenerate(9).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.load(9).unwrap(), Some(second));
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(tmp.path());
        std::fs::write(store.path_for(2), "{\"private_key\": \"nope\"}").unwrap();

        assert!(matches!(
            store.load(2),
            Err(FileKeyStoreError::Corrupt(_, _))
        ));
    }
}
