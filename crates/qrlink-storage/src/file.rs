use async_trait::async_trait;
use qrlink_core::error::{Result, StorageError};
use qrlink_core::KeyValueStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// File-backed [`KeyValueStore`].
///
/// Each key is stored as `<dir>/<key>.json`. Writes go to a sibling
/// temporary file that is then renamed over the target, so a crash never
/// leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::Unavailable(format!(
                "key is not a valid file name: '{key}'"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn map_io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {err}", path.display()))
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(value) => Ok(Some(value)),
                Err(err) => {
                    // Hand the damaged text to the caller, which treats
                    // unparsable content as empty.
                    warn!(path = %path.display(), "stored value is not valid utf-8");
                    Ok(Some(String::from_utf8_lossy(err.as_bytes()).into_owned()))
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "no stored value");
                Ok(None)
            }
            Err(err) => Err(map_io_error(&path, err)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| map_io_error(&self.dir, e))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| map_io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| map_io_error(&path, e))?;

        trace!(path = %path.display(), "stored value");
        Ok(())
    }
}
