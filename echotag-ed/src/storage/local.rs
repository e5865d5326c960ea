//! Filesystem audio source

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::{AudioSource, FetchError};

/// Reads batch paths relative to a root directory
#[derive(Debug, Clone)]
pub struct LocalAudioSource {
    root: PathBuf,
}

impl LocalAudioSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join `path` onto the root, refusing anything that could leave it
    fn resolve(&self, path: &str) -> Result<PathBuf, FetchError> {
        if path.trim().is_empty() {
            return Err(FetchError::InvalidPath("empty path".to_string()));
        }

        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(FetchError::InvalidPath(format!(
                        "parent directory references are not allowed: {}",
                        path
                    )))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(FetchError::InvalidPath(format!(
                        "absolute paths are not allowed: {}",
                        path
                    )))
                }
            }
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AudioSource for LocalAudioSource {
    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let full_path = self.resolve(path)?;
        tracing::debug!(file_path = %path, resolved = %full_path.display(), "Reading local audio");

        tokio::fs::read(&full_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound(path.to_string()),
            _ => FetchError::Io(format!("{}: {}", full_path.display(), e)),
        })
    }
}
