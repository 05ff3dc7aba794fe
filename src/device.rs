use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Source of the per-install identifier sent as `X-Device-Id`
#[async_trait]
pub trait DeviceIdentity: Send + Sync {
    /// Return the persisted identifier, creating it on first use
    async fn get_or_create(&self) -> Result<String>;
}

/// Device identity persisted as a plain file under the data directory
#[derive(Debug)]
pub struct FileDeviceIdentity {
    path: PathBuf,
    cached: OnceCell<String>,
}

impl FileDeviceIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceCell::new(),
        }
    }

    /// Identity stored at `<data_dir>/device_id`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("device_id"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_or_generate(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if !contents.trim().is_empty() => {
                debug!("Loaded device id from {}", self.path.display());
                return Ok(contents.trim().to_string());
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let device_id = uuid::Uuid::new_v4().to_string();
        // An unwritable store still yields an id that is stable for this process
        if let Err(err) = self.persist(&device_id).await {
            warn!(
                "Failed to persist device id to {}: {}",
                self.path.display(),
                err
            );
        } else {
            info!("Generated new device id at {}", self.path.display());
        }
        Ok(device_id)
    }

    async fn persist(&self, device_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, device_id).await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceIdentity for FileDeviceIdentity {
    async fn get_or_create(&self) -> Result<String> {
        self.cached
            .get_or_try_init(|| self.load_or_generate())
            .await
            .cloned()
    }
}

/// Fixed identity, useful when the host platform already supplies one
#[derive(Debug, Clone)]
pub struct StaticDeviceIdentity(pub String);

#[async_trait]
impl DeviceIdentity for StaticDeviceIdentity {
    async fn get_or_create(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_generates_and_persists() {
        let dir = tempdir().unwrap();
        let identity = FileDeviceIdentity::in_dir(dir.path());

        let first = identity.get_or_create().await.unwrap();
        let second = identity.get_or_create().await.unwrap();
        assert_eq!(first, second);

        let on_disk = std::fs::read_to_string(dir.path().join("device_id")).unwrap();
        assert_eq!(on_disk, first);
    }

    #[tokio::test]
    async fn test_reuses_existing_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("device_id"), "device-abc\n").unwrap();

        let identity = FileDeviceIdentity::in_dir(dir.path());
        assert_eq!(identity.get_or_create().await.unwrap(), "device-abc");
    }

    #[tokio::test]
    async fn test_creates_missing_parent_dirs() {
        let dir = tempdir().unwrap();
        let identity = FileDeviceIdentity::new(dir.path().join("nested/store/device_id"));

        let id = identity.get_or_create().await.unwrap();
        assert!(!id.is_empty());
        assert!(identity.path().exists());
    }

    #[tokio::test]
    async fn test_unreadable_path_is_an_error() {
        let dir = tempdir().unwrap();
        // A directory where the file should be cannot be read as a string
        let identity = FileDeviceIdentity::new(dir.path());
        assert!(identity.get_or_create().await.is_err());
    }

    #[test]
    fn test_static_identity() {
        let identity = StaticDeviceIdentity("fixed".to_string());
        let id = tokio_test::block_on(identity.get_or_create()).unwrap();
        assert_eq!(id, "fixed");
    }
}
