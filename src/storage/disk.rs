use std::path::{Component, Path, PathBuf};
use async_trait::async_trait;
use tracing::debug;
use super::BlobStore;
use crate::error::StorageError;

// ローカルディレクトリに Blob を書き出す（{root}/{container}/{name}）
pub struct DiskBlobStore {
    pub root: PathBuf,
}

impl DiskBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // 既定の保存先（ユーザーのキャッシュディレクトリ配下）
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("content-thumbnailer")
            .join("blobs")
    }

    // コンテナは直下の1階層のみ
    fn container_dir(&self, container: &str) -> Result<PathBuf, StorageError> {
        let mut components = Path::new(container).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(container)),
            _ => Err(StorageError::Internal(format!("無効なコンテナ名: {}", container))),
        }
    }

    fn blob_path(&self, container: &str, name: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(name);
        // ルート外への書き込みを防ぐ
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::Internal(format!("無効な Blob 名: {}", name)));
        }
        Ok(self.container_dir(container)?.join(relative))
    }
}

impl Default for DiskBlobStore {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(self.container_dir(container)?).await?;
        Ok(())
    }

    async fn put_blob(
        &self,
        container: &str,
        name: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.blob_path(container, name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        debug!(path = %path.display(), bytes = data.len(), "Blob を書き出し");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_blobs_under_container_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path());

        store.ensure_container("images").await.unwrap();
        store
            .put_blob("images", "x8/abc.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("images").join("x8").join("abc.png")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn overwrites_existing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path());

        store.put_blob("images", "a.png", vec![1], "image/png").await.unwrap();
        store.put_blob("images", "a.png", vec![2, 2], "image/png").await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("images/a.png")).unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn rejects_names_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlobStore::new(dir.path());

        let err = store
            .put_blob("images", "../outside.png", vec![0], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Internal(_)));
    }

    #[tokio::test]
    async fn rejects_containers_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("blobs");
        let store = DiskBlobStore::new(&root);

        for container in ["..", "../outside", "a/b", "/tmp", ""] {
            assert!(
                matches!(
                    store.ensure_container(container).await,
                    Err(StorageError::Internal(_))
                ),
                "accepted container {:?}",
                container
            );
            assert!(matches!(
                store.put_blob(container, "a.png", vec![0], "image/png").await,
                Err(StorageError::Internal(_))
            ));
        }
        assert!(!dir.path().join("outside").exists());
        assert!(!root.exists());
    }
}
