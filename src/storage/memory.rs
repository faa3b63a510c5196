use std::collections::HashMap;
use std::sync::Mutex;
use async_trait::async_trait;
use super::{BlobStore, PUBLIC_ACCESS_BLOB};
use crate::error::StorageError;

/// メモリ上の Blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: String,
}

struct ContainerRecord {
    // 匿名アクセスレベル（"blob" など、None は非公開）
    public_access: Option<String>,
    // ensure_container の呼び出し回数
    requests: usize,
}

#[derive(Default)]
struct Inner {
    containers: HashMap<String, ContainerRecord>,
    blobs: HashMap<(String, String), StoredBlob>,
}

// プロセス内の Blob ストア（ドライラン・テスト用）
#[derive(Default)]
pub struct MemoryBlobStore {
    inner: Mutex<Inner>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Internal(format!("ロック取得失敗: {}", e)))
    }

    pub fn get(&self, container: &str, name: &str) -> Option<StoredBlob> {
        self.lock()
            .ok()?
            .blobs
            .get(&(container.to_string(), name.to_string()))
            .cloned()
    }

    /// コンテナ内の Blob 名（昇順）
    pub fn blob_names(&self, container: &str) -> Vec<String> {
        let Ok(inner) = self.lock() else {
            return Vec::new();
        };
        let mut names: Vec<String> = inner
            .blobs
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        names
    }

    /// 既存コンテナとして登録（ensure_container の回数には数えない）
    pub fn insert_container(&self, container: &str, public_access: Option<&str>) {
        if let Ok(mut inner) = self.lock() {
            inner.containers.insert(
                container.to_string(),
                ContainerRecord {
                    public_access: public_access.map(str::to_string),
                    requests: 0,
                },
            );
        }
    }

    pub fn container_requests(&self, container: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|inner| inner.containers.get(container).map(|c| c.requests))
            .unwrap_or(0)
    }

    /// コンテナの匿名アクセスレベル（コンテナが無い・非公開なら None）
    pub fn container_access(&self, container: &str) -> Option<String> {
        self.lock()
            .ok()?
            .containers
            .get(container)
            .and_then(|c| c.public_access.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        // 新規作成時のみ Blob 公開。既存のアクセスレベルは変えない
        self.lock()?
            .containers
            .entry(container.to_string())
            .or_insert_with(|| ContainerRecord {
                public_access: Some(PUBLIC_ACCESS_BLOB.to_string()),
                requests: 0,
            })
            .requests += 1;
        Ok(())
    }

    async fn put_blob(
        &self,
        container: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        if !inner.containers.contains_key(container) {
            return Err(StorageError::Request {
                operation: "Blob アップロード",
                status: 404,
                message: "ContainerNotFound".to_string(),
            });
        }
        inner.blobs.insert(
            (container.to_string(), name.to_string()),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
