mod azure;
mod connection;
mod disk;
mod memory;

pub use azure::AzureBlobStore;
pub use connection::{StorageAccount, StorageCredentials};
pub use disk::DiskBlobStore;
pub use memory::{MemoryBlobStore, StoredBlob};

use async_trait::async_trait;
use crate::error::StorageError;

/// 新規コンテナの匿名アクセスレベル（Blob 単位の読み取りのみ）
pub const PUBLIC_ACCESS_BLOB: &str = "blob";

/// Blob ストレージのポート
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// コンテナが無ければ作成する（Blob は匿名で読み取り可能）。既存のコンテナはそのまま。
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError>;

    /// Blob をアップロード（同名があれば上書き）
    async fn put_blob(
        &self,
        container: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}
