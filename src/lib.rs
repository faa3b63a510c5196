pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod generator;
pub mod image_utils;
pub mod logging;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::ThumbnailerConfig;
pub use error::{ConfigError, FetchError, StorageError, ThumbnailError};
pub use fetch::{HttpImageFetcher, ImageFetcher};
pub use generator::ThumbnailGenerator;
pub use storage::{AzureBlobStore, BlobStore, DiskBlobStore, MemoryBlobStore, StorageAccount};
pub use types::{ContentItem, SkipReason, ThumbnailOutcome, ThumbnailReport, UploadedThumbnail};
