use thiserror::Error;

/// ソース画像取得のエラー
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("無効なURL: {0}")]
    InvalidUrl(String),

    #[error("画像URLの取得に失敗: {url} (HTTP {status})")]
    Status { url: String, status: u16 },

    #[error("ソース画像が大きすぎます: {size} bytes (最大: {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("HTTPリクエストエラー: {0}")]
    Http(#[from] reqwest::Error),
}

/// Blobストレージのエラー
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("無効な接続文字列: {0}")]
    InvalidConnectionString(String),

    #[error("ストレージ要求に失敗: {operation} (HTTP {status}): {message}")]
    Request {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTPリクエストエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ファイル書き込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("ストレージ内部エラー: {0}")]
    Internal(String),
}

/// 設定ファイルのエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("設定ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("設定ファイル解析エラー: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("無効な設定: {0}")]
    Invalid(String),
}

/// サムネイル生成全体のエラー
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("ストレージが設定されていません")]
    StorageNotConfigured,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("画像読み込みエラー: {0}")]
    Decode(#[from] image::ImageError),

    #[error("無効な画像: {0}")]
    InvalidImage(String),

    #[error("画像処理タスクエラー: {0}")]
    Task(#[from] tokio::task::JoinError),
}
