// サムネイル設定（正方形・PNG形式）
pub const THUMBNAIL_SIZES: [u32; 5] = [8, 16, 32, 64, 128];
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/png";

// 画像サイズ制限（DoS防止）
pub const MAX_IMAGE_DIMENSION: u32 = 65535;      // 最大辺長
pub const MAX_PIXEL_COUNT: u64 = 100_000_000;    // 最大ピクセル数（100メガピクセル）

// 取得するソース画像の最大バイト数
pub const MAX_SOURCE_CONTENT_LENGTH: u64 = 10_000_000;

// サムネイル対象のメディアタイプ（大文字小文字は区別しない）
pub const THUMBNAIL_MEDIA_TYPES: &[&str] = &["image", "skydrive-image"];

// デフォルト設定
pub const DEFAULT_CONTAINER: &str = "images";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const STORAGE_ENV_VAR: &str = "THUMBNAILS_STORAGE";
