use serde::Serialize;
use uuid::Uuid;

/// アップロード済みサムネイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedThumbnail {
    /// 一辺のピクセル数
    pub size: u32,
    /// コンテナ内の Blob 名（例: "x32/<id>.png"）
    pub blob_name: String,
    pub byte_len: usize,
}

/// 1件のコンテンツアイテムに対する生成結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailReport {
    pub content_item_id: Uuid,
    pub source_width: u32,
    pub source_height: u32,
    pub thumbnails: Vec<UploadedThumbnail>,
}

/// サムネイル生成をスキップした理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    MissingUri,
    NotAnImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ThumbnailOutcome {
    Generated(ThumbnailReport),
    Skipped {
        #[serde(rename = "contentItemId")]
        content_item_id: Uuid,
        reason: SkipReason,
    },
}

impl ThumbnailOutcome {
    pub fn content_item_id(&self) -> Uuid {
        match self {
            Self::Generated(report) => report.content_item_id,
            Self::Skipped { content_item_id, .. } => *content_item_id,
        }
    }
}
