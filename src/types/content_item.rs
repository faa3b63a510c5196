use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::constants::THUMBNAIL_MEDIA_TYPES;

// コンテンツアイテム（ソース画像を URL で参照する）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: Uuid,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ContentItem {
    pub fn new(id: Uuid, media_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id,
            media_type: media_type.into(),
            uri: Some(uri.into()),
            title: None,
        }
    }

    /// 画像メディアタイプかどうか（大文字小文字を区別しない）
    pub fn is_image(&self) -> bool {
        THUMBNAIL_MEDIA_TYPES
            .iter()
            .any(|t| self.media_type.eq_ignore_ascii_case(t))
    }

    /// サムネイル生成の対象か（URI があり、画像メディアタイプ）
    pub fn is_thumbnail_source(&self) -> bool {
        self.uri.is_some() && self.is_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(media_type: &str, uri: Option<&str>) -> ContentItem {
        ContentItem {
            id: Uuid::nil(),
            media_type: media_type.to_string(),
            uri: uri.map(str::to_string),
            title: None,
        }
    }

    #[test]
    fn image_media_types_are_case_insensitive() {
        assert!(item("Image", Some("http://a/b.png")).is_thumbnail_source());
        assert!(item("IMAGE", Some("http://a/b.png")).is_thumbnail_source());
        assert!(item("SkyDrive-Image", Some("http://a/b.png")).is_thumbnail_source());
    }

    #[test]
    fn other_media_types_are_not_sources() {
        assert!(!item("video", Some("http://a/b.mp4")).is_thumbnail_source());
        assert!(!item("pdf", Some("http://a/b.pdf")).is_thumbnail_source());
        assert!(!item("image-ish", Some("http://a/b.png")).is_thumbnail_source());
    }

    #[test]
    fn missing_uri_is_not_a_source() {
        assert!(!item("image", None).is_thumbnail_source());
    }

    #[test]
    fn deserializes_camel_case_json() {
        let json = r#"{
            "id": "0b7e1d1c-3f43-4d33-9d0b-9a3c2a1f5e77",
            "mediaType": "image",
            "uri": "https://example.com/a.jpg"
        }"#;
        let parsed: ContentItem = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.media_type, "image");
        assert_eq!(parsed.uri.as_deref(), Some("https://example.com/a.jpg"));
        assert_eq!(parsed.title, None);
    }
}
