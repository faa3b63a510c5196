use std::sync::Arc;
use image::DynamicImage;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;
use crate::config::ThumbnailerConfig;
use crate::constants::THUMBNAIL_CONTENT_TYPE;
use crate::error::ThumbnailError;
use crate::fetch::{HttpImageFetcher, ImageFetcher};
use crate::image_utils::{decode_source, render_all, render_thumbnail, thumbnail_blob_name};
use crate::storage::{AzureBlobStore, BlobStore};
use crate::types::{ContentItem, SkipReason, ThumbnailOutcome, ThumbnailReport, UploadedThumbnail};

/// コンテンツアイテムのサムネイルを生成してストレージへアップロードする
pub struct ThumbnailGenerator {
    fetcher: Arc<dyn ImageFetcher>,
    store: Arc<dyn BlobStore>,
    container: String,
    container_ready: OnceCell<()>,
}

impl ThumbnailGenerator {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        store: Arc<dyn BlobStore>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            store,
            container: container.into(),
            container_ready: OnceCell::new(),
        }
    }

    /// 設定から HTTP 取得 + Azure ストレージの生成器を作る
    pub fn from_config(config: &ThumbnailerConfig) -> Result<Self, ThumbnailError> {
        let storage = config
            .storage
            .as_deref()
            .ok_or(ThumbnailError::StorageNotConfigured)?;
        let store = AzureBlobStore::from_connection_string(storage, config.request_timeout())?;
        Self::with_store(config, Arc::new(store))
    }

    /// 設定から HTTP 取得器を作り、任意のストアと組み合わせる
    pub fn with_store(
        config: &ThumbnailerConfig,
        store: Arc<dyn BlobStore>,
    ) -> Result<Self, ThumbnailError> {
        let fetcher = HttpImageFetcher::new(
            config.request_timeout(),
            &config.user_agent,
            config.max_source_bytes,
        )?;
        Ok(Self::new(Arc::new(fetcher), store, config.container.clone()))
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    // コンテナの存在確認は生成器ごとに一度だけ
    async fn ensure_container(&self) -> Result<(), ThumbnailError> {
        self.container_ready
            .get_or_try_init(|| self.store.ensure_container(&self.container))
            .await?;
        Ok(())
    }

    /// サムネイルを全サイズ生成してアップロード
    #[tracing::instrument(skip(self, item), fields(content_item_id = %item.id))]
    pub async fn create_thumbnails(&self, item: &ContentItem) -> Result<ThumbnailOutcome, ThumbnailError> {
        let Some(uri) = item.uri.as_deref() else {
            warn!("URI が無いためスキップ");
            return Ok(ThumbnailOutcome::Skipped {
                content_item_id: item.id,
                reason: SkipReason::MissingUri,
            });
        };
        if !item.is_image() {
            warn!(media_type = %item.media_type, "画像ではないためスキップ");
            return Ok(ThumbnailOutcome::Skipped {
                content_item_id: item.id,
                reason: SkipReason::NotAnImage,
            });
        }

        self.ensure_container().await?;

        let data = self.fetcher.fetch_image(uri).await?;

        // デコードとリサイズは重いのでブロッキングスレッドで
        let (source_width, source_height, rendered) = tokio::task::spawn_blocking(move || {
            let img = decode_source(&data)?;
            let rendered = render_all(&img)?;
            Ok::<_, ThumbnailError>((img.width(), img.height(), rendered))
        })
        .await??;

        let mut thumbnails = Vec::with_capacity(rendered.len());
        for (size, png) in rendered {
            thumbnails.push(self.upload_thumbnail(&item.id, size, png).await?);
        }

        info!(count = thumbnails.len(), source_width, source_height, "サムネイル生成完了");
        Ok(ThumbnailOutcome::Generated(ThumbnailReport {
            content_item_id: item.id,
            source_width,
            source_height,
            thumbnails,
        }))
    }

    /// 1サイズ分のサムネイルを生成してアップロード
    pub async fn save_upload_thumbnail(
        &self,
        img: &DynamicImage,
        id: &Uuid,
        size: u32,
    ) -> Result<UploadedThumbnail, ThumbnailError> {
        self.ensure_container().await?;
        let png = render_thumbnail(img, size)?;
        self.upload_thumbnail(id, size, png).await
    }

    async fn upload_thumbnail(
        &self,
        id: &Uuid,
        size: u32,
        png: Vec<u8>,
    ) -> Result<UploadedThumbnail, ThumbnailError> {
        let blob_name = thumbnail_blob_name(size, id);
        let byte_len = png.len();
        self.store
            .put_blob(&self.container, &blob_name, png, THUMBNAIL_CONTENT_TYPE)
            .await?;
        info!(size, blob = %blob_name, bytes = byte_len, "サムネイルをアップロード");
        Ok(UploadedThumbnail {
            size,
            blob_name,
            byte_len,
        })
    }
}
