use std::io::Cursor;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use rayon::prelude::*;
use uuid::Uuid;
use crate::constants::{MAX_IMAGE_DIMENSION, MAX_PIXEL_COUNT, THUMBNAIL_SIZES};
use crate::error::ThumbnailError;

// 画像サイズ検証（DoS防止）
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), ThumbnailError> {
    if width == 0 || height == 0 {
        return Err(ThumbnailError::InvalidImage(
            "無効な画像サイズ: 幅または高さが0".to_string(),
        ));
    }
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ThumbnailError::InvalidImage(format!(
            "画像サイズが大きすぎます: {}x{} (最大: {})",
            width, height, MAX_IMAGE_DIMENSION
        )));
    }
    let pixel_count = (width as u64) * (height as u64);
    if pixel_count > MAX_PIXEL_COUNT {
        return Err(ThumbnailError::InvalidImage(format!(
            "ピクセル数が多すぎます: {} (最大: {})",
            pixel_count, MAX_PIXEL_COUNT
        )));
    }
    Ok(())
}

// ソース画像をデコード（ヘッダーのサイズを先に検証してから展開する）
pub fn decode_source(data: &[u8]) -> Result<DynamicImage, ThumbnailError> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(image::ImageError::from)?
        .into_dimensions()?;
    validate_dimensions(width, height)?;

    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(image::ImageError::from)?
        .decode()?;
    Ok(img)
}

// 正方形サムネイルを生成（縦横比は保持せず全体を引き伸ばす）
pub fn render_thumbnail(img: &DynamicImage, size: u32) -> Result<Vec<u8>, ThumbnailError> {
    if size == 0 {
        return Err(ThumbnailError::InvalidImage(
            "サムネイルサイズが0".to_string(),
        ));
    }

    // CatmullRom: 縮小時も輪郭が崩れにくい高品質なバイキュービック系フィルタ
    let thumbnail = img.resize_exact(size, size, FilterType::CatmullRom);

    let mut buffer = Cursor::new(Vec::new());
    thumbnail.write_to(&mut buffer, ImageFormat::Png)?;

    Ok(buffer.into_inner())
}

// 全サイズのサムネイルを並列に生成（サイズ昇順で返す）
pub fn render_all(img: &DynamicImage) -> Result<Vec<(u32, Vec<u8>)>, ThumbnailError> {
    THUMBNAIL_SIZES
        .par_iter()
        .map(|&size| render_thumbnail(img, size).map(|png| (size, png)))
        .collect()
}

// Blob 名: "x{size}/{id}.png"
pub fn thumbnail_blob_name(size: u32, id: &Uuid) -> String {
    format!("x{}/{}.png", size, id.hyphenated())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn rejects_zero_and_oversized_dimensions() {
        assert!(validate_dimensions(0, 10).is_err());
        assert!(validate_dimensions(10, 0).is_err());
        assert!(validate_dimensions(MAX_IMAGE_DIMENSION + 1, 1).is_err());
        assert!(validate_dimensions(20_000, 20_000).is_err());
        assert!(validate_dimensions(1920, 1080).is_ok());
    }

    #[test]
    fn decodes_png_source() {
        let img = decode_source(&sample_png(40, 30)).unwrap();
        assert_eq!((img.width(), img.height()), (40, 30));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_source(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ThumbnailError::Decode(_)));
    }

    #[test]
    fn thumbnail_is_square_png_even_for_wide_sources() {
        let img = decode_source(&sample_png(300, 100)).unwrap();
        let png = render_thumbnail(&img, 16).unwrap();

        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let thumb = image::load_from_memory(&png).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (16, 16));
    }

    #[test]
    fn upscales_small_sources() {
        let img = decode_source(&sample_png(4, 4)).unwrap();
        let thumb = image::load_from_memory(&render_thumbnail(&img, 128).unwrap()).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (128, 128));
    }

    #[test]
    fn renders_every_size_in_order() {
        let img = decode_source(&sample_png(64, 48)).unwrap();
        let sizes: Vec<u32> = render_all(&img).unwrap().into_iter().map(|(s, _)| s).collect();
        assert_eq!(sizes, THUMBNAIL_SIZES.to_vec());
    }

    #[test]
    fn blob_name_uses_size_prefix_and_hyphenated_id() {
        let id = Uuid::parse_str("0B7E1D1C-3F43-4D33-9D0B-9A3C2A1F5E77").unwrap();
        assert_eq!(
            thumbnail_blob_name(64, &id),
            "x64/0b7e1d1c-3f43-4d33-9d0b-9a3c2a1f5e77.png"
        );
    }
}
