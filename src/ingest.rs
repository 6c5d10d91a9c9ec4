//! Photo ingestion pipeline.
//!
//! Turns an untrusted binary upload into a safely stored, uniquely named
//! image file under the media upload root, or passes through unchanged when
//! no upload is present. Stages run as explicit sequential composition —
//! each returns a `Result` and the pipeline short-circuits on the first
//! failure:
//!
//! accept (media type + size) → name (uuid + extension) → decode → rescale
//! → encode → write
//!
//! This stage writes exactly one file and never touches the database; it
//! only produces the filename token the subsequent create/update consumes.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageFormat};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::StoreError;

/// Rescale target: output width in pixels for images wider than this.
pub const TARGET_WIDTH: u32 = 800;

/// An accepted upload, buffered entirely in memory.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Inspects the declared media type and size of an incoming file part.
    /// Anything that is not `image/*`, or that exceeds the configured size
    /// ceiling, is rejected before any bytes are persisted.
    pub fn accept(
        content_type: &str,
        bytes: Vec<u8>,
        media: &MediaConfig,
    ) -> Result<Self, StoreError> {
        if !content_type.starts_with("image/") {
            return Err(StoreError::UnsupportedMediaType(content_type.to_string()));
        }
        if bytes.len() > media.max_upload_bytes {
            return Err(StoreError::Validation {
                field: "photo",
                message: format!(
                    "upload of {} bytes exceeds the {} byte ceiling",
                    bytes.len(),
                    media.max_upload_bytes
                ),
            });
        }
        Ok(Self {
            content_type: content_type.to_string(),
            bytes,
        })
    }

    /// File extension derived from the declared media subtype
    /// (`image/jpeg` → `jpeg`).
    fn extension(&self) -> &str {
        self.content_type
            .split('/')
            .nth(1)
            .unwrap_or_default()
    }
}

/// Runs the pipeline. `None` upload returns immediately with no side
/// effect; the caller proceeds without a photo change. Otherwise the
/// upload is decoded, rescaled, re-encoded in its original format, and
/// written under a freshly generated filename token, which is returned
/// for attachment to the pending record payload.
pub async fn process_upload(
    upload: Option<PhotoUpload>,
    media: &MediaConfig,
) -> Result<Option<String>, StoreError> {
    let Some(upload) = upload else {
        return Ok(None);
    };

    let ext = upload.extension();
    let format = ImageFormat::from_extension(ext).ok_or_else(|| {
        StoreError::Decode(format!("no codec for declared image subtype '{ext}'"))
    })?;

    // UUID randomness guarantees the token never collides with a previously
    // stored asset, so no existence check is needed.
    let filename = format!("{}.{ext}", Uuid::new_v4());

    let img = image::load_from_memory_with_format(&upload.bytes, format)
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    let img = scale_to_width(img, TARGET_WIDTH);

    let mut encoded = Vec::new();
    img.write_to(&mut Cursor::new(&mut encoded), format)
        .map_err(|e| StoreError::Write {
            path: filename.clone(),
            message: format!("re-encode failed: {e}"),
        })?;

    let write_err = |e: std::io::Error, path: &std::path::Path| StoreError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    tokio::fs::create_dir_all(&media.upload_root)
        .await
        .map_err(|e| write_err(e, &media.upload_root))?;
    let path = media.upload_root.join(&filename);
    tokio::fs::write(&path, &encoded)
        .await
        .map_err(|e| write_err(e, &path))?;

    Ok(Some(filename))
}

/// Proportional rescale so the width equals `target`, height derived from
/// the aspect ratio. Images already at or under the target pass through
/// untouched — never upscaled.
fn scale_to_width(img: DynamicImage, target: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    if w <= target {
        return img;
    }
    let new_h = ((h as f64) * (target as f64) / (w as f64)).round().max(1.0) as u32;
    img.resize_exact(target, new_h, FilterType::Triangle)
}
