/// Multipart intake for generate requests
///
/// Buffers every `images` part into an `UploadedImage`. Other fields are
/// drained and ignored. Size and count limits are enforced while streaming so
/// an oversized request is rejected before it is fully read.
use actix_multipart::Multipart;
use futures::StreamExt;

use crate::error::{AppError, Result};
use crate::models::UploadedImage;
use crate::services::batch::{MAX_IMAGES, MAX_IMAGE_BYTES};

/// Form field carrying the product photos
pub const IMAGES_FIELD: &str = "images";

const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

fn invalid_payload(err: actix_multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart payload: {err}"))
}

pub async fn collect_images(mut payload: Multipart) -> Result<Vec<UploadedImage>> {
    let mut images: Vec<UploadedImage> = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(invalid_payload)?;

        if field.name() != Some(IMAGES_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(invalid_payload)?;
            }
            continue;
        }

        if images.len() == MAX_IMAGES {
            return Err(AppError::Validation(format!(
                "Too many images (maximum {MAX_IMAGES})"
            )));
        }

        let index = images.len();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("image-{}", index + 1));
        let mime_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| UNKNOWN_MIME_TYPE.to_string());

        let mut content = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(invalid_payload)?;
            if content.len() + bytes.len() > MAX_IMAGE_BYTES {
                return Err(AppError::Validation(format!(
                    "{filename} exceeds the maximum size of 10 MB"
                )));
            }
            content.extend_from_slice(&bytes);
        }

        images.push(UploadedImage {
            content,
            mime_type,
            filename,
            index,
        });
    }

    Ok(images)
}
