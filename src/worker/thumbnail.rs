use crate::error::EncodeError;
use crate::gpu::{ColorDepth, PixelBuffer};
use crate::layer::LayerId;

use super::encode::{encode_png, png_data_url, to_dynamic_image};

/// Longest side of a layer thumbnail, in pixels
pub const THUMBNAIL_SIZE: u32 = 96;

#[derive(Debug)]
pub struct ThumbnailRequest {
    pub pixels: PixelBuffer,
    pub layer: LayerId,
}

impl ThumbnailRequest {
    pub fn depth(&self) -> ColorDepth {
        self.pixels.depth
    }
}

/// Carries the request's buffer back to the caller together with the result
#[derive(Debug)]
pub struct ThumbnailResponse {
    pub pixels: PixelBuffer,
    /// `data:image/png;base64,...`
    pub image_url: Result<String, EncodeError>,
    pub layer: LayerId,
}

/// Downscales to fit `max_side` (keeping aspect ratio) and encodes a PNG
/// data URL.
pub fn make_thumbnail(request: ThumbnailRequest, max_side: u32) -> ThumbnailResponse {
    let image_url = to_dynamic_image(&request.pixels).and_then(|image| {
        let thumbnail = image.thumbnail(max_side, max_side);
        Ok(png_data_url(&encode_png(&thumbnail)?))
    });
    if let Err(err) = &image_url {
        log::warn!("thumbnail for layer {} failed: {err}", request.layer);
    }
    ThumbnailResponse {
        pixels: request.pixels,
        image_url,
        layer: request.layer,
    }
}
