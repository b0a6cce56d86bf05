use crate::error::EncodeError;
use crate::gpu::PixelBuffer;

use super::encode::{encode_png, to_dynamic_image};

#[derive(Debug)]
pub struct ExportRequest {
    pub pixels: PixelBuffer,
}

#[derive(Debug)]
pub struct ExportResponse {
    pub pixels: PixelBuffer,
    /// Full-size PNG at the buffer's color depth
    pub png: Result<Vec<u8>, EncodeError>,
}

pub fn export_png(request: ExportRequest) -> ExportResponse {
    let png = to_dynamic_image(&request.pixels).and_then(|image| encode_png(&image));
    match &png {
        Ok(bytes) => log::debug!(
            "exported {}x{} image ({} bytes)",
            request.pixels.width,
            request.pixels.height,
            bytes.len()
        ),
        Err(err) => log::warn!("export failed: {err}"),
    }
    ExportResponse {
        pixels: request.pixels,
        png,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::ColorDepth;

    #[test]
    fn test_export_decodes_back_to_same_size() {
        let pixels = PixelBuffer {
            width: 5,
            height: 3,
            depth: ColorDepth::Rgba16,
            data: vec![0x40; 5 * 3 * 8],
        };
        let response = export_png(ExportRequest { pixels });
        let png = response.png.unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
        assert_eq!(decoded.color(), image::ColorType::Rgba16);
    }
}
