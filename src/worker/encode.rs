use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba, RgbaImage};

use crate::error::EncodeError;
use crate::gpu::{ColorDepth, PixelBuffer};

fn check_len(buffer: &PixelBuffer) -> Result<(), EncodeError> {
    let expected = buffer.expected_len();
    if buffer.data.len() != expected {
        return Err(EncodeError::BufferSize {
            expected,
            actual: buffer.data.len(),
        });
    }
    Ok(())
}

/// Wraps read-back pixels in an `image` buffer of the matching depth.
pub fn to_dynamic_image(buffer: &PixelBuffer) -> Result<DynamicImage, EncodeError> {
    check_len(buffer)?;
    let size_error = || EncodeError::BufferSize {
        expected: buffer.expected_len(),
        actual: buffer.data.len(),
    };
    match buffer.depth {
        ColorDepth::Rgba8 => {
            let image = RgbaImage::from_raw(buffer.width, buffer.height, buffer.data.clone()).ok_or_else(size_error)?;
            Ok(DynamicImage::ImageRgba8(image))
        }
        ColorDepth::Rgba16 => {
            let channels = buffer
                .data
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect::<Vec<_>>();
            let image = ImageBuffer::<Rgba<u16>, _>::from_raw(buffer.width, buffer.height, channels)
                .ok_or_else(size_error)?;
            Ok(DynamicImage::ImageRgba16(image))
        }
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

pub fn png_data_url(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(depth: ColorDepth) -> PixelBuffer {
        PixelBuffer {
            width: 2,
            height: 1,
            depth,
            data: vec![0xff; 2 * depth.bytes_per_pixel()],
        }
    }

    #[test]
    fn test_png_signature() {
        let image = to_dynamic_image(&buffer(ColorDepth::Rgba8)).unwrap();
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }

    #[test]
    fn test_sixteen_bit_keeps_depth() {
        let image = to_dynamic_image(&buffer(ColorDepth::Rgba16)).unwrap();
        assert!(matches!(image, DynamicImage::ImageRgba16(_)));
        assert_eq!(image.as_rgba16().unwrap().get_pixel(1, 0).0, [u16::MAX; 4]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let mut short = buffer(ColorDepth::Rgba8);
        short.data.pop();
        assert!(matches!(
            to_dynamic_image(&short),
            Err(EncodeError::BufferSize { expected: 8, actual: 7 })
        ));
    }

    #[test]
    fn test_data_url_prefix() {
        assert_eq!(png_data_url(&[1, 2, 3]), "data:image/png;base64,AQID");
    }
}
