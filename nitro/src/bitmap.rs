//! Bitmap tag decoding.
//!
//! Every supported bitmap tag ends up as a straight-alpha RGBA buffer. Lossless
//! tags carry either an 8-bit colour-mapped image or 32-bit premultiplied ARGB,
//! JPEG tags carry a complete encoded image plus, for JPEG3, a separate zlib
//! alpha plane.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::bit_reader::{BitReader, ReadError};
use crate::compression::inflate_zlib;
use crate::reader::{ImageKind, ImageTag};

const FORMAT_COLOR_MAPPED: u8 = 3;
const FORMAT_ARGB: u8 = 5;

/// Old Flash encoders put an EOI/SOI pair in front of the real SOI marker.
const ERRONEOUS_JPEG_HEADER: [u8; 4] = [0xFF, 0xD9, 0xFF, 0xD8];

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("unsupported image format (tag code {code}, bitmap format {format:?})")]
    UnsupportedImageFormat { code: u16, format: Option<u8> },
    #[error("bitmap header truncated")]
    Truncated(#[from] ReadError),
    #[error("failed to inflate bitmap data")]
    Inflate(#[source] std::io::Error),
    #[error("colour table needs {expected} bytes but only {actual} are present")]
    PaletteTruncated { expected: usize, actual: usize },
    #[error("failed to decode embedded image")]
    Codec(#[from] image::ImageError),
    #[error("{width}x{height} bitmap needs {bytes} bytes, over the {limit} byte limit")]
    TooLarge {
        width: u32,
        height: u32,
        bytes: u64,
        limit: u64,
    },
    #[error("{width}x{height} bitmap has no pixel data")]
    MissingPixels { width: u32, height: u32 },
}

/// Decode one bitmap tag into straight-alpha RGBA pixels.
pub fn decode_image(tag: &ImageTag) -> Result<RgbaImage, ImageError> {
    match tag.kind {
        ImageKind::Lossless | ImageKind::Lossless2 => decode_lossless(tag.kind, &tag.data),
        ImageKind::Jpeg2 => decode_embedded(&tag.data),
        ImageKind::Jpeg3 => decode_jpeg3(&tag.data),
    }
}

fn decode_lossless(kind: ImageKind, data: &[u8]) -> Result<RgbaImage, ImageError> {
    let mut bits = BitReader::new(data);
    let format = bits.read_u8()?;
    let width = bits.read_u16()? as u32;
    let height = bits.read_u16()? as u32;

    match format {
        FORMAT_COLOR_MAPPED => {
            let entries = bits.read_u8()? as usize + 1;
            check_dimensions(width, height)?;
            let pixels = inflate_zlib(bits.rest()).map_err(ImageError::Inflate)?;
            decode_color_mapped(kind, width, height, entries, &pixels)
        }
        FORMAT_ARGB => {
            check_dimensions(width, height)?;
            let pixels = inflate_zlib(bits.rest()).map_err(ImageError::Inflate)?;
            if pixels.is_empty() && width > 0 && height > 0 {
                return Err(ImageError::MissingPixels { width, height });
            }
            Ok(decode_argb(width, height, &pixels))
        }
        other => Err(ImageError::UnsupportedImageFormat {
            code: kind.code(),
            format: Some(other),
        }),
    }
}

/// The header dimensions decide the RGBA allocation, so hold them to the
/// same budget the `image` codecs use for embedded JPEGs.
fn check_dimensions(width: u32, height: u32) -> Result<(), ImageError> {
    let bytes = width as u64 * height as u64 * 4;
    let limit = image::Limits::default().max_alloc.unwrap_or(u64::MAX);
    if bytes > limit {
        return Err(ImageError::TooLarge {
            width,
            height,
            bytes,
            limit,
        });
    }
    Ok(())
}

/// Colour table followed by one index byte per pixel, rows padded to 32 bits.
fn decode_color_mapped(
    kind: ImageKind,
    width: u32,
    height: u32,
    entries: usize,
    data: &[u8],
) -> Result<RgbaImage, ImageError> {
    let entry_size = if kind == ImageKind::Lossless2 { 4 } else { 3 };
    let table_len = entries * entry_size;
    if data.len() < table_len {
        return Err(ImageError::PaletteTruncated {
            expected: table_len,
            actual: data.len(),
        });
    }

    let (table, indices) = data.split_at(table_len);
    if indices.is_empty() && width > 0 && height > 0 {
        return Err(ImageError::MissingPixels { width, height });
    }
    let palette: Vec<Rgba<u8>> = table
        .chunks_exact(entry_size)
        .map(|c| match c {
            [a, r, g, b] => Rgba([*r, *g, *b, *a]),
            [r, g, b] => Rgba([*r, *g, *b, 255]),
            _ => TRANSPARENT,
        })
        .collect();

    let row_width = ((width + 3) & !3) as usize;
    let mut img = RgbaImage::new(width, height);

    for y in 0..height {
        let row_start = y as usize * row_width;
        for x in 0..width {
            let Some(&index) = indices.get(row_start + x as usize) else {
                debug!(width, height, "colour-mapped bitmap ran out of data");
                return Ok(img);
            };
            let color = palette.get(index as usize).copied().unwrap_or(TRANSPARENT);
            img.put_pixel(x, y, color);
        }
    }

    Ok(img)
}

/// 32-bit ARGB with colour channels premultiplied by alpha.
fn decode_argb(width: u32, height: u32, data: &[u8]) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);
    for (pixel, argb) in img.pixels_mut().zip(data.chunks_exact(4)) {
        let a = argb[0];
        *pixel = Rgba([
            unpremultiply(argb[1], a),
            unpremultiply(argb[2], a),
            unpremultiply(argb[3], a),
            a,
        ]);
    }
    img
}

pub(crate) fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        return channel;
    }
    let a = alpha as u32;
    ((channel as u32 * 255 + a / 2) / a).min(255) as u8
}

fn strip_erroneous_header(data: &[u8]) -> &[u8] {
    data.strip_prefix(&ERRONEOUS_JPEG_HEADER[..]).unwrap_or(data)
}

/// A self-contained JPEG (or PNG/GIF, which later players also accept).
fn decode_embedded(data: &[u8]) -> Result<RgbaImage, ImageError> {
    Ok(image::load_from_memory(strip_erroneous_header(data))?.to_rgba8())
}

fn decode_jpeg3(data: &[u8]) -> Result<RgbaImage, ImageError> {
    let mut bits = BitReader::new(data);
    let jpeg_len = bits.read_u32()? as usize;
    let jpeg = bits.read_bytes(jpeg_len)?;
    let alpha_data = bits.rest();

    let mut img = decode_embedded(jpeg)?;
    if alpha_data.is_empty() {
        return Ok(img);
    }

    let alpha = inflate_zlib(alpha_data).map_err(ImageError::Inflate)?;
    let pixel_count = img.width() as usize * img.height() as usize;
    if alpha.len() < pixel_count {
        debug!(
            expected = pixel_count,
            actual = alpha.len(),
            "alpha plane too short, keeping opaque image"
        );
        return Ok(img);
    }

    for (pixel, a) in img.pixels_mut().zip(alpha) {
        pixel[3] = a;
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::compression::deflate_zlib;

    fn lossless(
        kind: ImageKind,
        format: u8,
        width: u16,
        height: u16,
        extra: &[u8],
        pixels: &[u8],
    ) -> ImageTag {
        let mut data = vec![format];
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(extra);
        data.extend(deflate_zlib(pixels).unwrap());
        ImageTag {
            kind,
            character_id: 1,
            data,
        }
    }

    fn encode_jpeg(img: &RgbaImage) -> Vec<u8> {
        let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
        let mut out = std::io::Cursor::new(Vec::new());
        rgb.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_unpremultiply() {
        assert_eq!(unpremultiply(64, 128), 128);
        assert_eq!(unpremultiply(200, 255), 200);
        assert_eq!(unpremultiply(77, 0), 77);
        assert_eq!(unpremultiply(255, 10), 255);
    }

    #[test]
    fn test_argb_pixels() {
        let pixels = [128, 64, 32, 0, 0, 10, 20, 30];
        let tag = lossless(ImageKind::Lossless2, FORMAT_ARGB, 2, 1, &[], &pixels);
        let img = decode_image(&tag).unwrap();

        assert_eq!(img.get_pixel(0, 0), &Rgba([128, 64, 0, 128]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([10, 20, 30, 0]));
    }

    #[test]
    fn test_color_mapped_row_padding() {
        // width 5 -> stride 8, three padding bytes per row
        let palette = [255, 0, 0, 0, 255, 0];
        let mut data = palette.to_vec();
        data.extend_from_slice(&[0, 1, 0, 1, 0, 9, 9, 9]);
        data.extend_from_slice(&[1, 1, 1, 1, 1, 9, 9, 9]);

        let tag = lossless(ImageKind::Lossless, FORMAT_COLOR_MAPPED, 5, 2, &[1], &data);
        let img = decode_image(&tag).unwrap();

        assert_eq!(img.dimensions(), (5, 2));
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(img.get_pixel(4, 0), &Rgba([255, 0, 0, 255]));
        for x in 0..5 {
            assert_eq!(img.get_pixel(x, 1), &Rgba([0, 255, 0, 255]));
        }
    }

    #[test]
    fn test_color_mapped_argb_table() {
        let table = [0x80, 10, 20, 30];
        let mut data = table.to_vec();
        data.extend_from_slice(&[0, 0, 0, 0]);

        let tag = lossless(ImageKind::Lossless2, FORMAT_COLOR_MAPPED, 1, 1, &[0], &data);
        let img = decode_image(&tag).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgba([10, 20, 30, 0x80]));
    }

    #[test]
    fn test_color_mapped_truncated_rows_are_partial() {
        let mut data = vec![1, 2, 3];
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(&[0, 0]);

        let tag = lossless(ImageKind::Lossless, FORMAT_COLOR_MAPPED, 4, 2, &[0], &data);
        let img = decode_image(&tag).unwrap();
        assert_eq!(img.get_pixel(3, 0), &Rgba([1, 2, 3, 255]));
        assert_eq!(img.get_pixel(1, 1), &Rgba([1, 2, 3, 255]));
        assert_eq!(img.get_pixel(2, 1), &TRANSPARENT);
    }

    #[test]
    fn test_missing_palette_fails() {
        let tag = lossless(ImageKind::Lossless, FORMAT_COLOR_MAPPED, 1, 1, &[3], &[0; 5]);
        assert!(matches!(
            decode_image(&tag),
            Err(ImageError::PaletteTruncated {
                expected: 12,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_huge_header_is_rejected() {
        let tag = lossless(ImageKind::Lossless2, FORMAT_ARGB, u16::MAX, u16::MAX, &[], &[]);
        assert!(tag.data.len() < 16);
        assert!(matches!(
            decode_image(&tag),
            Err(ImageError::TooLarge {
                width: 65535,
                height: 65535,
                ..
            })
        ));

        let tag = lossless(
            ImageKind::Lossless,
            FORMAT_COLOR_MAPPED,
            u16::MAX,
            u16::MAX,
            &[0],
            &[],
        );
        assert!(matches!(decode_image(&tag), Err(ImageError::TooLarge { .. })));
    }

    #[test]
    fn test_empty_pixel_data_is_rejected() {
        let tag = lossless(ImageKind::Lossless2, FORMAT_ARGB, 300, 200, &[], &[]);
        assert!(matches!(
            decode_image(&tag),
            Err(ImageError::MissingPixels {
                width: 300,
                height: 200
            })
        ));

        let tag = lossless(ImageKind::Lossless, FORMAT_COLOR_MAPPED, 4, 4, &[0], &[1, 2, 3]);
        assert!(matches!(decode_image(&tag), Err(ImageError::MissingPixels { .. })));
    }

    #[test]
    fn test_unsupported_format() {
        let tag = lossless(ImageKind::Lossless, 4, 1, 1, &[], &[0, 0]);
        let err = decode_image(&tag).unwrap_err();
        assert!(matches!(
            err,
            ImageError::UnsupportedImageFormat {
                code: 20,
                format: Some(4)
            }
        ));
    }

    #[test]
    fn test_jpeg2() {
        let src = RgbaImage::from_pixel(8, 8, Rgba([200, 200, 200, 255]));
        let mut data = ERRONEOUS_JPEG_HEADER.to_vec();
        data.extend(encode_jpeg(&src));

        let tag = ImageTag {
            kind: ImageKind::Jpeg2,
            character_id: 2,
            data,
        };
        let img = decode_image(&tag).unwrap();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(3, 3)[3], 255);
    }

    fn jpeg3(width: u32, height: u32, alpha: &[u8]) -> ImageTag {
        let jpeg = encode_jpeg(&RgbaImage::from_pixel(width, height, Rgba([90, 90, 90, 255])));
        let mut data = (jpeg.len() as u32).to_le_bytes().to_vec();
        data.extend(jpeg);
        data.extend(deflate_zlib(alpha).unwrap());
        ImageTag {
            kind: ImageKind::Jpeg3,
            character_id: 3,
            data,
        }
    }

    #[test]
    fn test_jpeg3_applies_alpha() {
        let alpha: Vec<u8> = (0..16).map(|i| i * 10).collect();
        let img = decode_image(&jpeg3(4, 4, &alpha)).unwrap();
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(1, 0)[3], 10);
        assert_eq!(img.get_pixel(3, 3)[3], 150);
    }

    #[test]
    fn test_jpeg3_short_alpha_is_ignored() {
        let img = decode_image(&jpeg3(4, 4, &[0; 10])).unwrap();
        assert!(img.pixels().all(|p| p[3] == 255));
    }
}
