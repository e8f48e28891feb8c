//! A tiny SWF writer for building furniture fixtures in tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ImageFormat, RgbaImage};

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("zlib write");
    encoder.finish().expect("zlib finish")
}

#[derive(Default)]
pub struct SwfBuilder {
    tags: Vec<u8>,
}

impl SwfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, code: u16, body: &[u8]) -> Self {
        if body.len() < 0x3F {
            self.tags
                .extend_from_slice(&((code << 6) | body.len() as u16).to_le_bytes());
        } else {
            self.tags.extend_from_slice(&((code << 6) | 0x3F).to_le_bytes());
            self.tags
                .extend_from_slice(&(body.len() as u32).to_le_bytes());
        }
        self.tags.extend_from_slice(body);
        self
    }

    pub fn symbols(self, symbols: &[(u16, &str)]) -> Self {
        let mut body = (symbols.len() as u16).to_le_bytes().to_vec();
        for (id, name) in symbols {
            body.extend_from_slice(&id.to_le_bytes());
            body.extend_from_slice(name.as_bytes());
            body.push(0);
        }
        self.tag(76, &body)
    }

    pub fn binary(self, id: u16, data: &str) -> Self {
        let mut body = id.to_le_bytes().to_vec();
        body.extend_from_slice(&[0; 4]);
        body.extend_from_slice(data.as_bytes());
        self.tag(87, &body)
    }

    /// A DefineBitsLossless2 tag holding `img` as premultiplied ARGB.
    pub fn lossless(self, id: u16, img: &RgbaImage) -> Self {
        let mut pixels = Vec::with_capacity(img.as_raw().len());
        for p in img.pixels() {
            let [r, g, b, a] = p.0;
            let premul = |c: u8| ((c as u32 * a as u32 + 127) / 255) as u8;
            pixels.extend_from_slice(&[a, premul(r), premul(g), premul(b)]);
        }

        let mut body = id.to_le_bytes().to_vec();
        body.push(5);
        body.extend_from_slice(&(img.width() as u16).to_le_bytes());
        body.extend_from_slice(&(img.height() as u16).to_le_bytes());
        body.extend(zlib(&pixels));
        self.tag(36, &body)
    }

    /// A DefineBitsJPEG3 tag with an explicit alpha plane.
    pub fn jpeg3(self, id: u16, img: &RgbaImage, alpha: &[u8]) -> Self {
        let jpeg = encode(img, ImageFormat::Jpeg);
        let mut body = id.to_le_bytes().to_vec();
        body.extend_from_slice(&(jpeg.len() as u32).to_le_bytes());
        body.extend(jpeg);
        body.extend(zlib(alpha));
        self.tag(35, &body)
    }

    /// A DefineBitsLossless tag with an RGB colour table. `rows` hold one
    /// index per pixel and are padded to 32 bits here with index 0.
    pub fn lossless_palette(
        self,
        id: u16,
        width: u16,
        palette: &[[u8; 3]],
        rows: &[&[u8]],
    ) -> Self {
        let stride = (width as usize + 3) & !3;
        let mut pixels: Vec<u8> = palette.iter().flatten().copied().collect();
        for row in rows {
            assert_eq!(row.len(), width as usize, "row width");
            pixels.extend_from_slice(row);
            pixels.resize(pixels.len() + stride - row.len(), 0);
        }

        let mut body = id.to_le_bytes().to_vec();
        body.push(3);
        body.extend_from_slice(&width.to_le_bytes());
        body.extend_from_slice(&(rows.len() as u16).to_le_bytes());
        body.push((palette.len() - 1) as u8);
        body.extend(zlib(&pixels));
        self.tag(20, &body)
    }

    /// A DefineBitsJPEG2 tag, with the stray EOI/SOI pair old exporters wrote.
    pub fn jpeg2(self, id: u16, img: &RgbaImage) -> Self {
        let mut body = id.to_le_bytes().to_vec();
        body.extend_from_slice(&[0xFF, 0xD9, 0xFF, 0xD8]);
        body.extend(encode(img, ImageFormat::Jpeg));
        self.tag(21, &body)
    }

    pub fn unknown(self, code: u16) -> Self {
        self.tag(code, &[1, 2, 3])
    }

    fn body(&self) -> Vec<u8> {
        // empty frame rect, 24 fps, one frame
        let mut body = vec![0x00, 0x00, 0x18, 0x01, 0x00];
        body.extend_from_slice(&self.tags);
        body.extend_from_slice(&[0, 0]);
        body
    }

    pub fn build(&self) -> Vec<u8> {
        let body = self.body();
        let mut out = b"FWS\x0a".to_vec();
        out.extend_from_slice(&((body.len() + 8) as u32).to_le_bytes());
        out.extend(body);
        out
    }

    pub fn build_compressed(&self) -> Vec<u8> {
        let body = self.body();
        let mut out = b"CWS\x0a".to_vec();
        out.extend_from_slice(&((body.len() + 8) as u32).to_le_bytes());
        out.extend(zlib(&body));
        out
    }
}

pub fn encode(img: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    if format == ImageFormat::Jpeg {
        image::DynamicImage::ImageRgba8(img.clone())
            .to_rgb8()
            .write_to(&mut out, format)
            .expect("encode jpeg");
    } else {
        img.write_to(&mut out, format).expect("encode image");
    }
    out.into_inner()
}

pub const CHAIR_ASSETS: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<assets>
  <asset name="chair_64_a_0_0" x="-31" y="12"/>
  <asset name="chair_64_a_2_0" x="-20" y="14"/>
  <asset name="chair_64_a_4_0" source="chair_64_a_2_0" flipH="1"/>
  <asset name="chair_64_b_0_0" x="4"/>
  <asset name="chair_icon_a"/>
  <asset name="sh_chair_64_a_0_0"/>
  <asset name="chair_32_a_0_0"/>
</assets>"#;

pub const CHAIR_INDEX: &str =
    r#"<object type="chair" visualization="furniture_static" logic="furniture_chair"/>"#;

pub const CHAIR_VISUALIZATION: &str = r#"<visualizationData type="chair">
  <graphics>
    <visualization size="32" layerCount="1" angle="45"/>
    <visualization size="64" layerCount="2" angle="45">
      <layers><layer id="1" z="10"/></layers>
      <directions><direction id="2"/><direction id="4"/></directions>
    </visualization>
  </graphics>
</visualizationData>"#;

pub const CHAIR_LOGIC: &str = r#"<objectData type="chair">
  <model><dimensions x="1" y="1" z=""/></model>
</objectData>"#;

pub const CHAIR_MANIFEST: &str =
    r#"<manifest><library name="chair" version="0.1"/></manifest>"#;

/// A chair whose `a_2_0` sprite is an alias of `a_0_0`, plus a shadow bitmap
/// that must not be packed.
pub fn chair_swf() -> SwfBuilder {
    let a = RgbaImage::from_pixel(4, 10, image::Rgba([200, 10, 10, 255]));
    let b = RgbaImage::from_pixel(6, 20, image::Rgba([10, 200, 10, 255]));
    let icon = RgbaImage::from_pixel(3, 3, image::Rgba([10, 10, 200, 255]));
    let shadow = RgbaImage::from_pixel(8, 2, image::Rgba([0, 0, 0, 128]));

    SwfBuilder::new()
        .unknown(9)
        .lossless(1, &a)
        .lossless(2, &b)
        .lossless(3, &icon)
        .lossless(4, &shadow)
        .binary(10, CHAIR_ASSETS)
        .binary(11, CHAIR_INDEX)
        .binary(12, CHAIR_VISUALIZATION)
        .binary(13, CHAIR_LOGIC)
        .binary(14, CHAIR_MANIFEST)
        .symbols(&[
            (1, "chair_chair_64_a_0_0"),
            (1, "chair_chair_64_a_2_0"),
            (2, "chair_chair_64_b_0_0"),
            (3, "chair_chair_icon_a"),
            (4, "chair_sh_chair_64_a_0_0"),
            (10, "chair_assets"),
            (11, "chair_index"),
            (12, "chair_visualization"),
            (13, "chair_logic"),
            (14, "manifest"),
        ])
}
