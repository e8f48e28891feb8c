//! Sprite atlas packing.
//!
//! Sprites are stacked in a single column, tallest first, each at `x = 0`.
//! Wasteful on width, but the renderer only cares about the frame table and
//! the layout is trivially reproducible.

use std::collections::BTreeMap;

use image::{RgbaImage, imageops};

use crate::model::{AtlasFrame, Size, Spritesheet, SpritesheetMeta};

pub const ATLAS_FORMAT: &str = "RGBA8888";

/// A packed atlas image and where each sprite ended up in it.
#[derive(Debug, Clone)]
pub struct PackedAtlas {
    pub image: RgbaImage,
    pub frames: BTreeMap<String, AtlasFrame>,
}

impl PackedAtlas {
    pub fn size(&self) -> Size {
        Size {
            w: self.image.width(),
            h: self.image.height(),
        }
    }

    /// Frame table plus meta block, naming the atlas image `image_name`.
    pub fn spritesheet(&self, image_name: &str) -> Spritesheet {
        Spritesheet {
            meta: SpritesheetMeta {
                app: String::new(),
                version: String::new(),
                image: image_name.to_string(),
                format: ATLAS_FORMAT.to_string(),
                size: self.size(),
                scale: 1.0,
            },
            frames: self.frames.clone(),
        }
    }
}

/// Pack named sprites into one atlas. Equal heights keep their input order.
pub fn pack_sprites(mut sprites: Vec<(String, RgbaImage)>) -> PackedAtlas {
    if sprites.is_empty() {
        return PackedAtlas {
            image: RgbaImage::new(1, 1),
            frames: BTreeMap::new(),
        };
    }

    sprites.sort_by(|a, b| b.1.height().cmp(&a.1.height()));

    let width = sprites.iter().map(|(_, img)| img.width()).max().unwrap_or(0);
    let height = sprites.iter().map(|(_, img)| img.height()).sum();

    let mut image = RgbaImage::new(width, height);
    let mut frames = BTreeMap::new();
    let mut y = 0u32;

    for (name, sprite) in &sprites {
        imageops::replace(&mut image, sprite, 0, y as i64);
        frames.insert(
            name.clone(),
            AtlasFrame::at(0, y, sprite.width(), sprite.height()),
        );
        y += sprite.height();
    }

    PackedAtlas { image, frames }
}
