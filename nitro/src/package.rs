//! Reading sprites back out of a converted archive, and editing the
//! atlas/description pair in place.

use std::path::Path;

use image::{RgbaImage, imageops};
use tracing::debug;

use crate::archive::Archive;
use crate::convert::encode_png;
use crate::error::{NitroError, NitroResult};
use crate::model::{AssetModel, AtlasFrame, Size, Spritesheet};

/// Frame name suffix of the catalogue icon.
pub const ICON_SUFFIX: &str = "_icon_a";

/// Entries whose contents carry the furniture name as text.
const TEXT_EXTENSIONS: [&str; 4] = ["json", "xml", "txt", "atlas"];

impl Archive {
    /// Name of the asset description entry: the first `.json` entry.
    pub fn model_entry_name(&self) -> Option<&str> {
        self.names().find(|name| name.ends_with(".json"))
    }

    pub fn asset_model(&self) -> NitroResult<AssetModel> {
        let data = self
            .model_entry_name()
            .and_then(|name| self.get(name))
            .ok_or(NitroError::MissingDocument)?;
        Ok(serde_json::from_slice(data)?)
    }

    pub fn spritesheet(&self) -> NitroResult<Spritesheet> {
        self.asset_model()?
            .spritesheet
            .ok_or(NitroError::MissingDocument)
    }

    /// The atlas named by the spritesheet meta, decoded.
    pub fn atlas(&self) -> NitroResult<RgbaImage> {
        let sheet = self.spritesheet()?;
        self.atlas_for(&sheet)
    }

    fn atlas_for(&self, sheet: &Spritesheet) -> NitroResult<RgbaImage> {
        let data = self
            .get(&sheet.meta.image)
            .ok_or_else(|| NitroError::missing_atlas(&sheet.meta.image))?;
        Ok(image::load_from_memory(data)?.to_rgba8())
    }

    pub fn extract_sprite(&self, name: &str) -> NitroResult<RgbaImage> {
        let sheet = self.spritesheet()?;
        let frame = sheet
            .frames
            .get(name)
            .ok_or_else(|| NitroError::sprite_not_found(name))?;
        let atlas = self.atlas_for(&sheet)?;
        Ok(crop(&atlas, frame))
    }

    /// Every frame in the spritesheet, in name order.
    pub fn extract_all_sprites(&self) -> NitroResult<Vec<(String, RgbaImage)>> {
        let sheet = self.spritesheet()?;
        let atlas = self.atlas_for(&sheet)?;
        Ok(sheet
            .frames
            .iter()
            .map(|(name, frame)| (name.clone(), crop(&atlas, frame)))
            .collect())
    }

    /// The catalogue icon: the first frame whose name ends in `_icon_a`.
    pub fn extract_icon(&self) -> NitroResult<(String, RgbaImage)> {
        let sheet = self.spritesheet()?;
        let (name, frame) = sheet
            .frames
            .iter()
            .find(|(name, _)| name.ends_with(ICON_SUFFIX))
            .ok_or_else(|| NitroError::sprite_not_found(format!("*{ICON_SUFFIX}")))?;
        let atlas = self.atlas_for(&sheet)?;
        Ok((name.clone(), crop(&atlas, frame)))
    }
}

impl Archive {
    fn load_model(&self) -> NitroResult<(String, AssetModel)> {
        let name = self
            .model_entry_name()
            .ok_or(NitroError::MissingDocument)?
            .to_string();
        let model = self.asset_model()?;
        Ok((name, model))
    }

    fn store(&mut self, entry: String, model: &AssetModel, atlas: &RgbaImage) -> NitroResult<()> {
        let image_name = model
            .spritesheet
            .as_ref()
            .map(|sheet| sheet.meta.image.clone())
            .ok_or(NitroError::MissingDocument)?;
        self.insert(image_name, encode_png(atlas)?);
        self.insert(entry, serde_json::to_vec(model)?);
        Ok(())
    }

    /// Paint `sprite` over the frame called `name`, anchored at the frame's
    /// top-left corner. Pixels past the atlas edge are dropped and the frame
    /// takes the new size, clipped to the atlas.
    pub fn replace_sprite(&mut self, name: &str, sprite: &RgbaImage) -> NitroResult<()> {
        let (entry, mut model) = self.load_model()?;
        let sheet = model.spritesheet.as_mut().ok_or(NitroError::MissingDocument)?;
        let mut atlas = self.atlas_for(sheet)?;
        let frame = sheet
            .frames
            .get_mut(name)
            .ok_or_else(|| NitroError::sprite_not_found(name))?;

        let (x, y) = (frame.frame.x, frame.frame.y);
        imageops::replace(&mut atlas, sprite, x as i64, y as i64);

        let w = sprite.width().min(atlas.width().saturating_sub(x));
        let h = sprite.height().min(atlas.height().saturating_sub(y));
        if (w, h) != (frame.frame.w, frame.frame.h) {
            debug!(sprite = name, w, h, "frame resized");
            frame.frame.w = w;
            frame.frame.h = h;
            frame.sprite_source_size.w = w;
            frame.sprite_source_size.h = h;
            frame.source_size = Size { w, h };
        }

        self.store(entry, &model, &atlas)
    }

    /// Swap in a whole new atlas. Every existing frame must still fit; the
    /// recorded atlas size follows the new image.
    pub fn replace_atlas(&mut self, atlas: &RgbaImage) -> NitroResult<()> {
        let (entry, mut model) = self.load_model()?;
        let sheet = model.spritesheet.as_mut().ok_or(NitroError::MissingDocument)?;
        let (width, height) = atlas.dimensions();

        for (name, frame) in &sheet.frames {
            let r = frame.frame;
            let right = r.x as u64 + r.w as u64;
            let bottom = r.y as u64 + r.h as u64;
            if right > width as u64 || bottom > height as u64 {
                return Err(NitroError::FrameOutOfBounds {
                    name: name.clone(),
                    width,
                    height,
                });
            }
        }
        sheet.meta.size = Size {
            w: width,
            h: height,
        };

        self.store(entry, &model, atlas)
    }

    /// Rename the furniture: `old` becomes `new` in every entry name and
    /// inside every text entry. Binary entries keep their bytes.
    pub fn rename(&mut self, old: &str, new: &str) {
        if old.is_empty() || old == new {
            return;
        }
        let renamed: Archive = std::mem::take(self)
            .into_entries()
            .map(|(name, data)| {
                let data = if is_text_entry(&name) {
                    match String::from_utf8(data) {
                        Ok(text) => text.replace(old, new).into_bytes(),
                        Err(e) => e.into_bytes(),
                    }
                } else {
                    data
                };
                (name.replace(old, new), data)
            })
            .collect();
        debug!(old, new, entries = renamed.len(), "renamed furniture");
        *self = renamed;
    }
}

fn is_text_entry(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEXT_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
}

fn crop(atlas: &RgbaImage, frame: &AtlasFrame) -> RgbaImage {
    let r = frame.frame;
    imageops::crop_imm(atlas, r.x, r.y, r.w, r.h).to_image()
}
