//! SWF to Nitro conversion.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};
use tracing::{debug, warn};

use crate::archive::Archive;
use crate::document::SwfDocument;
use crate::error::NitroResult;
use crate::mapper::{AliasTable, LegacyDocuments, map_asset_model, needed_sprites};
use crate::model::AssetModel;
use crate::packer::pack_sprites;

/// Depth used for logic dimensions that leave `z` unset.
pub const DEFAULT_DEPTH: f64 = 1.0;

/// A converted furniture: its description and the packed atlas.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub name: String,
    pub model: AssetModel,
    pub atlas: RgbaImage,
}

impl Conversion {
    pub fn json_name(&self) -> String {
        format!("{}.json", self.name)
    }

    /// Archive entry name of the atlas, as recorded in the spritesheet meta.
    pub fn image_name(&self) -> String {
        self.model
            .spritesheet
            .as_ref()
            .map(|sheet| sheet.meta.image.clone())
            .unwrap_or_else(|| format!("{}.png", self.name))
    }

    pub fn to_json(&self) -> NitroResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.model)?)
    }

    pub fn encode_atlas(&self) -> NitroResult<Vec<u8>> {
        encode_png(&self.atlas)
    }

    pub fn into_archive(self) -> NitroResult<Archive> {
        let mut archive = Archive::new();
        archive.insert(self.json_name(), self.to_json()?);
        archive.insert(self.image_name(), self.encode_atlas()?);
        Ok(archive)
    }
}

pub(crate) fn encode_png(image: &RgbaImage) -> NitroResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Furniture name for an input label: the last path component without
/// `.swf`. Both separators are accepted so Windows paths work anywhere.
pub fn base_name(label: &str) -> String {
    let file = label.rsplit(['/', '\\']).next().unwrap_or(label);
    file.strip_suffix(".swf").unwrap_or(file).to_string()
}

/// Convert one SWF. `source_name` is only used to derive the furniture name.
#[tracing::instrument(skip(data), fields(len = data.len()))]
pub fn convert(data: &[u8], source_name: &str, default_depth: f64) -> NitroResult<Conversion> {
    let doc = SwfDocument::parse(data)?;
    let name = base_name(source_name);

    let docs = LegacyDocuments::load(&doc);
    let aliases = AliasTable::build(&doc, &name);
    let needed = needed_sprites(docs.assets.as_ref(), &aliases);

    let sprites = collect_sprites(&doc, &aliases, &needed);
    let packed = pack_sprites(sprites);

    let mut model = map_asset_model(&docs, &name, default_depth, &aliases);
    let mut sheet = packed.spritesheet(&format!("{name}.png"));
    if let Some(manifest) = &docs.manifest {
        sheet.meta.version = manifest.library.version.clone();
    }
    model.spritesheet = Some(sheet);

    debug!(
        images = doc.image_count(),
        aliases = aliases.len(),
        frames = packed.frames.len(),
        assets = model.assets.len(),
        "converted"
    );

    Ok(Conversion {
        name,
        model,
        atlas: packed.image,
    })
}

/// Decode the bitmaps the asset list needs, once per character, keyed by the
/// stripped canonical name. A bitmap that fails to decode is left out.
fn collect_sprites(
    doc: &SwfDocument,
    aliases: &AliasTable,
    needed: &HashSet<String>,
) -> Vec<(String, RgbaImage)> {
    let mut seen = HashSet::new();
    let mut sprites = Vec::new();

    for symbol in doc.symbols() {
        if !doc.has_image(symbol.id) || !seen.insert(symbol.id) {
            continue;
        }
        let Some(name) = aliases.sprite_name(symbol.id) else {
            continue;
        };
        if !needed.contains(name) {
            continue;
        }

        match doc.image(symbol.id) {
            Some(Ok(image)) => sprites.push((name.to_string(), image)),
            Some(Err(e)) => {
                warn!(character = symbol.id, sprite = name, error = %e, "failed to decode image")
            }
            None => {}
        }
    }

    sprites
}

/// Convert straight to an archive holding `<name>.json` and `<name>.png`.
pub fn decode(data: &[u8], source_name: &str, default_depth: f64) -> NitroResult<Archive> {
    convert(data, source_name, default_depth)?.into_archive()
}

pub fn convert_file(path: impl AsRef<Path>, default_depth: f64) -> NitroResult<Conversion> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    convert(&data, &path.to_string_lossy(), default_depth)
}
