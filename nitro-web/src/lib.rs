//! WASM bindings for the Nitro converter.
//!
//! Converts SWF furniture in the browser and reads `.nitro` archives back
//! for previewing sprites on an HTML canvas.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use nitro::Archive;

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// RGBA image data suitable for use with HTML Canvas.
#[wasm_bindgen]
pub struct ImageData {
    #[wasm_bindgen(readonly)]
    pub width: u32,
    #[wasm_bindgen(readonly)]
    pub height: u32,
    data: Vec<u8>,
}

#[wasm_bindgen]
impl ImageData {
    /// Get RGBA pixel data as Uint8Array.
    #[wasm_bindgen(getter)]
    pub fn data(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(&self.data[..])
    }
}

impl From<image::RgbaImage> for ImageData {
    fn from(img: image::RgbaImage) -> Self {
        ImageData {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
        }
    }
}

/// A named sprite cut out of the atlas.
#[wasm_bindgen]
pub struct SpriteData {
    name: String,
    image: ImageData,
}

#[wasm_bindgen]
impl SpriteData {
    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.name.clone()
    }

    /// Consumes the sprite and hands back its pixels.
    #[wasm_bindgen(js_name = "intoImage")]
    pub fn into_image(self) -> ImageData {
        self.image
    }
}

/// A `.nitro` archive, either loaded from bytes or produced by converting a SWF.
#[wasm_bindgen]
pub struct NitroArchive {
    inner: Archive,
}

#[wasm_bindgen]
impl NitroArchive {
    /// Load a `.nitro` archive from a Uint8Array.
    #[wasm_bindgen(constructor)]
    pub fn new(data: &[u8]) -> Result<NitroArchive, JsError> {
        let inner = Archive::from_bytes(data).map_err(js_error)?;
        Ok(NitroArchive { inner })
    }

    /// Convert a furniture SWF. `fileName` names the outputs; `defaultZ`
    /// falls back to 1.0.
    #[wasm_bindgen(js_name = "convertSwf")]
    pub fn convert_swf(
        data: &[u8],
        file_name: &str,
        default_z: Option<f64>,
    ) -> Result<NitroArchive, JsError> {
        let depth = default_z.unwrap_or(nitro::DEFAULT_DEPTH);
        let inner = nitro::decode(data, file_name, depth).map_err(js_error)?;
        web_sys::console::debug_1(
            &format!("converted {file_name}: {} entries", inner.len()).into(),
        );
        Ok(NitroArchive { inner })
    }

    /// Names of all entries, sorted.
    #[wasm_bindgen(js_name = "entryNames")]
    pub fn entry_names(&self) -> Vec<String> {
        self.inner.names().map(str::to_string).collect()
    }

    /// Raw bytes of an entry, if present.
    #[wasm_bindgen(js_name = "getEntry")]
    pub fn get_entry(&self, name: &str) -> Option<js_sys::Uint8Array> {
        self.inner.get(name).map(js_sys::Uint8Array::from)
    }

    /// Serialize the archive, e.g. for a download link.
    #[wasm_bindgen(js_name = "toBytes")]
    pub fn to_bytes(&self) -> Result<js_sys::Uint8Array, JsError> {
        let bytes = self.inner.to_bytes().map_err(js_error)?;
        Ok(js_sys::Uint8Array::from(&bytes[..]))
    }

    /// The asset description as a plain JS object.
    #[wasm_bindgen(js_name = "assetData")]
    pub fn asset_data(&self) -> Result<JsValue, JsError> {
        let model = self.inner.asset_model().map_err(js_error)?;
        // plain objects rather than Map for the BTreeMaps
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        model.serialize(&serializer).map_err(js_error)
    }

    /// Frame names listed in the spritesheet.
    #[wasm_bindgen(js_name = "spriteNames")]
    pub fn sprite_names(&self) -> Result<Vec<String>, JsError> {
        let sheet = self.inner.spritesheet().map_err(js_error)?;
        Ok(sheet.frames.into_keys().collect())
    }

    /// Cut a single sprite out of the atlas.
    #[wasm_bindgen(js_name = "extractSprite")]
    pub fn extract_sprite(&self, name: &str) -> Result<ImageData, JsError> {
        self.inner
            .extract_sprite(name)
            .map(ImageData::from)
            .map_err(js_error)
    }

    /// The furniture icon, if the atlas carries one.
    #[wasm_bindgen(js_name = "extractIcon")]
    pub fn extract_icon(&self) -> Result<SpriteData, JsError> {
        let (name, image) = self.inner.extract_icon().map_err(js_error)?;
        Ok(SpriteData {
            name,
            image: image.into(),
        })
    }

    /// The whole atlas image.
    #[wasm_bindgen(getter)]
    pub fn atlas(&self) -> Result<ImageData, JsError> {
        self.inner.atlas().map(ImageData::from).map_err(js_error)
    }

    /// Paint RGBA pixels (e.g. from a canvas) over one sprite.
    #[wasm_bindgen(js_name = "replaceSprite")]
    pub fn replace_sprite(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> Result<(), JsError> {
        let sprite = rgba_image(width, height, rgba)?;
        self.inner.replace_sprite(name, &sprite).map_err(js_error)
    }

    /// Swap the whole atlas. Every frame must still fit inside it.
    #[wasm_bindgen(js_name = "replaceAtlas")]
    pub fn replace_atlas(&mut self, width: u32, height: u32, rgba: Vec<u8>) -> Result<(), JsError> {
        let atlas = rgba_image(width, height, rgba)?;
        self.inner.replace_atlas(&atlas).map_err(js_error)
    }

    /// Replace the furniture name in entry names and text entries.
    pub fn rename(&mut self, old_name: &str, new_name: &str) {
        self.inner.rename(old_name, new_name);
    }
}

fn rgba_image(width: u32, height: u32, rgba: Vec<u8>) -> Result<image::RgbaImage, JsError> {
    let len = rgba.len();
    image::RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        JsError::new(&format!("{len} bytes is not a {width}x{height} RGBA image"))
    })
}
