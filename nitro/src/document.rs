//! Everything a furniture SWF declares, indexed for the converter.
//!
//! Built in one pass over the tag stream. Bitmaps stay encoded until someone
//! asks for them, which is usually only the handful the asset list needs.

use std::collections::HashMap;

use image::RgbaImage;
use tracing::{trace, warn};

use crate::bitmap::{ImageError, decode_image};
use crate::reader::{ImageTag, Symbol, SwfError, SwfHeader, Tag, TagReader, open_container};
use crate::xml::{XmlDocument, parse_document};

#[derive(Debug, Clone)]
pub struct SwfDocument {
    pub header: SwfHeader,
    images: HashMap<u16, ImageTag>,
    binary_data: HashMap<u16, Vec<u8>>,
    /// Exported symbols in the order they first appear.
    symbols: Vec<Symbol>,
    symbol_index: HashMap<String, usize>,
    /// First name exported for each character id.
    class_names: HashMap<u16, String>,
}

impl SwfDocument {
    pub fn parse(data: &[u8]) -> Result<Self, SwfError> {
        let (header, body) = open_container(data)?;

        let mut doc = Self {
            header,
            images: HashMap::new(),
            binary_data: HashMap::new(),
            symbols: Vec::new(),
            symbol_index: HashMap::new(),
            class_names: HashMap::new(),
        };

        for record in TagReader::new(&body)? {
            match Tag::parse(&record?)? {
                Tag::SymbolClass(symbols) => {
                    for symbol in symbols {
                        doc.add_symbol(symbol);
                    }
                }
                Tag::DefineBinaryData { id, data } => {
                    doc.binary_data.insert(id, data);
                }
                Tag::Image(image) => {
                    doc.images.insert(image.character_id, image);
                }
                Tag::Unknown { code } => trace!(code, "skipping tag"),
            }
        }

        Ok(doc)
    }

    fn add_symbol(&mut self, symbol: Symbol) {
        self.class_names
            .entry(symbol.id)
            .or_insert_with(|| symbol.name.clone());

        match self.symbol_index.get(&symbol.name) {
            Some(&pos) => self.symbols[pos].id = symbol.id,
            None => {
                self.symbol_index
                    .insert(symbol.name.clone(), self.symbols.len());
                self.symbols.push(symbol);
            }
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn character_id(&self, name: &str) -> Option<u16> {
        self.symbol_index.get(name).map(|&pos| self.symbols[pos].id)
    }

    /// The first name a character was exported under. Later names are aliases.
    pub fn canonical_name(&self, id: u16) -> Option<&str> {
        self.class_names.get(&id).map(String::as_str)
    }

    pub fn has_image(&self, id: u16) -> bool {
        self.images.contains_key(&id)
    }

    pub fn image_tag(&self, id: u16) -> Option<&ImageTag> {
        self.images.get(&id)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Decode the bitmap for a character, if it has one.
    pub fn image(&self, id: u16) -> Option<Result<RgbaImage, ImageError>> {
        self.images.get(&id).map(decode_image)
    }

    pub fn binary_data(&self, id: u16) -> Option<&[u8]> {
        self.binary_data.get(&id).map(Vec::as_slice)
    }

    /// Find and parse the first exported document of type `D`.
    ///
    /// Candidates are tried in export order; a candidate that fails to parse is
    /// logged and skipped.
    pub fn load_document<D: XmlDocument>(&self) -> Option<D> {
        let kind = D::KIND;
        for symbol in &self.symbols {
            if !kind.matches_symbol(&symbol.name) {
                continue;
            }
            let Some(bytes) = self.binary_data(symbol.id) else {
                continue;
            };
            match parse_document::<D>(bytes) {
                Ok(doc) => return Some(doc),
                Err(e) => {
                    warn!(%kind, symbol = %symbol.name, error = %e, "skipping unreadable document")
                }
            }
        }
        None
    }
}
