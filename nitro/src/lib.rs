//! Furniture SWF to Nitro converter.
//!
//! Reads the SWF files legacy Habbo-style hotels ship their furniture in and
//! turns them into `.nitro` archives: a packed sprite atlas plus a JSON
//! description of assets, visualizations and logic.
//!
//! # Example
//!
//! ```ignore
//! use nitro::{Archive, decode};
//!
//! let data = std::fs::read("chair.swf").unwrap();
//! let archive = decode(&data, "chair.swf", 1.0).unwrap();
//! archive.write("chair.nitro").unwrap();
//!
//! let archive = Archive::read("chair.nitro").unwrap();
//! let sprite = archive.extract_sprite("chair_64_a_0_0").unwrap();
//! println!("Sprite: {}x{}", sprite.width(), sprite.height());
//! ```

pub mod archive;
pub mod batch;
pub mod bit_reader;
pub mod bitmap;
pub mod compression;
pub mod convert;
pub mod document;
mod error;
pub mod mapper;
pub mod model;
mod package;
pub mod packer;
pub mod reader;
pub mod settings;
pub mod xml;

pub use archive::{Archive, ArchiveError};
pub use batch::{BatchItem, BatchOutput, BatchReport, convert_batch};
pub use bitmap::{ImageError, decode_image};
pub use convert::{Conversion, DEFAULT_DEPTH, base_name, convert, convert_file, decode};
pub use document::SwfDocument;
pub use error::{NitroError, NitroResult};
pub use model::AssetModel;
pub use package::ICON_SUFFIX;
pub use reader::SwfError;
pub use settings::Settings;
