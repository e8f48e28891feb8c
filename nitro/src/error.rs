use crate::archive::ArchiveError;
use crate::bitmap::ImageError;
use crate::reader::SwfError;

pub type NitroResult<T> = Result<T, NitroError>;

#[derive(thiserror::Error, Debug)]
pub enum NitroError {
    #[error("swf error: {0}")]
    Swf(#[from] SwfError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("image error: {0}")]
    Image(#[from] ImageError),

    #[error("atlas codec error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive has no asset description")]
    MissingDocument,

    #[error("atlas image {0} is missing from the archive")]
    MissingAtlas(String),

    #[error("sprite not found: {0}")]
    SpriteNotFound(String),

    #[error("frame {name} does not fit in a {width}x{height} atlas")]
    FrameOutOfBounds {
        name: String,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NitroError {
    pub fn sprite_not_found(name: impl Into<String>) -> Self {
        Self::SpriteNotFound(name.into())
    }

    pub fn missing_atlas(name: impl Into<String>) -> Self {
        Self::MissingAtlas(name.into())
    }
}
