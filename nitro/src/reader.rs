//! Low-level SWF reader.
//!
//! Unwraps the container, walks the tag stream and parses the handful of tags
//! needed to pull furniture sprites and their XML out of a file. Tag bodies
//! are borrowed from the uncompressed body; nothing is decoded eagerly.

use std::borrow::Cow;

use crate::bit_reader::{BitReader, ReadError, Rect};
use crate::compression::inflate_zlib;

pub const TAG_END: u16 = 0;
pub const TAG_DEFINE_BITS_LOSSLESS: u16 = 20;
pub const TAG_DEFINE_BITS_JPEG2: u16 = 21;
pub const TAG_DEFINE_BITS_JPEG3: u16 = 35;
pub const TAG_DEFINE_BITS_LOSSLESS2: u16 = 36;
pub const TAG_SYMBOL_CLASS: u16 = 76;
pub const TAG_DEFINE_BINARY_DATA: u16 = 87;

/// Six-bit tag length that escapes to a trailing 32-bit length.
const LONG_TAG_LENGTH: u16 = 0x3F;
const HEADER_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum SwfError {
    #[error("unsupported container signature {:?}", String::from_utf8_lossy(.signature))]
    UnsupportedContainer { signature: [u8; 3] },
    #[error("container header truncated ({len} bytes)")]
    TruncatedHeader { len: usize },
    #[error("failed to inflate compressed body")]
    Inflate(#[source] std::io::Error),
    #[error("corrupt tag stream at byte {offset}")]
    CorruptTagStream {
        offset: usize,
        #[source]
        source: ReadError,
    },
    #[error("malformed {kind} tag (code {code})")]
    MalformedTag {
        code: u16,
        kind: &'static str,
        #[source]
        source: ReadError,
    },
}

pub fn tag_name(code: u16) -> &'static str {
    match code {
        TAG_END => "End",
        TAG_DEFINE_BITS_LOSSLESS => "DefineBitsLossless",
        TAG_DEFINE_BITS_JPEG2 => "DefineBitsJPEG2",
        TAG_DEFINE_BITS_JPEG3 => "DefineBitsJPEG3",
        TAG_DEFINE_BITS_LOSSLESS2 => "DefineBitsLossless2",
        TAG_SYMBOL_CLASS => "SymbolClass",
        TAG_DEFINE_BINARY_DATA => "DefineBinaryData",
        _ => "unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerCompression {
    /// `FWS`
    None,
    /// `CWS`
    Zlib,
}

#[derive(Debug, Clone)]
pub struct SwfHeader {
    pub compression: ContainerCompression,
    pub version: u8,
    /// Uncompressed file length as declared by the header. Not validated.
    pub file_length: u32,
}

/// Check the signature and return the uncompressed body that follows the
/// 8-byte header.
pub fn open_container(data: &[u8]) -> Result<(SwfHeader, Cow<'_, [u8]>), SwfError> {
    if data.len() < HEADER_LEN {
        return Err(SwfError::TruncatedHeader { len: data.len() });
    }

    let signature = [data[0], data[1], data[2]];
    let compression = match &signature {
        b"FWS" => ContainerCompression::None,
        b"CWS" => ContainerCompression::Zlib,
        _ => return Err(SwfError::UnsupportedContainer { signature }),
    };

    let header = SwfHeader {
        compression,
        version: data[3],
        file_length: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
    };

    let body = match compression {
        ContainerCompression::None => Cow::Borrowed(&data[HEADER_LEN..]),
        ContainerCompression::Zlib => {
            Cow::Owned(inflate_zlib(&data[HEADER_LEN..]).map_err(SwfError::Inflate)?)
        }
    };

    Ok((header, body))
}

/// One raw tag as it appears in the stream.
#[derive(Debug, Clone, Copy)]
pub struct TagRecord<'a> {
    pub code: u16,
    pub body: &'a [u8],
}

/// Streams tag records out of an uncompressed SWF body.
pub struct TagReader<'a> {
    bits: BitReader<'a>,
    pub frame_bounds: Rect,
    /// Frames per second in 8.8 fixed point.
    pub frame_rate: u16,
    pub frame_count: u16,
    done: bool,
}

impl<'a> TagReader<'a> {
    /// Consume the movie framing fields that sit between the header and the
    /// first tag.
    pub fn new(body: &'a [u8]) -> Result<Self, SwfError> {
        let mut bits = BitReader::new(body);
        let corrupt = |bits: &BitReader<'_>, source| SwfError::CorruptTagStream {
            offset: bits.position(),
            source,
        };

        let frame_bounds = bits.read_rect().map_err(|e| corrupt(&bits, e))?;
        let frame_rate = bits.read_u16().map_err(|e| corrupt(&bits, e))?;
        let frame_count = bits.read_u16().map_err(|e| corrupt(&bits, e))?;

        Ok(Self {
            bits,
            frame_bounds,
            frame_rate,
            frame_count,
            done: false,
        })
    }

    /// Next tag, or `None` after the End tag or at a clean end of input.
    pub fn next_record(&mut self) -> Result<Option<TagRecord<'a>>, SwfError> {
        if self.done {
            return Ok(None);
        }
        if self.bits.remaining() == 0 {
            self.done = true;
            return Ok(None);
        }

        let start = self.bits.position();
        let record = self.read_record().map_err(|source| {
            self.done = true;
            SwfError::CorruptTagStream {
                offset: start,
                source,
            }
        })?;

        if record.code == TAG_END {
            self.done = true;
            return Ok(None);
        }
        Ok(Some(record))
    }

    fn read_record(&mut self) -> Result<TagRecord<'a>, ReadError> {
        let code_and_length = self.bits.read_u16()?;
        let code = code_and_length >> 6;
        let mut length = (code_and_length & LONG_TAG_LENGTH) as usize;
        if length == LONG_TAG_LENGTH as usize {
            length = self.bits.read_u32()? as usize;
        }
        let body = self.bits.read_bytes(length)?;
        Ok(TagRecord { code, body })
    }
}

impl<'a> Iterator for TagReader<'a> {
    type Item = Result<TagRecord<'a>, SwfError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// The four bitmap tags the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Lossless,
    Lossless2,
    Jpeg2,
    Jpeg3,
}

impl ImageKind {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            TAG_DEFINE_BITS_LOSSLESS => Some(Self::Lossless),
            TAG_DEFINE_BITS_LOSSLESS2 => Some(Self::Lossless2),
            TAG_DEFINE_BITS_JPEG2 => Some(Self::Jpeg2),
            TAG_DEFINE_BITS_JPEG3 => Some(Self::Jpeg3),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Lossless => TAG_DEFINE_BITS_LOSSLESS,
            Self::Lossless2 => TAG_DEFINE_BITS_LOSSLESS2,
            Self::Jpeg2 => TAG_DEFINE_BITS_JPEG2,
            Self::Jpeg3 => TAG_DEFINE_BITS_JPEG3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: u16,
    pub name: String,
}

/// A bitmap tag whose pixels have not been decoded yet.
#[derive(Debug, Clone)]
pub struct ImageTag {
    pub kind: ImageKind,
    pub character_id: u16,
    /// Tag body after the character id.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum Tag {
    SymbolClass(Vec<Symbol>),
    DefineBinaryData { id: u16, data: Vec<u8> },
    Image(ImageTag),
    /// Any tag this reader does not interpret. Skipped, never an error.
    Unknown { code: u16 },
}

impl Tag {
    pub fn parse(record: &TagRecord<'_>) -> Result<Self, SwfError> {
        let malformed = |source| SwfError::MalformedTag {
            code: record.code,
            kind: tag_name(record.code),
            source,
        };
        let mut bits = BitReader::new(record.body);

        match record.code {
            TAG_SYMBOL_CLASS => {
                let count = bits.read_u16().map_err(malformed)? as usize;
                let mut symbols = Vec::with_capacity(count);
                for _ in 0..count {
                    let id = bits.read_u16().map_err(malformed)?;
                    let name = bits.read_cstring().map_err(malformed)?;
                    symbols.push(Symbol { id, name });
                }
                Ok(Self::SymbolClass(symbols))
            }
            TAG_DEFINE_BINARY_DATA => {
                let id = bits.read_u16().map_err(malformed)?;
                let _reserved = bits.read_u32().map_err(malformed)?;
                Ok(Self::DefineBinaryData {
                    id,
                    data: bits.rest().to_vec(),
                })
            }
            code => match ImageKind::from_code(code) {
                Some(kind) => {
                    let character_id = bits.read_u16().map_err(malformed)?;
                    Ok(Self::Image(ImageTag {
                        kind,
                        character_id,
                        data: bits.rest().to_vec(),
                    }))
                }
                None => Ok(Self::Unknown { code }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_header(code: u16, len: usize) -> Vec<u8> {
        if len < LONG_TAG_LENGTH as usize {
            ((code << 6) | len as u16).to_le_bytes().to_vec()
        } else {
            let mut out = ((code << 6) | LONG_TAG_LENGTH).to_le_bytes().to_vec();
            out.extend_from_slice(&(len as u32).to_le_bytes());
            out
        }
    }

    fn body_with(tags: &[(u16, Vec<u8>)]) -> Vec<u8> {
        // empty RECT, frame rate 24.0, one frame
        let mut body = vec![0x00, 0x00, 0x18, 0x01, 0x00];
        for (code, payload) in tags {
            body.extend(tag_header(*code, payload.len()));
            body.extend_from_slice(payload);
        }
        body
    }

    #[test]
    fn test_open_uncompressed_container() {
        let mut data = b"FWS\x0a".to_vec();
        data.extend_from_slice(&13u32.to_le_bytes());
        data.extend_from_slice(&[1, 2, 3, 4, 5]);

        let (header, body) = open_container(&data).unwrap();
        assert_eq!(header.compression, ContainerCompression::None);
        assert_eq!(header.version, 10);
        assert_eq!(&*body, &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_open_compressed_container() {
        let mut data = b"CWS\x0a\0\0\0\0".to_vec();
        data.extend(crate::compression::deflate_zlib(b"payload").unwrap());

        let (header, body) = open_container(&data).unwrap();
        assert_eq!(header.compression, ContainerCompression::Zlib);
        assert_eq!(&*body, b"payload");
    }

    #[test]
    fn test_reject_lzma_container() {
        let data = b"ZWS\x0d\0\0\0\0\0\0";
        let err = open_container(data).unwrap_err();
        assert!(matches!(
            err,
            SwfError::UnsupportedContainer { signature } if &signature == b"ZWS"
        ));
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            open_container(b"FWS"),
            Err(SwfError::TruncatedHeader { len: 3 })
        ));
    }

    #[test]
    fn test_framing_fields() {
        let body = body_with(&[]);
        let reader = TagReader::new(&body).unwrap();
        assert_eq!(reader.frame_rate, 0x1800);
        assert_eq!(reader.frame_count, 1);
    }

    #[test]
    fn test_walk_short_and_long_tags() {
        let long_payload = vec![0xAA; 100];
        let body = body_with(&[(9, vec![1, 2, 3]), (87, long_payload.clone()), (0, vec![])]);
        let mut reader = TagReader::new(&body).unwrap();

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.code, 9);
        assert_eq!(first.body, &[1, 2, 3]);

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.code, 87);
        assert_eq!(second.body, &long_payload[..]);

        assert!(reader.next_record().unwrap().is_none());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_end_of_input_without_end_tag() {
        let body = body_with(&[(9, vec![0; 4])]);
        let records: Vec<_> = TagReader::new(&body).unwrap().collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_ok());
    }

    #[test]
    fn test_truncated_body_is_corrupt() {
        let mut body = body_with(&[]);
        body.extend(tag_header(87, 10));
        body.extend_from_slice(&[0; 4]);

        let mut reader = TagReader::new(&body).unwrap();
        let err = reader.next_record().unwrap_err();
        assert!(matches!(err, SwfError::CorruptTagStream { offset: 5, .. }));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_half_header_is_corrupt() {
        let mut body = body_with(&[]);
        body.push(0x40);
        let mut reader = TagReader::new(&body).unwrap();
        assert!(reader.next_record().is_err());
    }

    #[test]
    fn test_parse_symbol_class() {
        let mut payload = 2u16.to_le_bytes().to_vec();
        payload.extend_from_slice(&[1, 0]);
        payload.extend_from_slice(b"chair_64_a_0_0\0");
        payload.extend_from_slice(&[1, 0]);
        payload.extend_from_slice(b"chair_64_a_2_0\0");

        let tag = Tag::parse(&TagRecord {
            code: TAG_SYMBOL_CLASS,
            body: &payload,
        })
        .unwrap();

        let Tag::SymbolClass(symbols) = tag else {
            panic!("expected SymbolClass");
        };
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "chair_64_a_0_0");
        assert_eq!(symbols[1].id, 1);
    }

    #[test]
    fn test_parse_binary_data() {
        let mut payload = 7u16.to_le_bytes().to_vec();
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(b"<xml/>");

        let tag = Tag::parse(&TagRecord {
            code: TAG_DEFINE_BINARY_DATA,
            body: &payload,
        })
        .unwrap();
        assert!(matches!(tag, Tag::DefineBinaryData { id: 7, ref data } if data == b"<xml/>"));
    }

    #[test]
    fn test_parse_image_tag_keeps_body() {
        let payload = [3, 0, 9, 9, 9];
        let tag = Tag::parse(&TagRecord {
            code: TAG_DEFINE_BITS_JPEG2,
            body: &payload,
        })
        .unwrap();
        let Tag::Image(image) = tag else {
            panic!("expected image");
        };
        assert_eq!(image.kind, ImageKind::Jpeg2);
        assert_eq!(image.character_id, 3);
        assert_eq!(image.data, vec![9, 9, 9]);
    }

    #[test]
    fn test_unknown_tag_is_skipped() {
        let tag = Tag::parse(&TagRecord {
            code: 26,
            body: &[0xFF],
        })
        .unwrap();
        assert!(matches!(tag, Tag::Unknown { code: 26 }));
    }

    #[test]
    fn test_malformed_symbol_class_names_the_tag() {
        let payload = [5, 0, 1];
        let err = Tag::parse(&TagRecord {
            code: TAG_SYMBOL_CLASS,
            body: &payload,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "malformed SymbolClass tag (code 76)");
    }
}
