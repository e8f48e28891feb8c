//! The `.nitro` container.
//!
//! A flat list of named blobs, each deflated on its own:
//!
//! ```text
//! u16 count
//! count x { u16 name_len, name, u32 payload_len, zlib payload }
//! ```
//!
//! All integers are big-endian.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::compression::{deflate_zlib, inflate_gzip, inflate_zlib};

/// Start of a PNG that was base64-encoded twice (`base64("iVBORw...")`).
const DOUBLE_BASE64_PNG: &[u8] = b"aVZC";
/// Start of a base64-encoded PNG signature.
const BASE64_PNG: &[u8] = b"iVBORw";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("too many entries for one archive ({count})")]
    TooManyEntries { count: usize },
    #[error("entry name is {len} bytes, longer than the format allows: {name}")]
    NameTooLong { name: String, len: usize },
    #[error("entry {name} compresses to {len} bytes, larger than the format allows")]
    EntryTooLarge { name: String, len: usize },
    #[error("archive truncated while reading {field} of entry {index}")]
    Truncated { index: usize, field: &'static str },
    #[error("entry {name} is neither zlib nor gzip data")]
    CorruptEntry { name: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Named blobs, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) -> Option<Vec<u8>> {
        self.entries.insert(name.into(), data)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, Vec<u8>)> {
        self.entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        let count = u16::try_from(self.entries.len()).map_err(|_| ArchiveError::TooManyEntries {
            count: self.entries.len(),
        })?;

        let mut out = Vec::new();
        out.extend_from_slice(&count.to_be_bytes());

        for (name, data) in &self.entries {
            let name_len = u16::try_from(name.len()).map_err(|_| ArchiveError::NameTooLong {
                name: name.clone(),
                len: name.len(),
            })?;
            let payload = deflate_zlib(data)?;
            let payload_len =
                u32::try_from(payload.len()).map_err(|_| ArchiveError::EntryTooLarge {
                    name: name.clone(),
                    len: payload.len(),
                })?;

            out.extend_from_slice(&name_len.to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&payload_len.to_be_bytes());
            out.extend_from_slice(&payload);
        }

        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ArchiveError> {
        let mut cursor = Framing { data, pos: 0 };
        let count = cursor.read_u16(0, "entry count")?;

        let mut entries = BTreeMap::new();
        for index in 0..count as usize {
            let name_len = cursor.read_u16(index, "name length")? as usize;
            let name = String::from_utf8_lossy(cursor.take(name_len, index, "name")?).into_owned();
            let payload_len = cursor.read_u32(index, "payload length")? as usize;
            let payload = cursor.take(payload_len, index, "payload")?;

            let mut blob = inflate_entry(&name, payload)?;
            if name.ends_with(".png") {
                blob = sanitize_png(blob);
            }
            entries.insert(name, blob);
        }

        Ok(Self { entries })
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Write to a uniquely named temp file next to `path`, then rename it
    /// over `path`. Concurrent writers never share a temp file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ArchiveError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut tmp = tempfile::Builder::new()
            .prefix(".nitro-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl FromIterator<(String, Vec<u8>)> for Archive {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn inflate_entry(name: &str, payload: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    match inflate_zlib(payload) {
        Ok(blob) => Ok(blob),
        Err(zlib_err) => {
            debug!(entry = name, error = %zlib_err, "entry is not zlib, trying gzip");
            inflate_gzip(payload).map_err(|_| ArchiveError::CorruptEntry {
                name: name.to_string(),
            })
        }
    }
}

/// Undo the double base64 encoding some editors wrap PNG entries in.
pub fn sanitize_png(data: Vec<u8>) -> Vec<u8> {
    if !data.starts_with(DOUBLE_BASE64_PNG) {
        return data;
    }
    let Ok(once) = STANDARD.decode(data.trim_ascii()) else {
        return data;
    };
    if !once.starts_with(BASE64_PNG) {
        return data;
    }
    match STANDARD.decode(once.trim_ascii()) {
        Ok(png) => png,
        Err(_) => data,
    }
}

/// Bounds-checked big-endian reads over the archive bytes.
struct Framing<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Framing<'a> {
    fn take(
        &mut self,
        len: usize,
        index: usize,
        field: &'static str,
    ) -> Result<&'a [u8], ArchiveError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(ArchiveError::Truncated { index, field })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u16(&mut self, index: usize, field: &'static str) -> Result<u16, ArchiveError> {
        let b = self.take(2, index, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self, index: usize, field: &'static str) -> Result<u32, ArchiveError> {
        let b = self.take(4, index, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
