//! Byte and bit cursor over an uncompressed SWF body.
//!
//! Byte reads are little-endian and always start on a byte boundary: any bits
//! left over from a previous bit read are dropped. The SWF header interleaves
//! one bit-packed rectangle with otherwise byte-aligned fields, so this
//! realignment is part of the format, not a convenience.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("truncated input at byte offset {offset}")]
    TruncatedInput { offset: usize },
}

/// Bounds in twips, as stored by the SWF `RECT` record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

pub struct BitReader<'a> {
    bytes: &'a [u8],
    idx: usize,
    bit_buf: u8,
    bits_left: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            idx: 0,
            bit_buf: 0,
            bits_left: 0,
        }
    }

    /// Byte offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.idx
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.idx
    }

    /// Drop any partially consumed byte.
    pub fn align(&mut self) {
        self.bit_buf = 0;
        self.bits_left = 0;
    }

    fn truncated(&self) -> ReadError {
        ReadError::TruncatedInput { offset: self.idx }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        self.align();
        let end = self.idx.checked_add(len).ok_or_else(|| self.truncated())?;
        let slice = self.bytes.get(self.idx..end).ok_or_else(|| self.truncated())?;
        self.idx = end;
        Ok(slice)
    }

    /// Everything from the current byte to the end of input.
    pub fn rest(&mut self) -> &'a [u8] {
        self.align();
        let slice = &self.bytes[self.idx..];
        self.idx = self.bytes.len();
        slice
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Variable-length unsigned integer: 7 bits per byte, low group first,
    /// high bit set on every byte except the last.
    pub fn read_var_u32(&mut self) -> Result<u32, ReadError> {
        self.align();
        let mut result = 0u32;
        let mut shift = 0u32;
        loop {
            let b = self.read_u8()?;
            if shift < 32 {
                result |= ((b & 0x7f) as u32) << shift;
            }
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// NUL-terminated string. The terminator is consumed but not returned.
    pub fn read_cstring(&mut self) -> Result<String, ReadError> {
        self.align();
        let tail = &self.bytes[self.idx..];
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(ReadError::TruncatedInput {
                offset: self.bytes.len(),
            })?;
        let s = String::from_utf8_lossy(&tail[..len]).into_owned();
        self.idx += len + 1;
        Ok(s)
    }

    pub fn read_bit(&mut self) -> Result<bool, ReadError> {
        if self.bits_left == 0 {
            let b = *self.bytes.get(self.idx).ok_or_else(|| self.truncated())?;
            self.idx += 1;
            self.bit_buf = b;
            self.bits_left = 8;
        }
        self.bits_left -= 1;
        Ok((self.bit_buf >> self.bits_left) & 1 == 1)
    }

    /// Read `count` bits, most significant first. `count` must be at most 32.
    pub fn read_bits(&mut self, count: u32) -> Result<u32, ReadError> {
        debug_assert!(count <= 32);
        let mut ret = 0u32;
        for _ in 0..count {
            ret = (ret << 1) | self.read_bit()? as u32;
        }
        Ok(ret)
    }

    /// Read `count` bits and sign-extend from bit `count - 1`.
    pub fn read_signed_bits(&mut self, count: u32) -> Result<i32, ReadError> {
        let raw = self.read_bits(count)?;
        if count == 0 || count >= 32 {
            return Ok(raw as i32);
        }
        let shift = 32 - count;
        Ok(((raw << shift) as i32) >> shift)
    }

    pub fn read_rect(&mut self) -> Result<Rect, ReadError> {
        let nbits = self.read_bits(5)?;
        let rect = Rect {
            x_min: self.read_signed_bits(nbits)?,
            x_max: self.read_signed_bits(nbits)?,
            y_min: self.read_signed_bits(nbits)?,
            y_max: self.read_signed_bits(nbits)?,
        };
        self.align();
        Ok(rect)
    }
}
