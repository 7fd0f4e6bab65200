//! Little-endian field helpers shared by the proof and cache codecs
//!
//! Every read is bounds checked against the remaining input so a corrupt
//! length field is reported as malformed data before anything is allocated.

use crate::core::error::{MerkleError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Bounds-checked reader over an in-memory artifact
pub struct WireReader<'a> {
    cursor: Cursor<&'a [u8]>,
    format: &'static str,
}

impl<'a> WireReader<'a> {
    pub fn new(bytes: &'a [u8], format: &'static str) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            format,
        }
    }

    /// Bytes not consumed yet
    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    pub fn malformed(&self, reason: impl Into<String>) -> MerkleError {
        MerkleError::invalid_format(self.format, reason)
    }

    fn require(&self, needed: usize, field: &str) -> Result<()> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(self.malformed(format!(
                "insufficient bytes for {}: need {}, have {}",
                field, needed, remaining
            )));
        }
        Ok(())
    }

    pub fn read_u8(&mut self, field: &str) -> Result<u8> {
        self.require(1, field)?;
        Ok(self.cursor.read_u8()?)
    }

    /// Signed 32-bit length or count; negative values are rejected
    pub fn read_len(&mut self, field: &str) -> Result<usize> {
        self.require(4, field)?;
        let value = self.cursor.read_i32::<LittleEndian>()?;
        if value < 0 {
            return Err(self.malformed(format!("negative {}: {}", field, value)));
        }
        Ok(value as usize)
    }

    /// Signed 64-bit value; negative values are rejected
    pub fn read_u63(&mut self, field: &str) -> Result<u64> {
        self.require(8, field)?;
        let value = self.cursor.read_i64::<LittleEndian>()?;
        if value < 0 {
            return Err(self.malformed(format!("negative {}: {}", field, value)));
        }
        Ok(value as u64)
    }

    pub fn read_bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        self.require(len, field)?;
        let data: &'a [u8] = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        let bytes = &data[start..start + len];
        self.cursor.set_position((start + len) as u64);
        Ok(bytes)
    }

    /// Fail if any input is left over
    pub fn finish(self) -> Result<()> {
        let remaining = self.remaining();
        if remaining != 0 {
            return Err(self.malformed(format!("{} trailing bytes", remaining)));
        }
        Ok(())
    }
}

/// Write a length or count as a non-negative signed 32-bit field
pub fn write_len(buffer: &mut Vec<u8>, value: usize, field: &str) -> Result<()> {
    let value = i32::try_from(value).map_err(|_| {
        MerkleError::invalid_argument(format!("{} {} does not fit in 31 bits", field, value))
    })?;
    buffer.write_i32::<LittleEndian>(value)?;
    Ok(())
}

/// Write a value as a non-negative signed 64-bit field
pub fn write_u63(buffer: &mut Vec<u8>, value: u64, field: &str) -> Result<()> {
    let value = i64::try_from(value).map_err(|_| {
        MerkleError::invalid_argument(format!("{} {} does not fit in 63 bits", field, value))
    })?;
    buffer.write_i64::<LittleEndian>(value)?;
    Ok(())
}
