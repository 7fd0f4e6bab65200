//! Restartable leaf sources and the length-prefixed record format
//!
//! A leaf source must yield the same sequence every time it is opened; the
//! streaming engine re-reads it to answer proof requests.

use crate::core::error::{MerkleError, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Largest record accepted from a record file
pub const MAX_RECORD_LEN: usize = 256 * 1024 * 1024;

/// Read buffer used by file-backed sources unless configured otherwise
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024; // 64KB buffer

/// Iterator returned by [`LeafSource::open`]
pub type LeafIter<'a> = Box<dyn Iterator<Item = Result<Vec<u8>>> + 'a>;

/// Finite, ordered sequence of byte blobs that can be read from the start
/// any number of times
pub trait LeafSource {
    fn open(&self) -> Result<LeafIter<'_>>;
}

impl<T: AsRef<[u8]>> LeafSource for [T] {
    fn open(&self) -> Result<LeafIter<'_>> {
        Ok(Box::new(self.iter().map(|leaf| Ok(leaf.as_ref().to_vec()))))
    }
}

impl<T: AsRef<[u8]>> LeafSource for Vec<T> {
    fn open(&self) -> Result<LeafIter<'_>> {
        self.as_slice().open()
    }
}

impl<S: LeafSource + ?Sized> LeafSource for &S {
    fn open(&self) -> Result<LeafIter<'_>> {
        (**self).open()
    }
}

/// Append one `u32` length-prefixed record
pub fn write_record<W: Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| MerkleError::invalid_argument("record longer than u32::MAX bytes"))?;
    writer.write_u32::<LittleEndian>(len)?;
    writer.write_all(data)?;
    Ok(())
}

/// Read one length-prefixed record; `None` at a clean end of input
pub fn read_record<R: Read>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => return Ok(None),
        4 => {}
        _ => {
            return Err(MerkleError::invalid_format(
                "record file",
                "truncated length prefix",
            ))
        }
    }
    let len = u32::from_le_bytes(prefix) as usize;
    if len > max_len {
        return Err(MerkleError::invalid_format(
            "record file",
            format!("record of {} bytes exceeds limit of {}", len, max_len),
        ));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            MerkleError::invalid_format("record file", "truncated record")
        } else {
            e.into()
        }
    })?;
    Ok(Some(data))
}

/// Leaves stored as length-prefixed records in a file
#[derive(Debug, Clone)]
pub struct RecordFileSource {
    path: PathBuf,
    buffer_size: usize,
}

impl RecordFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Read through a buffer of `buffer_size` bytes (at least 1)
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LeafSource for RecordFileSource {
    fn open(&self) -> Result<LeafIter<'_>> {
        let file = File::open(&self.path).map_err(|e| MerkleError::file_io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut done = false;
        Ok(Box::new(std::iter::from_fn(move || {
            if done {
                return None;
            }
            match read_record(&mut reader, MAX_RECORD_LEN) {
                Ok(Some(record)) => Some(Ok(record)),
                Ok(None) => {
                    done = true;
                    None
                }
                Err(e) => {
                    done = true;
                    Some(Err(e))
                }
            }
        })))
    }
}

/// Writes leaves in the format read by [`RecordFileSource`]
pub struct RecordFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    count: u64,
}

impl RecordFileWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| MerkleError::file_io(&path, e))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            count: 0,
        })
    }

    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        write_record(&mut self.writer, data)?;
        self.count += 1;
        Ok(())
    }

    /// Flush and return the number of records written
    pub fn finish(mut self) -> Result<u64> {
        self.writer
            .flush()
            .map_err(|e| MerkleError::file_io(&self.path, e))?;
        Ok(self.count)
    }
}

/// Newline-delimited text file; each line is one leaf
///
/// Line terminators (`\n` or `\r\n`) are not part of the leaf.
#[derive(Debug, Clone)]
pub struct LineFileSource {
    path: PathBuf,
    buffer_size: usize,
}

impl LineFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Read through a buffer of `buffer_size` bytes (at least 1)
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LeafSource for LineFileSource {
    fn open(&self) -> Result<LeafIter<'_>> {
        let file = File::open(&self.path).map_err(|e| MerkleError::file_io(&self.path, e))?;
        let path = &self.path;
        Ok(Box::new(BufReader::with_capacity(self.buffer_size, file).split(b'\n').map(
            move |line| {
                let mut line = line.map_err(|e| MerkleError::file_io(path, e))?;
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                Ok(line)
            },
        )))
    }
}
