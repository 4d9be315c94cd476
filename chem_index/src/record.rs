//! Random access into a fingerprint's records file
//!
//! Each line of a records file is one compound, fields separated by single spaces. The layout is
//! fixed by the pipeline that produced the data and is not described in the file itself:
//!
//! `<id> <structure> <fingerprint> [<coordinates>]`

use crate::error::{Error, Result};
use crate::index::RecordIndex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub const ID_FIELD: usize = 0;
pub const STRUCTURE_FIELD: usize = 1;
pub const FINGERPRINT_FIELD: usize = 2;
pub const COORDINATES_FIELD: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn parse(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);

        let line = String::from_utf8_lossy(bytes);
        let fields = line.split(' ').map(str::to_string).collect();

        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, i: usize) -> Option<&str> {
        self.fields.get(i).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.field(ID_FIELD)
    }

    pub fn structure(&self) -> Option<&str> {
        self.field(STRUCTURE_FIELD)
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.field(FINGERPRINT_FIELD)
    }

    pub fn coordinates(&self) -> Option<&str> {
        self.field(COORDINATES_FIELD)
    }

    /// Fails unless the record has at least `expected` fields.
    pub fn require(self, ordinal: usize, expected: usize) -> Result<Self> {
        match self.fields.len() >= expected {
            true => Ok(self),
            false => Err(Error::MalformedRecord {
                ordinal,
                found: self.fields.len(),
                expected,
            }),
        }
    }
}

/// An open records file together with its index. Lives for one request.
#[derive(Debug)]
pub struct RecordReader<'a> {
    path: &'a Path,
    file: File,
    index: &'a RecordIndex,
}

impl<'a> RecordReader<'a> {
    pub fn open(path: &'a Path, index: &'a RecordIndex) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        Ok(Self { path, file, index })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn fetch(&mut self, ordinal: usize) -> Result<Record> {
        let (offset, length) = self.index.get(ordinal).ok_or(Error::OrdinalOutOfRange {
            ordinal,
            len: self.index.len(),
        })?;

        let mut buf = vec![0u8; length as usize];

        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(self.path, e))?;
        self.file
            .read_exact(&mut buf)
            .map_err(|e| Error::io(self.path, e))?;

        Ok(Record::parse(&buf))
    }
}
