//! Record index files
//!
//! A record index holds one `offset,length` line per line of the records file it describes, so that
//! compound `i` can be read with a single positioned read. Index files are read twice at startup:
//! a raw byte scan to size the tables and a line parse to fill them.

use crate::error::{Error, Result};
use log::debug;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

pub const SCAN_BUFFER_SIZE: usize = 32 * 1024;

/// Counts `\n` separators, plus one for a final line without a terminator.
pub fn count_lines(path: &Path) -> Result<usize> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut buf = vec![0u8; SCAN_BUFFER_SIZE];

    let mut count = 0;
    let mut last_byte: Option<u8> = None;

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io(path, e)),
        };

        count += buf[..n].iter().filter(|&&b| b == b'\n').count();
        last_byte = Some(buf[n - 1]);
    }

    if matches!(last_byte, Some(b) if b != b'\n') {
        count += 1;
    }

    Ok(count)
}

/// Offsets and lengths of every line of a fingerprint's records file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordIndex {
    offsets: Vec<u64>,
    lengths: Vec<u32>,
}

impl RecordIndex {
    pub fn from_file(path: &Path) -> Result<Self> {
        let num_lines = count_lines(path)?;

        let mut offsets: Vec<u64> = Vec::with_capacity(num_lines);
        let mut lengths: Vec<u32> = Vec::with_capacity(num_lines);

        let file = File::open(path).map_err(|e| Error::io(path, e))?;

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io(path, e))?;

            let (offset, length) = parse_span(&line).ok_or_else(|| Error::MalformedLine {
                path: path.to_path_buf(),
                line: i + 1,
                content: line.clone(),
            })?;

            offsets.push(offset);
            lengths.push(length);
        }

        debug!("Read {} record offsets from {}", offsets.len(), path.display());

        Ok(Self { offsets, lengths })
    }

    pub fn from_spans(spans: Vec<(u64, u32)>) -> Self {
        let (offsets, lengths) = spans.into_iter().unzip();
        Self { offsets, lengths }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<(u64, u32)> {
        Some((*self.offsets.get(ordinal)?, *self.lengths.get(ordinal)?))
    }

    /// Furthest byte any entry points to.
    pub fn end(&self) -> u64 {
        self.offsets
            .iter()
            .zip(self.lengths.iter())
            .map(|(offset, length)| offset.saturating_add(*length as u64))
            .max()
            .unwrap_or(0)
    }

    /// Rejects an index with entries past the end of `records`.
    pub fn check_bounds(&self, index_path: &Path, records: &Path) -> Result<()> {
        let size = std::fs::metadata(records)
            .map_err(|e| Error::io(records, e))?
            .len();
        let end = self.end();

        if end > size {
            return Err(Error::IndexOutOfBounds {
                index: index_path.to_path_buf(),
                records: records.to_path_buf(),
                end,
                size,
            });
        }

        Ok(())
    }
}

// a span must end at a representable byte position
fn parse_span(line: &str) -> Option<(u64, u32)> {
    let (offset, length) = line.trim().split_once(',')?;
    let offset: u64 = offset.trim().parse().ok()?;
    let length: u32 = length.trim().parse().ok()?;

    offset.checked_add(length as u64)?;

    Some((offset, length))
}

/// Yields `(offset, length)` for every line of a records stream, delimiter included in the length.
pub struct RecordSpans<R> {
    reader: R,
    offset: u64,
    buf: Vec<u8>,
}

impl<R: BufRead> RecordSpans<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for RecordSpans<R> {
    type Item = io::Result<(u64, u32)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();

        let n = match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => return None,
            Ok(n) => n,
            Err(e) => return Some(Err(e)),
        };

        let length = match u32::try_from(n) {
            Ok(length) => length,
            Err(_) => {
                return Some(Err(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("record at offset {} is longer than u32::MAX", self.offset),
                )))
            }
        };

        let span = (self.offset, length);
        self.offset += n as u64;

        Some(Ok(span))
    }
}

pub fn write_span<W: Write>(out: &mut W, span: (u64, u32)) -> io::Result<()> {
    writeln!(out, "{},{}", span.0, span.1)
}

/// Writes the record index for `records` to `index`, returning the number of records.
pub fn build_record_index(records: &Path, index: &Path) -> Result<usize> {
    build_record_index_with(records, index, |spans| spans)
}

/// Like [`build_record_index`], with `wrap` applied to the span iterator, e.g. to report progress.
pub fn build_record_index_with<F, I>(records: &Path, index: &Path, wrap: F) -> Result<usize>
where
    F: FnOnce(RecordSpans<BufReader<File>>) -> I,
    I: Iterator<Item = io::Result<(u64, u32)>>,
{
    let input = File::open(records).map_err(|e| Error::io(records, e))?;
    let output = File::create(index).map_err(|e| Error::io(index, e))?;
    let mut output = BufWriter::new(output);

    let mut count = 0;
    for span in wrap(RecordSpans::new(BufReader::new(input))) {
        let span = span.map_err(|e| Error::io(records, e))?;
        write_span(&mut output, span).map_err(|e| Error::io(index, e))?;
        count += 1;
    }

    output.flush().map_err(|e| Error::io(index, e))?;

    Ok(count)
}
