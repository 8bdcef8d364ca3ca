//! Format adapters that read index entries from source databases.
//!
//! This module provides adapters for:
//!
//! - **EMBL / Swiss-Prot / GenBank flat files**: records delimited by an
//!   identifier line and a `//` terminator
//! - **FASTA files**: records delimited by `>` header lines
//! - **Packed BLAST databases**: header offset tables over a header blob
//!
//! Every adapter implements [`RecordSource`], which hands out one
//! [`Entry`] per record until the source is exhausted.
//!
//! ## Example
//!
//! ```rust,no_run
//! use seq_dbi::core::types::{SourceFile, SourceFormat};
//! use seq_dbi::parsing::{RecordSource, flat::FlatFileReader};
//!
//! let file = SourceFile::new("/data/embl/rodent.dat", SourceFormat::Embl, 1);
//! let mut reader = FlatFileReader::open(&file).unwrap();
//! while let Some(entry) = reader.next_entry().unwrap() {
//!     println!("{} @ {}", entry.id, entry.record_offset);
//! }
//! ```

use std::io::BufRead;

use thiserror::Error;

use crate::core::config::IndexConfig;
use crate::core::types::{Entry, SourceFile, SourceFormat};
use crate::utils::validation::ValidationError;

pub mod blast;
pub mod fasta;
pub mod flat;
pub mod headers;

use blast::{BlastError, BlastReader};
use fasta::FastaReader;
use flat::FlatFileReader;
use headers::HeaderExtractor;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: record starting at line {line} has no identifier")]
    MissingIdentifier { path: String, line: usize },

    #[error("{path}: record '{id}' is not terminated before end of file")]
    TruncatedRecord { path: String, id: String },

    #[error("{path}: header at line {line} does not follow the {convention:?} convention: {header}")]
    UnrecognisedHeader {
        path: String,
        line: usize,
        convention: crate::core::config::HeaderConvention,
        header: String,
    },

    #[error("Offset {0} does not fit in a 32-bit index field")]
    OffsetOverflow(u64),

    #[error("Invalid key: {0}")]
    InvalidKey(#[from] ValidationError),

    #[error(transparent)]
    Blast(#[from] BlastError),

    #[error("Format {0} is not handled by this adapter")]
    WrongFormat(SourceFormat),
}

/// Contract shared by all format adapters
pub trait RecordSource {
    /// Next entry of the source, `None` at end of file
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the source is unreadable or malformed.
    fn next_entry(&mut self) -> Result<Option<Entry>, ParseError>;
}

/// Open the adapter for a source file.
///
/// The header extractor is borrowed for the lifetime of the adapter so that
/// state such as the synthetic accession counter carries across files.
///
/// # Errors
///
/// Returns a `ParseError` if the file (or one of its sibling files) cannot
/// be opened.
pub fn open_source<'a>(
    file: &SourceFile,
    config: &IndexConfig,
    extractor: &'a mut dyn HeaderExtractor,
) -> Result<Box<dyn RecordSource + 'a>, ParseError> {
    match file.format {
        SourceFormat::Embl | SourceFormat::Swissprot | SourceFormat::Genbank => {
            Ok(Box::new(FlatFileReader::open(file)?))
        }
        SourceFormat::Fasta => Ok(Box::new(FastaReader::open(file, extractor)?)),
        SourceFormat::Blast => Ok(Box::new(BlastReader::open(
            file,
            config.blast_version,
            config.alphabet,
            extractor,
        )?)),
    }
}

/// Convert a byte offset to the 32-bit index field
pub(crate) fn offset_u32(offset: u64) -> Result<u32, ParseError> {
    u32::try_from(offset).map_err(|_| ParseError::OffsetOverflow(offset))
}

/// Line reader that tracks the byte offset of every line
pub(crate) struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    offset: u64,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            offset: 0,
            line_number: 0,
        }
    }

    /// Next line without its terminator, with the offset it starts at
    pub(crate) fn next_line(&mut self) -> std::io::Result<Option<(u64, String)>> {
        self.buf.clear();
        let start = self.offset;
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;
        self.line_number += 1;

        let mut end = self.buf.len();
        while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Ok(Some((start, String::from_utf8_lossy(&self.buf[..end]).into_owned())))
    }

    /// Offset of the next unread byte
    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    /// 1-based number of the last line read
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_reader_offsets() {
        let mut reader = LineReader::new(Cursor::new(b"ab\r\ncde\n\nlast".to_vec()));

        assert_eq!(reader.next_line().unwrap(), Some((0, "ab".to_string())));
        assert_eq!(reader.next_line().unwrap(), Some((4, "cde".to_string())));
        assert_eq!(reader.next_line().unwrap(), Some((8, String::new())));
        assert_eq!(reader.next_line().unwrap(), Some((9, "last".to_string())));
        assert_eq!(reader.line_number(), 4);
        assert_eq!(reader.offset(), 13);
        assert_eq!(reader.next_line().unwrap(), None);
    }

    #[test]
    fn test_offset_overflow() {
        assert_eq!(offset_u32(42).unwrap(), 42);
        assert!(matches!(
            offset_u32(u64::from(u32::MAX) + 1),
            Err(ParseError::OffsetOverflow(_))
        ));
    }
}
