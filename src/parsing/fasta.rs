//! Adapter for FASTA files.
//!
//! A record starts at a `>` header line and runs until the next header line
//! or end of file. The header text is handed to the run's header extractor.
//! The record offset points at the header line, the sequence offset at the
//! first line after it.
//!
//! Supported extensions: `.fa`, `.fasta`, `.fna`, `.faa` (uncompressed only,
//! since offsets must be seekable).

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::types::{Entry, SourceFile};
use crate::parsing::headers::HeaderExtractor;
use crate::parsing::{offset_u32, LineReader, ParseError, RecordSource};
use crate::utils::validation::validate_key;

/// Check if the path has a FASTA extension
pub fn is_fasta_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .as_deref(),
        Some("fa" | "fasta" | "fna" | "faa")
    )
}

pub struct FastaReader<'a, R> {
    lines: LineReader<R>,
    extractor: &'a mut dyn HeaderExtractor,
    file_number: u16,
    path: String,
    /// Header line already read while scanning the previous record
    pending: Option<(u64, usize, String)>,
}

impl<'a> FastaReader<'a, BufReader<File>> {
    /// Open a FASTA file for reading
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be opened.
    pub fn open(
        file: &SourceFile,
        extractor: &'a mut dyn HeaderExtractor,
    ) -> Result<Self, ParseError> {
        let reader = BufReader::new(File::open(file.path())?);
        Ok(Self::new(reader, file, extractor))
    }
}

impl<'a, R: BufRead> FastaReader<'a, R> {
    pub fn new(reader: R, file: &SourceFile, extractor: &'a mut dyn HeaderExtractor) -> Self {
        Self {
            lines: LineReader::new(reader),
            extractor,
            file_number: file.number,
            path: file.path().display().to_string(),
            pending: None,
        }
    }

    fn next_header(&mut self) -> Result<Option<(u64, usize, String)>, ParseError> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        while let Some((offset, line)) = self.lines.next_line()? {
            if line.starts_with('>') {
                return Ok(Some((offset, self.lines.line_number(), line)));
            }
        }
        Ok(None)
    }
}

impl<R: BufRead> RecordSource for FastaReader<'_, R> {
    fn next_entry(&mut self) -> Result<Option<Entry>, ParseError> {
        let Some((record_offset, line_number, header)) = self.next_header()? else {
            return Ok(None);
        };
        let sequence_offset = self.lines.offset();

        while let Some((offset, line)) = self.lines.next_line()? {
            if line.starts_with('>') {
                self.pending = Some((offset, self.lines.line_number(), line));
                break;
            }
        }

        let parsed = self
            .extractor
            .extract(&header)
            .ok_or_else(|| ParseError::UnrecognisedHeader {
                path: self.path.clone(),
                line: line_number,
                convention: self.extractor.convention(),
                header: header.clone(),
            })?;

        validate_key(&parsed.id)?;
        for accession in &parsed.accessions {
            validate_key(accession)?;
        }

        Ok(Some(
            Entry::new(parsed.id, offset_u32(record_offset)?, self.file_number)
                .with_sequence_offset(offset_u32(sequence_offset)?)
                .with_accessions(parsed.accessions),
        ))
    }
}
