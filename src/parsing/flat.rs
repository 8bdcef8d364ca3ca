//! Adapter for EMBL, Swiss-Prot and GenBank flat files.
//!
//! A record starts at its identifier line (`ID` or `LOCUS`) and ends at the
//! `//` terminator. Accession lines (`AC`, or `ACCESSION` plus indented
//! continuation lines) are concatenated and split into accessions once the
//! record is complete. The record offset is the byte offset of the identifier
//! line; flat files do not track a separate sequence offset.

use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::core::types::{Entry, SourceFile};
use crate::parsing::headers::{FlatRecordConvention, END_OF_RECORD};
use crate::parsing::{offset_u32, LineReader, ParseError, RecordSource};
use crate::utils::validation::validate_key;

pub struct FlatFileReader<R> {
    lines: LineReader<R>,
    convention: FlatRecordConvention,
    file_number: u16,
    path: String,
}

impl FlatFileReader<BufReader<File>> {
    /// Open a flat file for reading
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be opened or
    /// `ParseError::WrongFormat` if the file is not a flat-file format.
    pub fn open(file: &SourceFile) -> Result<Self, ParseError> {
        let reader = BufReader::new(File::open(file.path())?);
        Self::new(reader, file)
    }
}

impl<R: BufRead> FlatFileReader<R> {
    /// Read records from any buffered reader
    ///
    /// # Errors
    ///
    /// Returns `ParseError::WrongFormat` if the file is not a flat-file format.
    pub fn new(reader: R, file: &SourceFile) -> Result<Self, ParseError> {
        let convention =
            FlatRecordConvention::for_format(file.format).ok_or(ParseError::WrongFormat(file.format))?;
        Ok(Self {
            lines: LineReader::new(reader),
            convention,
            file_number: file.number,
            path: file.path().display().to_string(),
        })
    }
}

impl<R: BufRead> RecordSource for FlatFileReader<R> {
    fn next_entry(&mut self) -> Result<Option<Entry>, ParseError> {
        let (record_offset, id_line) = loop {
            match self.lines.next_line()? {
                None => return Ok(None),
                Some((offset, line)) if self.convention.is_start(&line) => break (offset, line),
                Some(_) => {}
            }
        };

        let id = self
            .convention
            .identifier(&id_line)
            .ok_or_else(|| ParseError::MissingIdentifier {
                path: self.path.clone(),
                line: self.lines.line_number(),
            })?;
        validate_key(&id)?;

        let mut accession_text = String::new();
        let mut in_accession = false;
        loop {
            let Some((_, line)) = self.lines.next_line()? else {
                return Err(ParseError::TruncatedRecord {
                    path: self.path.clone(),
                    id,
                });
            };

            if line.starts_with(END_OF_RECORD) {
                break;
            }

            if let Some(value) = self.convention.accession_field(&line) {
                accession_text.push(' ');
                accession_text.push_str(value);
                in_accession = true;
            } else if in_accession && self.convention.is_continuation(&line) {
                accession_text.push(' ');
                accession_text.push_str(line.trim());
            } else {
                in_accession = false;
            }
        }

        let accessions = FlatRecordConvention::accessions(&accession_text);
        for accession in &accessions {
            validate_key(accession)?;
        }

        Ok(Some(
            Entry::new(id, offset_u32(record_offset)?, self.file_number).with_accessions(accessions),
        ))
    }
}
