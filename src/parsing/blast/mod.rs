//! Adapter for packed BLAST databases.
//!
//! A database is a set of sibling files sharing a base name:
//!
//! | Version | Alphabet | Table | Headers | Sequences | Source (optional) |
//! |---------|----------|-------|---------|-----------|-------------------|
//! | `blast1` | protein    | `.atb` | `.ahd` | `.bsq` | `.asq` |
//! | `blast1` | nucleotide | `.ntb` | `.nhd` | `.csq` | `.nsq` |
//! | `blast2` | protein    | `.pin` | `.phr` | `.psq` | - |
//! | `blast2` | nucleotide | `.nin` | `.nhr` | `.nsq` | - |
//!
//! Records are visited in database order. For each one the header bytes are
//! cut from the header file using the paged header offset table and handed to
//! the run's header extractor. The record offset of an entry is its 1-based
//! record number; the sequence offset is not used.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::config::{Alphabet, BlastVersion};
use crate::core::types::{Entry, SourceFile};
use crate::parsing::headers::HeaderExtractor;
use crate::parsing::{ParseError, RecordSource};
use crate::utils::validation::validate_key;

pub mod table;


use table::{BlastTable, OffsetPager};

#[derive(Error, Debug)]
pub enum BlastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing database file: {0}")]
    MissingFile(PathBuf),

    #[error("Not a {version:?} table file (first word {word:#010x})")]
    BadMagic { version: BlastVersion, word: u32 },

    #[error("Unknown sequence type {0} in table file")]
    UnknownSequenceType(u32),

    #[error("Database is {found:?} but {expected:?} was expected")]
    AlphabetMismatch { expected: Alphabet, found: Alphabet },

    #[error("Table file {path} is a {found:?} database but {expected:?} was requested")]
    VersionMismatch {
        path: PathBuf,
        expected: BlastVersion,
        found: BlastVersion,
    },

    #[error("Table file truncated: needs {needed} bytes, has {actual}")]
    TableTruncated { needed: u64, actual: u64 },

    #[error("Header of record {record} spans {start}..{end}, outside header file of {len} bytes")]
    HeaderOutOfBounds {
        record: u32,
        start: u32,
        end: u32,
        len: u64,
    },
}

/// File extensions of one database flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlastExtensions {
    pub version: BlastVersion,
    pub alphabet: Alphabet,
    pub table: &'static str,
    pub header: &'static str,
    pub sequence: &'static str,
    pub source: Option<&'static str>,
}

/// All known flavours, in the order they are probed
pub const FLAVOURS: [BlastExtensions; 4] = [
    BlastExtensions {
        version: BlastVersion::Blast2,
        alphabet: Alphabet::Protein,
        table: "pin",
        header: "phr",
        sequence: "psq",
        source: None,
    },
    BlastExtensions {
        version: BlastVersion::Blast2,
        alphabet: Alphabet::Nucleotide,
        table: "nin",
        header: "nhr",
        sequence: "nsq",
        source: None,
    },
    BlastExtensions {
        version: BlastVersion::Blast1,
        alphabet: Alphabet::Protein,
        table: "atb",
        header: "ahd",
        sequence: "bsq",
        source: Some("asq"),
    },
    BlastExtensions {
        version: BlastVersion::Blast1,
        alphabet: Alphabet::Nucleotide,
        table: "ntb",
        header: "nhd",
        sequence: "csq",
        source: Some("nsq"),
    },
];

/// Table file extensions allowed by the version and alphabet hints
pub fn table_extensions(version: Option<BlastVersion>, alphabet: Option<Alphabet>) -> Vec<&'static str> {
    FLAVOURS
        .iter()
        .filter(|f| version.map_or(true, |v| v == f.version))
        .filter(|f| alphabet.map_or(true, |a| a == f.alphabet))
        .map(|f| f.table)
        .collect()
}

/// Resolved sibling files of one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlastFiles {
    pub flavour: BlastExtensions,
    pub table: PathBuf,
    pub header: PathBuf,
    pub sequence: PathBuf,
    pub source: Option<PathBuf>,
}

impl BlastFiles {
    /// Resolve the sibling files for a table file or a base name.
    ///
    /// A path with a known table extension fixes version and alphabet, which
    /// must agree with any hints. Any other path is a base name and each
    /// flavour allowed by the hints is probed until a table file exists.
    ///
    /// # Errors
    ///
    /// Returns `BlastError::MissingFile` if no table file is found or the
    /// header or sequence file is missing, and mismatch errors if the table
    /// file contradicts a hint.
    pub fn resolve(
        path: &Path,
        version: Option<BlastVersion>,
        alphabet: Option<Alphabet>,
    ) -> Result<Self, BlastError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        let by_extension = extension
            .as_deref()
            .and_then(|ext| FLAVOURS.iter().find(|f| f.table == ext));

        let (flavour, base) = if let Some(flavour) = by_extension {
            if let Some(expected) = version.filter(|v| *v != flavour.version) {
                return Err(BlastError::VersionMismatch {
                    path: path.to_path_buf(),
                    expected,
                    found: flavour.version,
                });
            }
            if let Some(expected) = alphabet.filter(|a| *a != flavour.alphabet) {
                return Err(BlastError::AlphabetMismatch {
                    expected,
                    found: flavour.alphabet,
                });
            }
            (*flavour, path.with_extension(""))
        } else {
            let flavour = FLAVOURS
                .iter()
                .filter(|f| version.map_or(true, |v| v == f.version))
                .filter(|f| alphabet.map_or(true, |a| a == f.alphabet))
                .find(|f| sibling(path, f.table).is_file())
                .ok_or_else(|| BlastError::MissingFile(path.to_path_buf()))?;
            (*flavour, path.to_path_buf())
        };

        let table = sibling(&base, flavour.table);
        let header = sibling(&base, flavour.header);
        let sequence = sibling(&base, flavour.sequence);
        for required in [&table, &header, &sequence] {
            if !required.is_file() {
                return Err(BlastError::MissingFile(required.clone()));
            }
        }
        let source = flavour
            .source
            .map(|ext| sibling(&base, ext))
            .filter(|p| p.is_file());

        Ok(Self {
            flavour,
            table,
            header,
            sequence,
            source,
        })
    }
}

/// `base` with `ext` appended (base names may themselves contain dots)
fn sibling(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

pub struct BlastReader<'a> {
    table_file: BufReader<File>,
    header_file: BufReader<File>,
    header_len: u64,
    table: BlastTable,
    offsets: OffsetPager,
    next_record: u32,
    extractor: &'a mut dyn HeaderExtractor,
    file_number: u16,
    path: String,
    header: Vec<u8>,
}

impl<'a> BlastReader<'a> {
    /// Open the database whose table file (or base name) is `file`
    ///
    /// # Errors
    ///
    /// Returns a `ParseError::Blast` if a required sibling file is missing or
    /// the table file is not a valid database of the expected flavour.
    pub fn open(
        file: &SourceFile,
        version: Option<BlastVersion>,
        alphabet: Option<Alphabet>,
        extractor: &'a mut dyn HeaderExtractor,
    ) -> Result<Self, ParseError> {
        let files = BlastFiles::resolve(file.path(), version, alphabet)?;

        let mut table_file = BufReader::new(File::open(&files.table).map_err(BlastError::from)?);
        let table = BlastTable::read(&mut table_file, files.flavour.version)?;
        if table.alphabet != files.flavour.alphabet {
            return Err(BlastError::AlphabetMismatch {
                expected: files.flavour.alphabet,
                found: table.alphabet,
            }
            .into());
        }

        let header_file = File::open(&files.header).map_err(BlastError::from)?;
        let header_len = header_file.metadata().map_err(BlastError::from)?.len();

        debug!(
            "{}: {:?} {:?} database '{}', {} records",
            files.table.display(),
            table.version,
            table.alphabet,
            table.title,
            table.record_count
        );

        let offsets = table.header_offsets();
        Ok(Self {
            table_file,
            header_file: BufReader::new(header_file),
            header_len,
            table,
            offsets,
            next_record: 0,
            extractor,
            file_number: file.number,
            path: files.table.display().to_string(),
            header: Vec::new(),
        })
    }

    pub fn table(&self) -> &BlastTable {
        &self.table
    }

    /// Raw header text of record `index` (0-based)
    fn read_header(&mut self, index: u32) -> Result<String, BlastError> {
        let start = self.offsets.get(&mut self.table_file, index)?;
        let end = self.offsets.get(&mut self.table_file, index + 1)?;
        if end < start || u64::from(end) > self.header_len {
            return Err(BlastError::HeaderOutOfBounds {
                record: index + 1,
                start,
                end,
                len: self.header_len,
            });
        }

        self.header.resize((end - start) as usize, 0);
        self.header_file.seek(SeekFrom::Start(u64::from(start)))?;
        self.header_file.read_exact(&mut self.header)?;

        let text = String::from_utf8_lossy(&self.header);
        let line = text
            .split(|c: char| c == '\n' || c == '\0')
            .next()
            .unwrap_or_default();
        Ok(line.trim_start_matches('>').to_string())
    }
}

impl RecordSource for BlastReader<'_> {
    fn next_entry(&mut self) -> Result<Option<Entry>, ParseError> {
        if self.next_record >= self.table.record_count {
            return Ok(None);
        }
        let index = self.next_record;
        self.next_record += 1;

        let header = self.read_header(index)?;
        let parsed = self
            .extractor
            .extract(&header)
            .ok_or_else(|| ParseError::UnrecognisedHeader {
                path: self.path.clone(),
                line: (index + 1) as usize,
                convention: self.extractor.convention(),
                header: header.clone(),
            })?;

        validate_key(&parsed.id)?;
        for accession in &parsed.accessions {
            validate_key(accession)?;
        }

        Ok(Some(
            Entry::new(parsed.id, index + 1, self.file_number).with_accessions(parsed.accessions),
        ))
    }
}
