//! Run configuration for an indexing job.
//!
//! An [`IndexConfig`] is normally assembled by the CLI, but it can also be
//! loaded from a JSON file so other front ends can drive the library.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::SourceFormat;
use crate::utils::validation::{validate_db_name, validate_release, ValidationError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid release date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// How collected records are sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Keep every record in memory and sort there
    #[default]
    Memory,
    /// Spill per-file intermediate files and sort-merge them on disk
    External,
}

/// Who sorts intermediate files in external mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortProviderKind {
    /// In-process stable sort with spill-to-disk
    #[default]
    Builtin,
    /// The system `sort` utility
    System,
}

/// Header line convention for FASTA and BLAST sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum HeaderConvention {
    /// NCBI-style `db|acc|name` deflines
    #[default]
    Ncbi,
    /// `ID ACC description`, accession upper-cased
    Gcg,
    /// Identifier only
    Simple,
}

/// Record layout of flat-file sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FlatFormat {
    #[default]
    Embl,
    Swissprot,
    Genbank,
}

impl From<FlatFormat> for SourceFormat {
    fn from(format: FlatFormat) -> Self {
        match format {
            FlatFormat::Embl => Self::Embl,
            FlatFormat::Swissprot => Self::Swissprot,
            FlatFormat::Genbank => Self::Genbank,
        }
    }
}

/// Packed database layout version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BlastVersion {
    Blast1,
    Blast2,
}

/// Sequence alphabet of a packed database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Alphabet {
    Protein,
    Nucleotide,
}

/// Byte order used for every integer in the output index files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IndexByteOrder {
    #[default]
    Little,
    Big,
}

/// Release date stored in the index headers.
///
/// Only built through [`ReleaseDate::parse`] or [`ReleaseDate::today`], so the
/// year always lies in 1900..=2155.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseDate {
    year: u16,
    month: u8,
    day: u8,
}

impl ReleaseDate {
    /// Parse a `YYYY-MM-DD` date
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDate` if the text is not a valid date
    /// between 1900 and 2155 (the year is stored as an offset from 1900 in one byte).
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidDate(text.to_string()))?;
        Self::from_naive(date).ok_or_else(|| ConfigError::InvalidDate(text.to_string()))
    }

    pub fn today() -> Self {
        let today = chrono::Local::now().date_naive();
        Self::from_naive(today).unwrap_or(Self {
            year: 1900,
            month: 1,
            day: 1,
        })
    }

    #[allow(clippy::cast_possible_truncation)] // month <= 12, day <= 31
    fn from_naive(date: NaiveDate) -> Option<Self> {
        let year = u16::try_from(date.year()).ok()?;
        if !(1900..=2155).contains(&year) {
            return None;
        }
        Some(Self {
            year,
            month: date.month() as u8,
            day: date.day() as u8,
        })
    }

    /// Four-byte header encoding: `[0, year - 1900, month, day]`
    #[allow(clippy::cast_possible_truncation)] // year checked on construction
    pub fn to_bytes(self) -> [u8; 4] {
        [0, (self.year - 1900) as u8, self.month, self.day]
    }

    pub fn year(self) -> u16 {
        self.year
    }

    pub fn month(self) -> u8 {
        self.month
    }

    pub fn day(self) -> u8 {
        self.day
    }
}

fn default_wildcard() -> String {
    "*".to_string()
}

fn default_sort_chunk_lines() -> usize {
    100_000
}

/// Everything an indexing run needs to know
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the source files
    pub directory: PathBuf,

    /// Inclusion wildcard for source file names
    #[serde(default = "default_wildcard")]
    pub wildcard: String,

    /// Exclusion wildcard for source file names
    #[serde(default)]
    pub exclude: Option<String>,

    /// Directory the index files are written to
    pub index_dir: PathBuf,

    /// Source format
    pub format: SourceFormat,

    /// Database name for the index headers
    pub db_name: String,

    /// Release tag for the index headers
    #[serde(default)]
    pub release: String,

    /// Release date (`YYYY-MM-DD`), today when absent
    #[serde(default)]
    pub date: Option<String>,

    /// Header convention for FASTA and BLAST sources
    #[serde(default)]
    pub convention: HeaderConvention,

    #[serde(default)]
    pub sort_mode: SortMode,

    #[serde(default)]
    pub sort_provider: SortProviderKind,

    /// Extra options passed to the system sort
    #[serde(default)]
    pub sort_options: String,

    /// Lines held in memory per chunk by the builtin external sort
    #[serde(default = "default_sort_chunk_lines")]
    pub sort_chunk_lines: usize,

    /// Keep intermediate files from external mode
    #[serde(default)]
    pub keep_temp: bool,

    /// Directory for intermediate files, `index_dir` when absent
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    #[serde(default)]
    pub byte_order: IndexByteOrder,

    /// Floor for the identifier field width
    #[serde(default)]
    pub min_id_len: usize,

    /// Floor for the accession field width
    #[serde(default)]
    pub min_acc_len: usize,

    /// Packed database version hint
    #[serde(default)]
    pub blast_version: Option<BlastVersion>,

    /// Packed database alphabet hint
    #[serde(default)]
    pub alphabet: Option<Alphabet>,
}

impl IndexConfig {
    /// Configuration with defaults for everything but the essentials
    pub fn new(
        directory: impl Into<PathBuf>,
        index_dir: impl Into<PathBuf>,
        format: SourceFormat,
        db_name: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            wildcard: default_wildcard(),
            exclude: None,
            index_dir: index_dir.into(),
            format,
            db_name: db_name.into(),
            release: String::new(),
            date: None,
            convention: HeaderConvention::default(),
            sort_mode: SortMode::default(),
            sort_provider: SortProviderKind::default(),
            sort_options: String::new(),
            sort_chunk_lines: default_sort_chunk_lines(),
            keep_temp: false,
            temp_dir: None,
            byte_order: IndexByteOrder::default(),
            min_id_len: 0,
            min_acc_len: 0,
            blast_version: None,
            alphabet: None,
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read or
    /// `ConfigError::Json` if it is not a valid configuration.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check the configuration before a run
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_db_name(&self.db_name)?;
        validate_release(&self.release)?;
        self.release_date()?;

        if self.wildcard.trim().is_empty() {
            return Err(ConfigError::Invalid("wildcard must not be empty".to_string()));
        }
        if self.sort_chunk_lines == 0 {
            return Err(ConfigError::Invalid(
                "sort_chunk_lines must be greater than zero".to_string(),
            ));
        }
        if self.format != SourceFormat::Blast
            && (self.blast_version.is_some() || self.alphabet.is_some())
        {
            return Err(ConfigError::Invalid(format!(
                "blast version and alphabet hints do not apply to {} sources",
                self.format
            )));
        }
        Ok(())
    }

    /// Configured release date, or today
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDate` if the configured date does not parse.
    pub fn release_date(&self) -> Result<ReleaseDate, ConfigError> {
        match &self.date {
            Some(text) => ReleaseDate::parse(text),
            None => Ok(ReleaseDate::today()),
        }
    }

    /// Where intermediate files go
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.as_deref().unwrap_or(&self.index_dir)
    }
}
