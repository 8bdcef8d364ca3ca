use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of source a database is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// EMBL-style records (`ID` / `AC` / `//`)
    Embl,
    /// UniProtKB/Swiss-Prot records, same line codes as EMBL
    Swissprot,
    /// GenBank records (`LOCUS` / `ACCESSION` / `//`)
    Genbank,
    /// FASTA records, headers handled by a [`HeaderConvention`](crate::core::config::HeaderConvention)
    Fasta,
    /// Packed BLAST database (table/header/sequence sibling files)
    Blast,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embl => write!(f, "EMBL"),
            Self::Swissprot => write!(f, "SwissProt"),
            Self::Genbank => write!(f, "GenBank"),
            Self::Fasta => write!(f, "FASTA"),
            Self::Blast => write!(f, "BLAST"),
        }
    }
}

/// A source file with its dense, 1-based file number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub number: u16,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, format: SourceFormat, number: u16) -> Self {
        Self {
            path: path.into(),
            format,
            number,
        }
    }

    /// Name recorded in the division table
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One record as reported by a format adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Primary identifier, case preserved
    pub id: String,

    /// Position usable to re-seek to the record
    pub record_offset: u32,

    /// Secondary position; format dependent, may be 0
    pub sequence_offset: u32,

    /// Owning file number
    pub file_number: u16,

    /// Accession strings in the order they were declared
    pub accessions: Vec<String>,
}

impl Entry {
    pub fn new(id: impl Into<String>, record_offset: u32, file_number: u16) -> Self {
        Self {
            id: id.into(),
            record_offset,
            sequence_offset: 0,
            file_number,
            accessions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_sequence_offset(mut self, offset: u32) -> Self {
        self.sequence_offset = offset;
        self
    }

    #[must_use]
    pub fn with_accessions<I, S>(mut self, accessions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accessions = accessions.into_iter().map(Into::into).collect();
        self
    }

    /// Identifier part of the entry, without its accessions
    pub fn to_indexed(&self) -> IndexedEntry {
        IndexedEntry {
            id: self.id.clone(),
            record_offset: self.record_offset,
            sequence_offset: self.sequence_offset,
            file_number: self.file_number,
        }
    }

    /// One [`AccessionRef`] per declared accession
    pub fn accession_refs(&self) -> impl Iterator<Item = AccessionRef> + '_ {
        self.accessions.iter().map(|acc| AccessionRef {
            accession: acc.clone(),
            id: self.id.clone(),
        })
    }
}

/// Identifier record as stored in the entry name index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub id: String,
    pub record_offset: u32,
    pub sequence_offset: u32,
    pub file_number: u16,
}

/// Accession with its owning identifier still in textual form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccessionRef {
    pub accession: String,
    pub id: String,
}

/// Accession with its owning identifier resolved to a 1-based rank
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedAccession {
    pub accession: String,
    pub rank: u32,
}

/// Longest identifier, accession and file name seen during a run.
///
/// Record widths in the output files are only final once every record has
/// been produced, so these are tracked incrementally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maxima {
    pub id_len: usize,
    pub accession_len: usize,
    pub file_name_len: usize,
}

impl Maxima {
    /// Start from configured floors
    pub fn with_floors(id_len: usize, accession_len: usize) -> Self {
        Self {
            id_len,
            accession_len,
            file_name_len: 0,
        }
    }

    pub fn observe_entry(&mut self, entry: &Entry) {
        self.id_len = self.id_len.max(entry.id.len());
        for acc in &entry.accessions {
            self.accession_len = self.accession_len.max(acc.len());
        }
    }

    pub fn observe_file(&mut self, file: &SourceFile) {
        self.file_name_len = self.file_name_len.max(file.file_name().len());
    }
}
