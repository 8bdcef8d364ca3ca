//! Collection and sorting of index records.
//!
//! A [`Collector`] receives every [`Entry`] a format adapter produces and,
//! once all source files are consumed, hands back two globally sorted
//! streams:
//!
//! - the identifier stream, sorted by identifier with duplicates dropped,
//!   where each record's 1-based position is its rank
//! - the accession stream, sorted by accession, with each owning identifier
//!   resolved to its rank
//!
//! Two implementations exist and produce identical streams for the same
//! input:
//!
//! - [`memory::MemoryCollector`] keeps everything in memory
//! - [`external::ExternalCollector`] spills per-file intermediate files and
//!   sort-merges them on disk through a [`sorter::SortProvider`]

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::core::types::{Entry, IndexedEntry, ResolvedAccession, SourceFile};

pub mod external;
pub mod memory;
pub mod sorter;
pub mod xref;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot create intermediate file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed intermediate record '{text}'")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("Accession '{accession}' refers to unknown identifier '{id}'")]
    DanglingAccession { accession: String, id: String },

    #[error("Failed to run sort program '{program}': {source}")]
    SortSpawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Entry added before any source file was started")]
    NoActiveFile,
}

/// Sorted identifier records, in rank order
pub type EntryStream = Box<dyn Iterator<Item = Result<IndexedEntry, CollectError>>>;

/// Resolved accession records, in accession order
pub type AccessionStream = Box<dyn Iterator<Item = Result<ResolvedAccession, CollectError>>>;

/// Counts known once collection has finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Identifiers left after duplicates were dropped
    pub entries: usize,
    pub duplicates_dropped: usize,
    pub accession_refs: usize,
}

/// Output of a finished collector
pub struct CollectedIndex {
    pub entries: EntryStream,
    pub accessions: AccessionStream,
    pub stats: CollectStats,
}

/// Accumulates entries file by file
pub trait Collector {
    /// Start receiving entries of `file`
    ///
    /// # Errors
    ///
    /// Returns a `CollectError` if per-file state cannot be set up.
    fn begin_file(&mut self, file: &SourceFile) -> Result<(), CollectError>;

    /// # Errors
    ///
    /// Returns a `CollectError` if the entry cannot be stored.
    fn add_entry(&mut self, entry: Entry) -> Result<(), CollectError>;

    /// All entries of the current file have been added
    ///
    /// # Errors
    ///
    /// Returns a `CollectError` if per-file state cannot be finalised.
    fn end_file(&mut self) -> Result<(), CollectError>;

    /// Sort, deduplicate and cross-reference everything collected
    ///
    /// # Errors
    ///
    /// Returns a `CollectError` if sorting or cross-referencing fails.
    fn finish(self: Box<Self>) -> Result<CollectedIndex, CollectError>;
}

/// Drops every identifier equal to the one before it.
///
/// Input must be sorted by identifier; the first record of each run of
/// equal identifiers is kept, so ranks stay dense.
pub struct UniqueEntries<I> {
    inner: I,
    last: Option<String>,
    kept: usize,
    dropped: usize,
    warn: bool,
}

impl<I> UniqueEntries<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            last: None,
            kept: 0,
            dropped: 0,
            warn: true,
        }
    }

    /// Same filtering without a warning per dropped record, for replaying a
    /// stream whose duplicates were already reported
    pub fn quiet(inner: I) -> Self {
        Self {
            warn: false,
            ..Self::new(inner)
        }
    }

    /// Records handed out so far
    pub fn kept(&self) -> usize {
        self.kept
    }

    /// Duplicates skipped so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<I> Iterator for UniqueEntries<I>
where
    I: Iterator<Item = Result<IndexedEntry, CollectError>>,
{
    type Item = Result<IndexedEntry, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            if self.last.as_deref() == Some(entry.id.as_str()) {
                if self.warn {
                    warn!(
                        "Duplicate identifier {} (file {}, offset {}) dropped",
                        entry.id, entry.file_number, entry.record_offset
                    );
                }
                self.dropped += 1;
                continue;
            }
            self.last = Some(entry.id.clone());
            self.kept += 1;
            return Some(Ok(entry));
        }
    }
}

/// First space-separated field of an intermediate line
pub(crate) fn sort_key(line: &str) -> &str {
    line.split_once(' ').map_or(line, |(key, _)| key)
}
