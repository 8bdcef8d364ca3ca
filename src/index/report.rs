//! Summary of an indexing run.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::config::SortMode;
use crate::core::types::{Maxima, SourceFormat};

/// Counts and sizes of one completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub db_name: String,
    pub release: String,
    pub format: SourceFormat,
    pub sort_mode: SortMode,
    pub index_dir: PathBuf,
    pub files: Vec<String>,
    pub entries: usize,
    pub duplicates_dropped: usize,
    pub accession_refs: usize,
    pub distinct_accessions: u32,
    pub maxima: Maxima,
    pub elapsed_ms: u128,
}

impl BuildReport {
    /// Human-readable summary
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            format!("Index: {} (release '{}')", self.db_name, self.release),
            format!("   Directory: {}", self.index_dir.display()),
            format!("   Format: {}, {:?} sort", self.format, self.sort_mode),
            format!("   Files: {}", self.files.len()),
        ];
        lines.extend(
            self.files
                .iter()
                .enumerate()
                .map(|(i, name)| format!("     {:>3}  {name}", i + 1)),
        );
        lines.push(format!("   Identifiers: {}", self.entries));
        if self.duplicates_dropped > 0 {
            lines.push(format!("   Duplicates dropped: {}", self.duplicates_dropped));
        }
        lines.push(format!(
            "   Accessions: {} distinct, {} references",
            self.distinct_accessions, self.accession_refs
        ));
        lines.push(format!(
            "   Longest: identifier {}, accession {}, file name {}",
            self.maxima.id_len, self.maxima.accession_len, self.maxima.file_name_len
        ));
        lines.push(format!("   Elapsed: {} ms", self.elapsed_ms));
        lines.join("\n")
    }

    /// JSON summary
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
