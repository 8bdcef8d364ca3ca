//! Source file enumeration.
//!
//! Lists the files of a database directory that match an inclusion wildcard
//! and do not match an exclusion wildcard, sorted by name. Each file gets a
//! dense 1-based file number that every index record refers back to.
//!
//! ## Example
//!
//! ```rust,no_run
//! use seq_dbi::core::types::SourceFormat;
//! use seq_dbi::source::SourceEnumerator;
//!
//! let files = SourceEnumerator::new("/data/embl", "*.dat")
//!     .unwrap()
//!     .exclude("*_old.dat")
//!     .unwrap()
//!     .list(SourceFormat::Embl)
//!     .unwrap();
//! for file in &files {
//!     println!("{} {}", file.number, file.file_name());
//! }
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::{SourceFile, SourceFormat};
use crate::utils::validation::{check_file_limit, ValidationError};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Cannot open directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No files in {dir} match '{pattern}'")]
    NoMatches { dir: PathBuf, pattern: String },

    #[error("Invalid wildcard '{0}'")]
    InvalidWildcard(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One or more shell-style wildcards (`*`, `?`) matched against file names.
///
/// Several patterns may be given separated by commas or whitespace; a name
/// matches if any of them does.
#[derive(Debug, Clone)]
pub struct Wildcard {
    text: String,
    regex: Regex,
}

impl Wildcard {
    /// Compile a wildcard list
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidWildcard` if no pattern is given.
    pub fn new(text: &str) -> Result<Self, SourceError> {
        let alternatives: Vec<String> = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .map(translate)
            .collect();

        if alternatives.is_empty() {
            return Err(SourceError::InvalidWildcard(text.to_string()));
        }

        let regex = Regex::new(&format!("^(?:{})$", alternatives.join("|")))
            .map_err(|_| SourceError::InvalidWildcard(text.to_string()))?;

        Ok(Self {
            text: text.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    out
}

/// Lists candidate source files in a directory
#[derive(Debug, Clone)]
pub struct SourceEnumerator {
    directory: PathBuf,
    include: Wildcard,
    exclude: Option<Wildcard>,
    extensions: Vec<String>,
}

impl SourceEnumerator {
    /// # Errors
    ///
    /// Returns `SourceError::InvalidWildcard` if the wildcard is empty.
    pub fn new(directory: impl Into<PathBuf>, include: &str) -> Result<Self, SourceError> {
        Ok(Self {
            directory: directory.into(),
            include: Wildcard::new(include)?,
            exclude: None,
            extensions: Vec::new(),
        })
    }

    /// Skip file names matching `pattern`
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidWildcard` if the wildcard is empty.
    pub fn exclude(mut self, pattern: &str) -> Result<Self, SourceError> {
        self.exclude = Some(Wildcard::new(pattern)?);
        Ok(self)
    }

    /// Only keep files with one of these extensions (case-insensitive)
    #[must_use]
    pub fn require_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_lowercase()).collect();
        self
    }

    fn accepts(&self, name: &str) -> bool {
        if !self.include.matches(name) {
            return false;
        }
        if self.exclude.as_ref().is_some_and(|ex| ex.matches(name)) {
            return false;
        }
        if self.extensions.is_empty() {
            return true;
        }
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_lowercase()))
    }

    /// List matching files sorted by name and number them from 1.
    ///
    /// Files that match but cannot be opened are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Directory` if the directory cannot be read,
    /// `SourceError::NoMatches` if nothing usable matches, or
    /// `SourceError::Validation` if there are more files than file numbers.
    pub fn list(&self, format: SourceFormat) -> Result<Vec<SourceFile>, SourceError> {
        let read_dir = std::fs::read_dir(&self.directory).map_err(|source| SourceError::Directory {
            path: self.directory.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|source| SourceError::Directory {
                path: self.directory.clone(),
                source,
            })?;
            let Ok(file_type) = dir_entry.file_type() else {
                continue;
            };
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            if self.accepts(&name) {
                names.push(name);
            }
        }

        names.sort();

        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let path = self.directory.join(&name);
            if !path.is_file() {
                continue;
            }
            if let Err(e) = File::open(&path) {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
            check_file_limit(files.len() + 1)?;
            #[allow(clippy::cast_possible_truncation)] // bounded by check_file_limit
            let number = (files.len() + 1) as u16;
            debug!("Source file {number}: {}", path.display());
            files.push(SourceFile::new(path, format, number));
        }

        if files.is_empty() {
            return Err(SourceError::NoMatches {
                dir: self.directory.clone(),
                pattern: self.include.as_str().to_string(),
            });
        }

        Ok(files)
    }
}
