//! # seq-dbi
//!
//! A library for building random-access lookup indices over sequence
//! databases.
//!
//! Sequence databases are distributed as large flat files (EMBL, Swiss-Prot,
//! GenBank, FASTA) or as packed BLAST databases. Finding one entry in them by
//! identifier or accession means scanning gigabytes of text. `seq-dbi` scans
//! the sources once and writes four small binary files that let readers jump
//! straight to the record:
//!
//! - `division.lkp`: source file numbers and names
//! - `entrynam.idx`: identifiers sorted, with record and sequence offsets
//! - `acnum.trg` / `acnum.hit`: accessions sorted, each pointing at the
//!   identifiers that carry it
//!
//! ## Features
//!
//! - **Several source formats**: flat files, FASTA with NCBI, GCG or simple
//!   header conventions, and BLAST version 1 and 2 databases
//! - **Two sort modes**: everything in memory, or per-file intermediate files
//!   sort-merged on disk for databases larger than RAM
//! - **Deterministic output**: both modes produce byte-identical files
//! - **Portable layout**: integers written in an explicit byte order
//!
//! ## Example
//!
//! ```rust,no_run
//! use seq_dbi::{IndexBuilder, IndexConfig, SourceFormat};
//!
//! let mut config = IndexConfig::new("/data/embl", "/data/embl/index", SourceFormat::Embl, "embl");
//! config.wildcard = "*.dat".to_string();
//!
//! let report = IndexBuilder::new(config).run().unwrap();
//! println!("{} identifiers, {} accessions", report.entries, report.distinct_accessions);
//! ```
//!
//! ## Modules
//!
//! - [`source`]: Enumerating and numbering source files
//! - [`parsing`]: Format adapters and header extractors
//! - [`collect`]: Sorting, de-duplication and cross-referencing of entries
//! - [`index`]: The build pipeline and the binary index writer
//! - [`core`]: Configuration and shared data types
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod collect;
pub mod core;
pub mod index;
pub mod parsing;
pub mod source;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::config::IndexConfig;
pub use core::types::*;
pub use index::{BuildError, BuildReport, IndexBuilder};
