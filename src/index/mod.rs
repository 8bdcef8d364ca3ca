//! Index building and binary output.
//!
//! - [`builder`]: the pipeline from source directory to index files
//! - [`writer`]: the four fixed-layout index files
//! - [`report`]: statistics of a finished run
//!
//! ## Output files
//!
//! | File | One record per | Record |
//! |------|----------------|--------|
//! | `division.lkp` | source file | file number, file name |
//! | `entrynam.idx` | identifier | identifier, record offset, sequence offset, file number |
//! | `acnum.trg` | distinct accession | hit count, first hit, accession |
//! | `acnum.hit` | accession reference | identifier rank |

pub mod builder;
pub mod report;
pub mod writer;

pub use builder::{BuildError, IndexBuilder};
pub use report::BuildReport;
