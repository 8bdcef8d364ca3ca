//! BLAST command - index packed BLAST databases through their header tables.
//!
//! Each database is listed by its table file (`.pin`, `.nin`, `.atb`, `.ntb`);
//! the header and sequence files are found next to it.

use clap::Args;

use crate::cli::{IndexArgs, OutputFormat};
use crate::core::config::{Alphabet, BlastVersion, HeaderConvention};
use crate::core::types::SourceFormat;

#[derive(Args)]
pub struct BlastArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    /// How identifiers and accessions are read from stored deflines
    #[arg(short, long, value_enum, default_value = "ncbi")]
    pub convention: HeaderConvention,

    /// Only index databases of this layout version (default: detect)
    #[arg(long, value_enum)]
    pub blast_version: Option<BlastVersion>,

    /// Only index databases of this alphabet (default: detect)
    #[arg(long, value_enum)]
    pub alphabet: Option<Alphabet>,
}

/// Execute the blast command
///
/// # Errors
///
/// Returns an error if a database cannot be read or the index cannot be written.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: BlastArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let mut config = args.index.into_config(SourceFormat::Blast);
    config.convention = args.convention;
    config.blast_version = args.blast_version;
    config.alphabet = args.alphabet;
    super::build(config, format, verbose)
}
