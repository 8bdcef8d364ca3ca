//! FASTA command - index FASTA files by their header lines.

use clap::Args;

use crate::cli::{IndexArgs, OutputFormat};
use crate::core::config::HeaderConvention;
use crate::core::types::SourceFormat;

#[derive(Args)]
pub struct FastaArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    /// How identifiers and accessions are read from `>` header lines
    #[arg(short, long, value_enum, default_value = "ncbi")]
    pub convention: HeaderConvention,
}

/// Execute the fasta command
///
/// # Errors
///
/// Returns an error if the sources cannot be read or the index cannot be written.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: FastaArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let mut config = args.index.into_config(SourceFormat::Fasta);
    config.convention = args.convention;
    super::build(config, format, verbose)
}
