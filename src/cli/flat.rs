//! Flat command - index EMBL, Swiss-Prot or GenBank division files.

use clap::Args;

use crate::cli::{IndexArgs, OutputFormat};
use crate::core::config::FlatFormat;

#[derive(Args)]
pub struct FlatArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    /// Record layout of the source files
    #[arg(long, value_enum, default_value = "embl")]
    pub flat_format: FlatFormat,
}

/// Execute the flat command
///
/// # Errors
///
/// Returns an error if the sources cannot be read or the index cannot be written.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: FlatArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = args.index.into_config(args.flat_format.into());
    super::build(config, format, verbose)
}
