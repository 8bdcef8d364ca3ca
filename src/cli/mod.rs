//! Command-line interface for seq-dbi.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **flat**: Index EMBL, Swiss-Prot or GenBank flat files
//! - **fasta**: Index FASTA files
//! - **blast**: Index packed BLAST databases
//! - **run**: Index with every setting taken from a JSON config file
//!
//! ## Usage
//!
//! ```text
//! # Index all EMBL division files in a directory
//! seq-dbi flat /data/embl --db-name embl --wildcard '*.dat' --index-dir /data/embl/index
//!
//! # Swiss-Prot with a release tag
//! seq-dbi flat /data/sprot --flat-format swissprot --db-name sprot --release 2024_01
//!
//! # FASTA with GCG-style headers, sorted on disk
//! seq-dbi fasta /data/est --db-name est --convention gcg --sort-mode external
//!
//! # BLAST protein databases, JSON summary
//! seq-dbi blast /data/blast --db-name nr --alphabet protein --format json
//!
//! # Settings from a file
//! seq-dbi run --config index.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::config::{IndexByteOrder, IndexConfig, SortMode, SortProviderKind};
use crate::core::types::SourceFormat;
use crate::index::{BuildReport, IndexBuilder};

pub mod blast;
pub mod fasta;
pub mod flat;

#[derive(Parser)]
#[command(name = "seq-dbi")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Build identifier and accession indices over sequence databases")]
#[command(
    long_about = "seq-dbi builds random-access lookup indices over flat-file sequence databases (EMBL, Swiss-Prot, GenBank, FASTA) and packed BLAST databases.\n\nIt writes four binary files to the index directory:\n- division.lkp: the source files\n- entrynam.idx: entries by identifier\n- acnum.trg / acnum.hit: entries by accession"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index EMBL, Swiss-Prot or GenBank flat files
    Flat(flat::FlatArgs),

    /// Index FASTA files
    Fasta(fasta::FastaArgs),

    /// Index packed BLAST databases
    Blast(blast::BlastArgs),

    /// Index using a JSON configuration file
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Options shared by every indexing command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directory holding the source files
    #[arg(required = true)]
    pub directory: PathBuf,

    /// Database name written to the index headers (up to 20 characters)
    #[arg(short, long)]
    pub db_name: String,

    /// Directory to write the index files to
    #[arg(short = 'o', long, default_value = ".")]
    pub index_dir: PathBuf,

    /// Source file names to include; several patterns may be separated by commas
    #[arg(short, long, default_value = "*")]
    pub wildcard: String,

    /// Source file names to skip
    #[arg(short = 'x', long)]
    pub exclude: Option<String>,

    /// Release tag written to the index headers (up to 10 characters)
    #[arg(short, long, default_value = "")]
    pub release: String,

    /// Release date as YYYY-MM-DD (default: today)
    #[arg(long)]
    pub date: Option<String>,

    /// Sort records in memory or through intermediate files on disk
    #[arg(long, value_enum, default_value = "memory")]
    pub sort_mode: SortMode,

    /// Sorter used for intermediate files
    #[arg(long, value_enum, default_value = "builtin")]
    pub sort_provider: SortProviderKind,

    /// Extra options passed to the system sort program
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub sort_options: String,

    /// Lines held in memory per chunk by the builtin sorter
    #[arg(long, default_value = "100000")]
    pub sort_chunk_lines: usize,

    /// Keep intermediate files after an external sort
    #[arg(long)]
    pub keep_temp: bool,

    /// Directory for intermediate files (default: the index directory)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Byte order of integers in the index files
    #[arg(long, value_enum, default_value = "little")]
    pub byte_order: IndexByteOrder,

    /// Minimum width of the identifier field
    #[arg(long, default_value = "0")]
    pub min_id_len: usize,

    /// Minimum width of the accession field
    #[arg(long, default_value = "0")]
    pub min_acc_len: usize,
}

impl IndexArgs {
    /// Configuration for a run over `format` sources
    pub fn into_config(self, format: SourceFormat) -> IndexConfig {
        let mut config = IndexConfig::new(self.directory, self.index_dir, format, self.db_name);
        config.wildcard = self.wildcard;
        config.exclude = self.exclude;
        config.release = self.release;
        config.date = self.date;
        config.sort_mode = self.sort_mode;
        config.sort_provider = self.sort_provider;
        config.sort_options = self.sort_options;
        config.sort_chunk_lines = self.sort_chunk_lines;
        config.keep_temp = self.keep_temp;
        config.temp_dir = self.temp_dir;
        config.byte_order = self.byte_order;
        config.min_id_len = self.min_id_len;
        config.min_acc_len = self.min_acc_len;
        config
    }
}

/// Execute the run command
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded or indexing fails.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: RunArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = IndexConfig::load_from_file(&args.config)?;
    if verbose {
        eprintln!("Loaded configuration from {}", args.config.display());
    }
    build(config, format, verbose)
}

/// Run the pipeline for `config` and print the report
///
/// # Errors
///
/// Returns an error if indexing fails or the report cannot be serialized.
pub fn build(config: IndexConfig, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    if verbose {
        eprintln!(
            "Indexing {} sources in {} into {} ({:?} sort, {:?} byte order)",
            config.format,
            config.directory.display(),
            config.index_dir.display(),
            config.sort_mode,
            config.byte_order,
        );
    }

    let report = IndexBuilder::new(config).run()?;
    print_report(&report, format)
}

fn print_report(report: &BuildReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}
