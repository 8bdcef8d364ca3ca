use clap::Parser;
use tracing_subscriber::EnvFilter;

use seq_dbi::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag; stdout is kept for the report
    let filter = if cli.verbose {
        EnvFilter::new("seq_dbi=debug,info")
    } else {
        EnvFilter::new("seq_dbi=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Flat(args) => {
            cli::flat::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Fasta(args) => {
            cli::fasta::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Blast(args) => {
            cli::blast::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Run(args) => {
            cli::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
