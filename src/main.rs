//! CLI entry point for the DeepISLES case runner

use clap::Parser;
use deepisles_runner::case::CaseProcessor;
use deepisles_runner::io::cli::Cli;
use deepisles_runner::io::logging::init_logging;

fn main() -> deepisles_runner::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let mut processor = CaseProcessor::new(cli.to_config(), cli.ensemble());
    processor.process()?;
    Ok(())
}
