use clap::Parser;
use ordna::cli::{Cli, run_cli};
use ordna::output::OutputFormatter;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_cli(cli) {
        OutputFormatter::error(&e);
        std::process::exit(1);
    }
}
