//! noirai CLI: investigation planning from the command line.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "noirai",
    version,
    about = "Investigation planner: baseline plans, evidence-driven adaptation, dispatch waves"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: noirai::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    let logging = noirai::logging::LoggingConfig::from_verbosity(cli.verbose);
    if let Err(e) = noirai::logging::init_logging(&logging) {
        eprintln!("warning: {}", e);
    }
    if let Err(e) = noirai::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
