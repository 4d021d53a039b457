use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

use cli::check::CheckArgs;
use cli::show::ShowArgs;

#[derive(Parser)]
#[command(
    name = "devgen",
    version,
    about = "Device-specific snippet overrides for generated wrapper code"
)]
struct Cli {
    /// Configuration file (default: $DEVGEN_CONFIG, then ./devgen.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered backends
    List,
    /// Print the host and native preludes of a backend
    Show(ShowArgs),
    /// Validate a configuration file
    Check(CheckArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            let session = cli::open_session(cli.config.as_deref());
            cli::list::cmd_list(&session);
        }
        Command::Show(args) => {
            let session = cli::open_session(cli.config.as_deref());
            cli::show::cmd_show(&session, args);
        }
        Command::Check(args) => {
            devgen::logging::init_tracing(None);
            cli::check::cmd_check(args);
        }
    }
}
