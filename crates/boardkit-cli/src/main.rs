mod config;
mod core_flows;
mod dispatch;
mod logging;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::config::OutputFormat;
use crate::dispatch::{run_cli, CliExit};
use crate::logging::Logging;

#[derive(Parser, Debug)]
#[command(name = "boardkit", version)]
#[command(about = "Board platform and toolchain installer", long_about = None)]
struct Cli {
    /// Root directory for installed packages, caches and state.
    #[arg(long, global = true, env = "BOARDKIT_PREFIX")]
    prefix: Option<PathBuf>,
    /// Package index directory (defaults to `<prefix>/index`).
    #[arg(long, global = true, env = "BOARDKIT_INDEX_ROOT")]
    index_root: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Raise log verbosity; repeat for more detail. `RUST_LOG` overrides it.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage board platforms (cores).
    #[command(subcommand)]
    Core(CoreCommands),
}

#[derive(Subcommand, Debug)]
enum CoreCommands {
    /// Install one or more platforms and the tools they require.
    Install(InstallArgs),
    /// Remove installed platforms.
    Uninstall {
        #[arg(required = true, value_name = "PACKAGER:ARCH[@VERSION]")]
        references: Vec<String>,
    },
    /// List installed platforms.
    List,
}

#[derive(Args, Debug)]
struct InstallArgs {
    #[arg(required = true, value_name = "PACKAGER:ARCH[@VERSION]")]
    references: Vec<String>,
    /// Force run of post-install scripts (if the CLI is not running interactively).
    #[arg(long)]
    run_post_install: bool,
    /// Force skip of post-install scripts (if the CLI is running interactively).
    #[arg(long)]
    skip_post_install: bool,
    /// Report a tool that fails to install as a warning and keep going.
    #[arg(long)]
    continue_on_tool_error: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                CliExit::BadArgument.into()
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(err) = Logging::try_init(cli.verbose) {
        eprintln!("{err}");
    }

    run_cli(cli).into()
}

#[cfg(test)]
mod tests;
