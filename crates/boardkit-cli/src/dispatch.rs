use std::process::ExitCode;

use boardkit_installer::{CancellationToken, InstallOptions, PostInstallFlags, ToolFailurePolicy};
use tracing::{error, info};

use crate::config::Settings;
use crate::core_flows::{run_core_install, run_core_list, run_core_uninstall, InstallCommand};
use crate::render::{current_output_style, TerminalRenderer};
use crate::{Cli, Commands, CoreCommands};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliExit {
    Success,
    Failure,
    /// Rejected command line; nothing was touched.
    BadArgument,
}

impl CliExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::BadArgument => 6,
        }
    }
}

impl From<CliExit> for ExitCode {
    fn from(value: CliExit) -> Self {
        ExitCode::from(value.code())
    }
}

pub(crate) fn run_cli(cli: Cli) -> CliExit {
    let settings = match Settings::resolve(
        cli.prefix.as_deref(),
        cli.index_root.as_deref(),
        cli.format,
    ) {
        Ok(settings) => settings,
        Err(err) => {
            TerminalRenderer::from_style(current_output_style()).print_error(&format!("{err:#}"));
            return CliExit::Failure;
        }
    };

    match cli.command {
        Commands::Core(CoreCommands::Install(args)) => {
            let cancel = interrupt_token();
            let tool_failure_policy = if args.continue_on_tool_error {
                ToolFailurePolicy::Continue
            } else {
                ToolFailurePolicy::Abort
            };
            run_core_install(
                &settings,
                InstallCommand {
                    references: &args.references,
                    flags: PostInstallFlags {
                        run_post_install: args.run_post_install,
                        skip_post_install: args.skip_post_install,
                    },
                    options: InstallOptions {
                        tool_failure_policy,
                    },
                },
                &cancel,
            )
        }
        Commands::Core(CoreCommands::Uninstall { references }) => {
            let cancel = interrupt_token();
            run_core_uninstall(&settings, &references, &cancel)
        }
        Commands::Core(CoreCommands::List) => run_core_list(&settings),
    }
}

/// Token cancelled by Ctrl-C; work stops at the next phase boundary.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let _ = ctrlc::set_handler({
        let cancel = cancel.clone();
        move || {
            info!("Received SIGINT (Ctrl-C). Stopping after the current step");
            cancel.cancel();
        }
    })
    .inspect_err(|e| error!("Could not set signal handler: {e}"));
    cancel
}
