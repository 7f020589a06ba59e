use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use tracing::{debug, info};

use crate::artifact::run_command;
use crate::error::InstallError;

#[cfg(windows)]
pub const POST_INSTALL_SCRIPT: &str = "post_install.bat";
#[cfg(not(windows))]
pub const POST_INSTALL_SCRIPT: &str = "post_install.sh";

/// The user's explicit post-install choice for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostInstallFlags {
    pub run_post_install: bool,
    pub skip_post_install: bool,
}

/// Decides whether the post-install step is skipped.
///
/// Explicit flags win; otherwise the step runs only when attached to a
/// terminal.
pub fn detect_skip_post_install(
    flags: PostInstallFlags,
    interactive: bool,
) -> Result<bool, InstallError> {
    match (flags.run_post_install, flags.skip_post_install) {
        (true, true) => Err(InstallError::ConflictingFlags),
        (true, false) => {
            info!("Will run post-install by user request");
            Ok(false)
        }
        (false, true) => {
            info!("Will skip post-install by user request");
            Ok(true)
        }
        (false, false) if !interactive => {
            info!("Not running from console, will skip post-install by default");
            Ok(true)
        }
        (false, false) => {
            info!("Running from console, will run post-install by default");
            Ok(false)
        }
    }
}

/// Both standard input and standard output are attached to a terminal.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

pub fn post_install_script_path(platform_dir: &Path) -> PathBuf {
    platform_dir.join(POST_INSTALL_SCRIPT)
}

/// Runs the platform's post-install script if it ships one.
pub fn run_post_install_script(platform_dir: &Path) -> Result<()> {
    let script = post_install_script_path(platform_dir);
    if !script.is_file() {
        debug!(dir = %platform_dir.display(), "no post-install script");
        return Ok(());
    }

    info!(script = %script.display(), "running post-install script");
    let mut command = script_command(&script);
    command.current_dir(platform_dir);
    run_command(
        &mut command,
        &format!("post-install script {} failed", script.display()),
    )?;
    Ok(())
}

#[cfg(windows)]
fn script_command(script: &Path) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(script);
    command
}

#[cfg(not(windows))]
fn script_command(script: &Path) -> Command {
    let mut command = Command::new("sh");
    command.arg(script);
    command
}
