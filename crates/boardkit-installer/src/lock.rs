use anyhow::Context;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::InstallError;
use crate::fs_utils::remove_file_if_exists;
use crate::layout::PrefixLayout;

/// Single-writer marker at `state/lock`, released on drop.
///
/// Install and uninstall mutate the receipt set; holding this keeps two
/// upgrade transactions from interleaving on the same prefix.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(layout: &PrefixLayout, operation: &str) -> Result<Self, InstallError> {
        let path = layout.lock_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))
                .map_err(|err| InstallError::registry("preparing install lock", err))?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let holder = read_lock_holder(&path).unwrap_or_else(|| "unknown".to_string());
                return Err(InstallError::Locked { holder });
            }
            Err(err) => {
                return Err(InstallError::registry(
                    "claiming install lock",
                    anyhow::Error::new(err)
                        .context(format!("failed to create lock file: {}", path.display())),
                ));
            }
        };

        let lock = Self { path };
        file.write_all(format!("pid={}\noperation={operation}\n", std::process::id()).as_bytes())
            .and_then(|_| file.flush())
            .with_context(|| format!("failed to write lock file: {}", lock.path.display()))
            .map_err(|err| InstallError::registry("claiming install lock", err))?;

        debug!(path = %lock.path.display(), operation, "install lock acquired");
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(err) = remove_file_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to release install lock");
        }
    }
}

fn read_lock_holder(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let holder = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!holder.is_empty()).then_some(holder)
}
