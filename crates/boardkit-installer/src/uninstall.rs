use anyhow::{anyhow, Context, Result};
use boardkit_core::{PlatformId, PlatformReference};
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::artifact::make_tmp_dir;
use crate::cancel::CancellationToken;
use crate::error::InstallError;
use crate::fs_utils::{prune_empty_parents, remove_file_if_exists};
use crate::layout::PrefixLayout;
use crate::manager::PackageManager;
use crate::progress::{ProgressSender, TaskProgress};
use crate::types::InstallPhase;

/// Removes an install directory together with its receipt.
///
/// The directory is first moved aside so a failure to delete the receipt can
/// put it back, leaving the prefix as it was. Returns whether the directory
/// was present.
pub(crate) fn remove_installed_tree(
    layout: &PrefixLayout,
    install_dir: &Path,
    receipt_path: &Path,
) -> Result<bool> {
    if !receipt_path.exists() {
        return Err(anyhow!(
            "no install receipt at {}; nothing to remove",
            receipt_path.display()
        ));
    }

    let existed = install_dir.exists();
    let trash_root = make_tmp_dir(layout, "uninstall")?;
    let trash = trash_root.join("payload");
    if existed {
        fs::rename(install_dir, &trash).with_context(|| {
            format!(
                "failed to move {} out of the package tree",
                install_dir.display()
            )
        })?;
    }

    if let Err(err) = fs::remove_file(receipt_path) {
        if existed {
            if let Err(restore_err) = fs::rename(&trash, install_dir) {
                warn!(
                    path = %install_dir.display(),
                    error = %restore_err,
                    "failed to restore install directory"
                );
            }
        }
        let _ = fs::remove_dir_all(&trash_root);
        return Err(err).with_context(|| {
            format!("failed to remove install receipt: {}", receipt_path.display())
        });
    }

    if let Err(err) = fs::remove_dir_all(&trash_root) {
        warn!(path = %trash_root.display(), error = %err, "failed to delete removed files");
    }
    prune_empty_parents(install_dir, &layout.packages_dir());
    Ok(existed)
}

/// Removes a receipt whose install directory is already gone.
pub(crate) fn remove_stale_receipt(receipt_path: &Path) -> Result<()> {
    remove_file_if_exists(receipt_path)
        .with_context(|| format!("failed to remove stale receipt: {}", receipt_path.display()))
}

/// Uninstalls the installed release of `reference`.
///
/// When the reference names a version it must match the installed one.
pub fn platform_uninstall<P: PackageManager + ?Sized>(
    pm: &P,
    reference: &PlatformReference,
    progress: &ProgressSender,
    cancel: &CancellationToken,
) -> Result<PlatformId, InstallError> {
    cancel.check(InstallPhase::Uninstalling)?;
    let installed = pm
        .currently_installed(&reference.package, &reference.architecture)
        .map_err(|err| InstallError::registry("reading installed platforms", err))?;
    let Some(installed) = installed else {
        return Err(InstallError::PlatformUninstall {
            platform: reference.to_string(),
            source: anyhow!("platform is not installed"),
        });
    };
    if let Some(version) = &reference.version {
        if *version != installed.version {
            return Err(InstallError::PlatformUninstall {
                platform: reference.to_string(),
                source: anyhow!("installed version is {}", installed.version),
            });
        }
    }

    progress.task(TaskProgress::named(format!("Uninstalling {installed}")));
    pm.uninstall_platform(&installed)
        .map_err(|source| InstallError::PlatformUninstall {
            platform: installed.to_string(),
            source,
        })?;
    info!(platform = %installed, "platform uninstalled");
    progress.task(TaskProgress::named(format!("{installed} uninstalled")).completed());

    pm.rescan().map_err(|source| InstallError::Rescan { source })?;
    Ok(installed)
}
