use boardkit_core::{PlatformId, PlatformRelease, ToolId, ToolRelease};
use boardkit_resolver::ResolvedPlatform;

use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::download::Downloader;
use crate::error::InstallError;
use crate::manager::PackageManager;
use crate::progress::{ProgressSender, TaskProgress};
use crate::types::{
    InstallOptions, InstallOutcome, InstallPhase, InstallRequest, InstallStatus,
    ToolFailurePolicy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    NotStarted,
    NewInstalled,
    OldRemoved,
    RolledBack,
    RollbackFailed,
}

/// Replaces an installed platform release with another one.
///
/// The new release is installed before the old one is removed. When the old
/// one cannot be removed the new one is uninstalled again, so the registry
/// ends up holding the old release (or both, if that compensation fails too),
/// never only the new one or neither.
pub struct UpgradeTransaction<'a, P: PackageManager + ?Sized> {
    pm: &'a P,
    installed: PlatformId,
    requested: &'a PlatformRelease,
    state: UpgradeState,
    transitions: Vec<UpgradeState>,
}

impl<'a, P: PackageManager + ?Sized> UpgradeTransaction<'a, P> {
    pub fn new(pm: &'a P, installed: PlatformId, requested: &'a PlatformRelease) -> Self {
        Self {
            pm,
            installed,
            requested,
            state: UpgradeState::NotStarted,
            transitions: vec![UpgradeState::NotStarted],
        }
    }

    pub fn state(&self) -> UpgradeState {
        self.state
    }

    /// Every state the transaction has been in, oldest first.
    pub fn transitions(&self) -> &[UpgradeState] {
        &self.transitions
    }

    fn advance(&mut self, next: UpgradeState) {
        debug!(
            from = ?self.state,
            to = ?next,
            installed = %self.installed,
            requested = %self.requested.id,
            "upgrade transition"
        );
        self.state = next;
        self.transitions.push(next);
    }

    pub fn execute(&mut self, progress: &ProgressSender) -> Result<(), InstallError> {
        if self.state != UpgradeState::NotStarted {
            return Err(InstallError::PlatformInstall {
                platform: self.requested.id.clone(),
                source: anyhow::anyhow!("upgrade transaction already ran ({:?})", self.state),
            });
        }

        self.pm
            .install_platform(self.requested)
            .map_err(|source| InstallError::PlatformInstall {
                platform: self.requested.id.clone(),
                source,
            })?;
        self.advance(UpgradeState::NewInstalled);

        debug!(
            installed = %self.installed,
            phase = %InstallPhase::UpgradeCleanup,
            "removing previous release"
        );
        let uninstall_error = match self.pm.uninstall_platform(&self.installed) {
            Ok(()) => {
                self.advance(UpgradeState::OldRemoved);
                return Ok(());
            }
            Err(err) => err,
        };

        warn!(
            installed = %self.installed,
            requested = %self.requested.id,
            phase = %InstallPhase::UpgradeCleanup,
            error = %format!("{uninstall_error:#}"),
            "failed to remove previous release; rolling back"
        );
        progress.task(TaskProgress::message(format!(
            "Error updating platform: {uninstall_error:#}"
        )));

        match self.pm.uninstall_platform(&self.requested.id) {
            Ok(()) => {
                self.advance(UpgradeState::RolledBack);
                Err(InstallError::UpgradeFailed {
                    installed: self.installed.clone(),
                    requested: self.requested.id.clone(),
                    source: uninstall_error,
                })
            }
            Err(rollback_error) => {
                error!(
                    installed = %self.installed,
                    requested = %self.requested.id,
                    error = %format!("{rollback_error:#}"),
                    "rollback failed; both releases may be installed"
                );
                progress.task(TaskProgress::message(format!(
                    "Error rolling-back changes: {rollback_error:#}"
                )));
                self.advance(UpgradeState::RollbackFailed);
                Err(InstallError::RollbackFailed {
                    installed: self.installed.clone(),
                    requested: self.requested.id.clone(),
                    uninstall_error,
                    rollback_error,
                })
            }
        }
    }
}

/// Sequences download, tool installation, platform install or upgrade and
/// the post-install step for resolved platforms.
pub struct Orchestrator<'a, P: PackageManager + ?Sized, D: Downloader + ?Sized> {
    pm: &'a P,
    downloader: &'a D,
    options: InstallOptions,
    progress: ProgressSender,
    cancel: CancellationToken,
}

impl<'a, P: PackageManager + ?Sized, D: Downloader + ?Sized> Orchestrator<'a, P, D> {
    pub fn new(
        pm: &'a P,
        downloader: &'a D,
        options: InstallOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pm,
            downloader,
            options,
            progress,
            cancel,
        }
    }

    /// Resolves `request`, installs it and rescans the registry.
    pub fn platform_install(
        &self,
        request: &InstallRequest,
    ) -> Result<InstallOutcome, InstallError> {
        self.cancel.check(InstallPhase::Resolving)?;
        let resolved = self.pm.find_dependencies(&request.reference)?;
        debug!(
            reference = %request.reference,
            platform = %resolved.platform.id,
            tools = resolved.tools.len(),
            "resolved platform dependencies"
        );

        let outcome = self.install_platform(&resolved, request.skip_post_install)?;

        self.pm
            .rescan()
            .map_err(|source| InstallError::Rescan { source })?;
        Ok(outcome)
    }

    /// Installs an already resolved platform and the tools it requires.
    pub fn install_platform(
        &self,
        resolved: &ResolvedPlatform,
        skip_post_install: bool,
    ) -> Result<InstallOutcome, InstallError> {
        let platform = &resolved.platform;

        self.cancel.check(InstallPhase::CheckInstalled)?;
        if registry(
            "checking installed platforms",
            self.pm.is_platform_installed(&platform.id),
        )? {
            info!(platform = %platform.id, "platform already installed");
            let current = registry(
                "checking installed platforms",
                self.pm
                    .currently_installed(&platform.id.package, &platform.id.architecture),
            )?;
            if let Some(current) = current.filter(|current| current != &platform.id) {
                warn!(
                    platform = %platform.id,
                    current = %current,
                    "another release of this platform is also installed"
                );
            }
            self.progress.task(
                TaskProgress::named(format!("Platform {} already installed", platform.id))
                    .completed(),
            );
            return Ok(InstallOutcome {
                platform: platform.id.clone(),
                status: InstallStatus::AlreadyInstalled,
                installed_tools: Vec::new(),
                warnings: Vec::new(),
            });
        }

        let mut pending_tools = Vec::new();
        for tool in &resolved.tools {
            if self.tool_already_installed(tool)? {
                continue;
            }
            pending_tools.push(tool);
        }

        self.download(platform, &pending_tools)?;

        let mut warnings = Vec::new();
        let installed_tools = self.install_tools(&pending_tools, &mut warnings)?;

        let status = self.install_or_upgrade(platform)?;

        // The platform is committed from here on; a cancellation only skips
        // the configuration step.
        if skip_post_install {
            self.progress
                .task(TaskProgress::message("Skipping platform configuration"));
        } else if self.cancel.is_cancelled() {
            let warning = "WARNING: post install skipped: operation cancelled".to_string();
            warn!(
                platform = %platform.id,
                phase = %InstallPhase::PostInstall,
                "cancelled before post-install"
            );
            self.progress
                .task(TaskProgress::message("Skipping platform configuration"));
            self.progress.task(TaskProgress::message(warning.clone()));
            warnings.push(warning);
        } else {
            self.progress
                .task(TaskProgress::message("Configuring platform"));
            if let Err(err) = self.pm.run_post_install_script(&platform.id) {
                let warning = format!("WARNING: cannot run post install: {err:#}");
                warn!(
                    platform = %platform.id,
                    error = %format!("{err:#}"),
                    "post-install failed"
                );
                self.progress.task(TaskProgress::message(warning.clone()));
                warnings.push(warning);
            }
        }

        info!(
            platform = %platform.id,
            status = status.as_str(),
            phase = %InstallPhase::Done,
            "platform installed"
        );
        self.progress
            .task(TaskProgress::named(format!("{} installed", platform.id)).completed());

        Ok(InstallOutcome {
            platform: platform.id.clone(),
            status,
            installed_tools,
            warnings,
        })
    }

    fn tool_already_installed(&self, tool: &ToolRelease) -> Result<bool, InstallError> {
        let installed = registry(
            "checking installed tools",
            self.pm.is_tool_installed(&tool.id),
        )?;
        if installed {
            debug!(tool = %tool.id, "tool already installed");
            self.progress.task(
                TaskProgress::named(format!("Tool {} already installed", tool.id)).completed(),
            );
        }
        Ok(installed)
    }

    /// Fetches missing tools in resolver order, then the platform archive.
    fn download(
        &self,
        platform: &PlatformRelease,
        tools: &[&ToolRelease],
    ) -> Result<(), InstallError> {
        self.cancel.check(InstallPhase::Downloading)?;
        self.progress
            .task(TaskProgress::named("Downloading packages"));

        for tool in tools {
            self.cancel.check(InstallPhase::Downloading)?;
            self.downloader.ensure_local(
                &tool.resource,
                &tool.id.to_string(),
                &self.progress,
                &self.cancel,
            )?;
        }
        self.cancel.check(InstallPhase::Downloading)?;
        self.downloader.ensure_local(
            &platform.resource,
            &platform.id.to_string(),
            &self.progress,
            &self.cancel,
        )?;

        self.progress
            .task(TaskProgress::named("Downloading packages").completed());
        Ok(())
    }

    fn install_tools(
        &self,
        tools: &[&ToolRelease],
        warnings: &mut Vec<String>,
    ) -> Result<Vec<ToolId>, InstallError> {
        self.cancel.check(InstallPhase::InstallingTools)?;

        let mut installed = Vec::new();
        for tool in tools {
            if self.tool_already_installed(tool)? {
                continue;
            }

            self.progress
                .task(TaskProgress::named(format!("Installing tool {}", tool.id)));
            match self.pm.install_tool(tool) {
                Ok(()) => {
                    info!(tool = %tool.id, "tool installed");
                    self.progress.task(
                        TaskProgress::named(format!("Tool {} installed", tool.id)).completed(),
                    );
                    installed.push(tool.id.clone());
                }
                Err(source) => match self.options.tool_failure_policy {
                    ToolFailurePolicy::Abort => {
                        return Err(InstallError::ToolInstall {
                            tool: tool.id.clone(),
                            source,
                        });
                    }
                    ToolFailurePolicy::Continue => {
                        let warning =
                            format!("WARNING: cannot install tool {}: {source:#}", tool.id);
                        warn!(
                            tool = %tool.id,
                            error = %format!("{source:#}"),
                            "tool install failed; continuing"
                        );
                        self.progress.task(TaskProgress::message(warning.clone()));
                        warnings.push(warning);
                    }
                },
            }
        }
        Ok(installed)
    }

    fn install_or_upgrade(
        &self,
        platform: &PlatformRelease,
    ) -> Result<InstallStatus, InstallError> {
        self.cancel.check(InstallPhase::DeterminingMode)?;
        let current = registry(
            "reading installed platforms",
            self.pm
                .currently_installed(&platform.id.package, &platform.id.architecture),
        )?;
        self.cancel.check(InstallPhase::Installing)?;

        match current {
            Some(old) if old != platform.id => {
                info!(from = %old, to = %platform.id, "upgrading platform");
                self.progress.task(TaskProgress::named(format!(
                    "Updating {old} with {}",
                    platform.id
                )));
                let mut transaction = UpgradeTransaction::new(self.pm, old.clone(), platform);
                transaction.execute(&self.progress)?;
                Ok(InstallStatus::Upgraded { from: old })
            }
            _ => {
                self.progress
                    .task(TaskProgress::named(format!("Installing {}", platform.id)));
                self.pm
                    .install_platform(platform)
                    .map_err(|source| InstallError::PlatformInstall {
                        platform: platform.id.clone(),
                        source,
                    })?;
                Ok(InstallStatus::Installed)
            }
        }
    }
}

fn registry<T>(message: &str, result: anyhow::Result<T>) -> Result<T, InstallError> {
    result.map_err(|source| InstallError::registry(message, source))
}
