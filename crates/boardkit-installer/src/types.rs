use std::fmt;

use anyhow::{anyhow, Result};
use boardkit_core::{parse_version, PlatformId, PlatformReference, ToolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    Platform,
    Tool,
}

impl ReceiptKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Tool => "tool",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "platform" => Ok(Self::Platform),
            "tool" => Ok(Self::Tool),
            _ => Err(anyhow!("invalid receipt kind: {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReceipt {
    pub kind: ReceiptKind,
    pub packager: String,
    /// Architecture for platforms, tool name for tools.
    pub name: String,
    pub version: String,
    pub archive_file_name: Option<String>,
    pub checksum: Option<String>,
    pub installed_at_unix: u64,
}

impl InstallReceipt {
    pub fn platform_id(&self) -> Result<PlatformId> {
        if self.kind != ReceiptKind::Platform {
            return Err(anyhow!(
                "receipt {}:{} does not describe a platform",
                self.packager,
                self.name
            ));
        }
        Ok(PlatformId::new(
            &self.packager,
            &self.name,
            parse_version(&self.version)?,
        ))
    }

    pub fn tool_id(&self) -> Result<ToolId> {
        if self.kind != ReceiptKind::Tool {
            return Err(anyhow!(
                "receipt {}:{} does not describe a tool",
                self.packager,
                self.name
            ));
        }
        Ok(ToolId::new(
            &self.packager,
            &self.name,
            parse_version(&self.version)?,
        ))
    }
}

/// Named steps of a platform install, used for logging and cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Resolving,
    CheckInstalled,
    Downloading,
    InstallingTools,
    DeterminingMode,
    Installing,
    UpgradeCleanup,
    PostInstall,
    Uninstalling,
    Done,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Resolving => "resolving dependencies",
            Self::CheckInstalled => "checking installed state",
            Self::Downloading => "downloading packages",
            Self::InstallingTools => "installing tools",
            Self::DeterminingMode => "determining install mode",
            Self::Installing => "installing platform",
            Self::UpgradeCleanup => "removing the previous release",
            Self::PostInstall => "running post-install",
            Self::Uninstalling => "uninstalling platform",
            Self::Done => "finishing",
        };
        f.write_str(label)
    }
}

/// What to do when a single required tool fails to install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolFailurePolicy {
    #[default]
    Abort,
    /// Report the failure as a warning and keep installing the platform.
    Continue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub tool_failure_policy: ToolFailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub reference: PlatformReference,
    pub skip_post_install: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    Installed,
    Upgraded { from: PlatformId },
    AlreadyInstalled,
}

impl InstallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Upgraded { .. } => "upgraded",
            Self::AlreadyInstalled => "already_installed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub platform: PlatformId,
    pub status: InstallStatus,
    pub installed_tools: Vec<ToolId>,
    pub warnings: Vec<String>,
}
