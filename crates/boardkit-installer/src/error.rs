use boardkit_core::{PlatformId, ToolId};
use boardkit_resolver::ResolveError;
use thiserror::Error;

use crate::types::InstallPhase;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("the flags --run-post-install and --skip-post-install can't be both set at the same time")]
    ConflictingFlags,

    #[error("invalid version {version} for platform {package}:{architecture}")]
    InvalidVersion {
        package: String,
        architecture: String,
        version: String,
    },

    #[error("finding platform dependencies: {message}")]
    DependencyResolution {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("downloading {artifact}")]
    Download {
        artifact: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("installing tool {tool}")]
    ToolInstall {
        tool: ToolId,
        #[source]
        source: anyhow::Error,
    },

    #[error("installing platform {platform}")]
    PlatformInstall {
        platform: PlatformId,
        #[source]
        source: anyhow::Error,
    },

    #[error("updating platform {installed} to {requested}: previous release could not be removed, changes were rolled back")]
    UpgradeFailed {
        installed: PlatformId,
        requested: PlatformId,
        #[source]
        source: anyhow::Error,
    },

    #[error("updating platform {installed} to {requested}: previous release could not be removed and rolling back failed ({rollback_error:#}); both releases may be installed")]
    RollbackFailed {
        installed: PlatformId,
        requested: PlatformId,
        #[source]
        uninstall_error: anyhow::Error,
        rollback_error: anyhow::Error,
    },

    #[error("uninstalling platform {platform}")]
    PlatformUninstall {
        platform: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("rescanning installed packages")]
    Rescan {
        #[source]
        source: anyhow::Error,
    },

    #[error("another boardkit operation is in progress (install lock held by {holder})")]
    Locked { holder: String },

    #[error("operation cancelled while {phase}")]
    Cancelled { phase: InstallPhase },

    #[error("{message}")]
    Registry {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl InstallError {
    pub fn invalid_argument(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn registry(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Registry {
            message: message.into(),
            source,
        }
    }

    /// Errors the user can fix by changing the command line.
    pub fn is_bad_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::ConflictingFlags)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl From<ResolveError> for InstallError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::InvalidVersion {
                package,
                architecture,
                version,
            } => Self::InvalidVersion {
                package,
                architecture,
                version,
            },
            ResolveError::Dependencies { message, source } => {
                Self::DependencyResolution { message, source }
            }
        }
    }
}

/// Renders an error with every `source()` joined by `": "`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}
