use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid version {version} for platform {package}:{architecture}")]
    InvalidVersion {
        package: String,
        architecture: String,
        version: String,
    },

    #[error("finding platform dependencies: {message}")]
    Dependencies {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl ResolveError {
    pub(crate) fn dependencies(message: impl Into<String>) -> Self {
        Self::Dependencies {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn index(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Dependencies {
            message: message.into(),
            source: Some(source),
        }
    }
}
