use std::fmt;

use anyhow::{anyhow, Context, Result};
use semver::Version;

use crate::version::parse_version;

/// A user-supplied `PACKAGER:ARCH[@VERSION]` target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformReference {
    pub package: String,
    pub architecture: String,
    /// `None` selects the latest available release.
    pub version: Option<Version>,
}

impl PlatformReference {
    pub fn new(
        package: impl Into<String>,
        architecture: impl Into<String>,
        version: Option<Version>,
    ) -> Self {
        Self {
            package: package.into(),
            architecture: architecture.into(),
            version,
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (target, version) = match trimmed.split_once('@') {
            Some((target, raw_version)) => {
                let version = parse_version(raw_version)
                    .with_context(|| format!("invalid version in '{trimmed}'"))?;
                (target, Some(version))
            }
            None => (trimmed, None),
        };

        let mut parts = target.split(':');
        let package = parts.next().unwrap_or_default();
        let Some(architecture) = parts.next() else {
            return Err(anyhow!(
                "invalid item '{trimmed}': expected PACKAGER:ARCH[@VERSION]"
            ));
        };
        if parts.next().is_some() {
            return Err(anyhow!(
                "invalid item '{trimmed}': too many ':' separators"
            ));
        }
        validate_segment(trimmed, "packager", package)?;
        validate_segment(trimmed, "architecture", architecture)?;

        Ok(Self::new(package, architecture, version))
    }
}

impl fmt::Display for PlatformReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.architecture)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

/// Parses every argument, failing on the first malformed one so no install
/// work starts for a partially valid command line.
pub fn parse_reference_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<PlatformReference>> {
    args.iter()
        .map(|arg| PlatformReference::parse(arg.as_ref()))
        .collect()
}

fn validate_segment(input: &str, label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("invalid item '{input}': {label} must not be empty"));
    }
    if value == "."
        || value == ".."
        || value
            .chars()
            .any(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')))
    {
        return Err(anyhow!(
            "invalid item '{input}': {label} contains invalid character(s)"
        ));
    }
    Ok(())
}
