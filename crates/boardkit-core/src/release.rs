use std::fmt;

use anyhow::{anyhow, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveType;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlatformId {
    pub package: String,
    pub architecture: String,
    pub version: Version,
}

impl PlatformId {
    pub fn new(
        package: impl Into<String>,
        architecture: impl Into<String>,
        version: Version,
    ) -> Self {
        Self {
            package: package.into(),
            architecture: architecture.into(),
            version,
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.package, self.architecture, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolId {
    pub packager: String,
    pub name: String,
    pub version: Version,
}

impl ToolId {
    pub fn new(packager: impl Into<String>, name: impl Into<String>, version: Version) -> Self {
        Self {
            packager: packager.into(),
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.packager, self.name, self.version)
    }
}

/// Where a release archive is fetched from and how to validate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResource {
    pub url: String,
    pub archive_file_name: String,
    /// `SHA-256:<hex>`
    pub checksum: String,
    pub size: Option<u64>,
}

impl DownloadResource {
    pub fn archive_type(&self) -> Result<ArchiveType> {
        ArchiveType::infer_from_file_name(&self.archive_file_name).ok_or_else(|| {
            anyhow!(
                "unsupported archive '{}'; supported: zip, tar.gz, tar.bz2, tar.xz",
                self.archive_file_name
            )
        })
    }

    pub fn sha256_hex(&self) -> Result<&str> {
        let Some((algorithm, digest)) = self.checksum.split_once(':') else {
            return Err(anyhow!(
                "checksum '{}' must use the form 'SHA-256:<hex>'",
                self.checksum
            ));
        };
        if !algorithm.eq_ignore_ascii_case("SHA-256") {
            return Err(anyhow!("unsupported checksum algorithm '{algorithm}'"));
        }
        let digest = digest.trim();
        if digest.len() != 64 || !digest.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(anyhow!("malformed SHA-256 digest '{digest}'"));
        }
        Ok(digest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRelease {
    pub id: ToolId,
    /// Flavour selected for the host running the install.
    pub resource: DownloadResource,
}

impl fmt::Display for ToolRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRelease {
    pub id: PlatformId,
    pub name: String,
    pub resource: DownloadResource,
    pub required_tools: Vec<ToolId>,
}

impl fmt::Display for PlatformRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}
