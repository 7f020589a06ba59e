use std::collections::HashSet;

use anyhow::{anyhow, Context};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::release::{DownloadResource, PlatformId, PlatformRelease, ToolId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDependency {
    pub packager: String,
    pub name: String,
    pub version: Version,
}

impl ToolDependency {
    pub fn id(&self) -> ToolId {
        ToolId::new(&self.packager, &self.name, self.version.clone())
    }
}

/// Index entry for one platform release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformManifest {
    pub packager: String,
    pub architecture: String,
    pub version: Version,
    pub name: String,
    pub category: Option<String>,
    pub resource: DownloadResource,
    #[serde(default)]
    pub tool_dependencies: Vec<ToolDependency>,
}

impl PlatformManifest {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let manifest: Self =
            toml::from_str(input).context("failed to parse platform manifest")?;
        validate_name("packager", &manifest.packager)?;
        validate_name("architecture", &manifest.architecture)?;
        validate_resource(&manifest.resource).with_context(|| {
            format!(
                "invalid resource for platform {}:{}@{}",
                manifest.packager, manifest.architecture, manifest.version
            )
        })?;
        for dependency in &manifest.tool_dependencies {
            validate_name("tool packager", &dependency.packager)?;
            validate_name("tool name", &dependency.name)?;
        }
        Ok(manifest)
    }

    pub fn id(&self) -> PlatformId {
        PlatformId::new(&self.packager, &self.architecture, self.version.clone())
    }

    /// Builds the release, keeping the first occurrence of a repeated tool.
    pub fn to_release(&self) -> PlatformRelease {
        let mut seen = HashSet::new();
        let required_tools = self
            .tool_dependencies
            .iter()
            .map(ToolDependency::id)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        PlatformRelease {
            id: self.id(),
            name: self.name.clone(),
            resource: self.resource.clone(),
            required_tools,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSystem {
    /// Host triple, or `*` for host-independent archives.
    pub host: String,
    pub url: String,
    pub archive_file_name: String,
    pub checksum: String,
    pub size: Option<u64>,
}

impl ToolSystem {
    pub fn resource(&self) -> DownloadResource {
        DownloadResource {
            url: self.url.clone(),
            archive_file_name: self.archive_file_name.clone(),
            checksum: self.checksum.clone(),
            size: self.size,
        }
    }
}

/// Index entry for one tool release, with one archive per supported host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolManifest {
    pub packager: String,
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub systems: Vec<ToolSystem>,
}

impl ToolManifest {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let manifest: Self = toml::from_str(input).context("failed to parse tool manifest")?;
        validate_name("packager", &manifest.packager)?;
        validate_name("name", &manifest.name)?;

        let mut seen_hosts = HashSet::new();
        for system in &manifest.systems {
            if system.host.trim().is_empty() {
                return Err(anyhow!(
                    "tool {}:{}@{} declares a system with an empty host",
                    manifest.packager,
                    manifest.name,
                    manifest.version
                ));
            }
            if !seen_hosts.insert(system.host.clone()) {
                return Err(anyhow!(
                    "duplicate system '{}' for tool {}:{}@{}",
                    system.host,
                    manifest.packager,
                    manifest.name,
                    manifest.version
                ));
            }
            validate_resource(&system.resource()).with_context(|| {
                format!(
                    "invalid system '{}' for tool {}:{}@{}",
                    system.host, manifest.packager, manifest.name, manifest.version
                )
            })?;
        }
        Ok(manifest)
    }

    pub fn id(&self) -> ToolId {
        ToolId::new(&self.packager, &self.name, self.version.clone())
    }

    /// Exact host match wins over a `*` entry.
    pub fn system_for_host(&self, host: &str) -> Option<&ToolSystem> {
        self.systems
            .iter()
            .find(|system| system.host == host)
            .or_else(|| self.systems.iter().find(|system| system.host == "*"))
    }
}

fn validate_name(label: &str, value: &str) -> anyhow::Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{label} must not be empty"));
    }
    if value.contains(['/', '\\', ':', '@']) || value == "." || value == ".." {
        return Err(anyhow!("{label} contains invalid character(s): {value}"));
    }
    Ok(())
}

fn validate_resource(resource: &DownloadResource) -> anyhow::Result<()> {
    if resource.url.trim().is_empty() {
        return Err(anyhow!("url must not be empty"));
    }
    let file_name = resource.archive_file_name.as_str();
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
        return Err(anyhow!("invalid archive_file_name '{file_name}'"));
    }
    resource.archive_type()?;
    resource.sha256_hex()?;
    Ok(())
}
