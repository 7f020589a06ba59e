use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use boardkit_core::{PlatformManifest, ToolId, ToolManifest};
use semver::Version;

/// Read-only view over an index directory:
///
/// ```text
/// <root>/platforms/<packager>/<architecture>/<version>.toml
/// <root>/tools/<packager>/<name>/<version>.toml
/// ```
#[derive(Debug, Clone)]
pub struct PlatformIndex {
    root: PathBuf,
}

impl PlatformIndex {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// All releases of a platform, newest first.
    pub fn platform_versions(
        &self,
        packager: &str,
        architecture: &str,
    ) -> Result<Vec<PlatformManifest>> {
        validate_path_segment(packager)?;
        validate_path_segment(architecture)?;

        let platform_dir = self
            .root
            .join("platforms")
            .join(packager)
            .join(architecture);
        let mut manifests = Vec::new();
        for (path, content) in read_manifest_files(&platform_dir)? {
            let manifest = PlatformManifest::from_toml_str(&content)
                .with_context(|| format!("failed parsing manifest: {}", path.display()))?;
            if manifest.packager != packager || manifest.architecture != architecture {
                return Err(anyhow!(
                    "manifest {} declares platform {}:{} but is stored under {packager}:{architecture}",
                    path.display(),
                    manifest.packager,
                    manifest.architecture
                ));
            }
            manifests.push(manifest);
        }

        manifests.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(manifests)
    }

    pub fn platform_release(
        &self,
        packager: &str,
        architecture: &str,
        version: &Version,
    ) -> Result<Option<PlatformManifest>> {
        Ok(self
            .platform_versions(packager, architecture)?
            .into_iter()
            .find(|manifest| &manifest.version == version))
    }

    pub fn tool_versions(&self, packager: &str, name: &str) -> Result<Vec<ToolManifest>> {
        validate_path_segment(packager)?;
        validate_path_segment(name)?;

        let tool_dir = self.root.join("tools").join(packager).join(name);
        let mut manifests = Vec::new();
        for (path, content) in read_manifest_files(&tool_dir)? {
            let manifest = ToolManifest::from_toml_str(&content)
                .with_context(|| format!("failed parsing manifest: {}", path.display()))?;
            if manifest.packager != packager || manifest.name != name {
                return Err(anyhow!(
                    "manifest {} declares tool {}:{} but is stored under {packager}:{name}",
                    path.display(),
                    manifest.packager,
                    manifest.name
                ));
            }
            manifests.push(manifest);
        }

        manifests.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(manifests)
    }

    pub fn tool_release(&self, id: &ToolId) -> Result<Option<ToolManifest>> {
        Ok(self
            .tool_versions(&id.packager, &id.name)?
            .into_iter()
            .find(|manifest| manifest.version == id.version))
    }
}

fn read_manifest_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read index directory: {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|v| v.to_str()) != Some("toml") {
            continue;
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed reading manifest: {}", path.display()))?;
        files.push((path, content));
    }
    Ok(files)
}

fn validate_path_segment(value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
    {
        return Err(anyhow!("invalid index path segment '{value}'"));
    }
    Ok(())
}
