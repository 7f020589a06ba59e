use anyhow::{Context, Result};
use boardkit_core::{PlatformId, ToolId};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixLayout {
    prefix: PathBuf,
}

impl PrefixLayout {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.prefix.join("packages")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.prefix.join("state")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.prefix.join("cache")
    }

    pub fn default_index_dir(&self) -> PathBuf {
        self.prefix.join("index")
    }

    pub fn artifacts_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("artifacts")
    }

    pub fn tmp_state_dir(&self) -> PathBuf {
        self.state_dir().join("tmp")
    }

    pub fn installed_state_dir(&self) -> PathBuf {
        self.state_dir().join("installed")
    }

    pub fn platform_receipts_dir(&self) -> PathBuf {
        self.installed_state_dir().join("platforms")
    }

    pub fn tool_receipts_dir(&self) -> PathBuf {
        self.installed_state_dir().join("tools")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join("lock")
    }

    pub fn platform_dir(&self, id: &PlatformId) -> PathBuf {
        self.packages_dir()
            .join(&id.package)
            .join("hardware")
            .join(&id.architecture)
            .join(id.version.to_string())
    }

    pub fn tool_dir(&self, id: &ToolId) -> PathBuf {
        self.packages_dir()
            .join(&id.packager)
            .join("tools")
            .join(&id.name)
            .join(id.version.to_string())
    }

    pub fn platform_receipt_path(&self, id: &PlatformId) -> PathBuf {
        self.platform_receipts_dir().join(format!(
            "{}--{}--{}.receipt",
            id.package, id.architecture, id.version
        ))
    }

    pub fn tool_receipt_path(&self, id: &ToolId) -> PathBuf {
        self.tool_receipts_dir().join(format!(
            "{}--{}--{}.receipt",
            id.packager, id.name, id.version
        ))
    }

    /// Archives are filed under their SHA-256 digest so two releases that
    /// publish the same file name never share a cache entry.
    pub fn artifact_cache_path(&self, sha256: &str, archive_file_name: &str) -> PathBuf {
        self.artifacts_cache_dir()
            .join(sha256.to_ascii_lowercase())
            .join(archive_file_name)
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.packages_dir(),
            self.state_dir(),
            self.cache_dir(),
            self.artifacts_cache_dir(),
            self.tmp_state_dir(),
            self.installed_state_dir(),
            self.platform_receipts_dir(),
            self.tool_receipts_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_user_prefix() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user prefix")?;
        return Ok(PathBuf::from(app_data).join("Boardkit"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user prefix")?;
    Ok(PathBuf::from(home).join(".boardkit"))
}
