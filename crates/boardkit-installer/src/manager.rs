use anyhow::{anyhow, Context, Result};
use boardkit_core::{
    host_target_triple, DownloadResource, PlatformId, PlatformReference, PlatformRelease, ToolId,
    ToolRelease,
};
use boardkit_index::PlatformIndex;
use boardkit_resolver::{find_platform_release_dependencies, ResolvedPlatform};
use boardkit_security::verify_sha256_file;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::artifact::install_from_artifact;
use crate::error::InstallError;
use crate::layout::PrefixLayout;
use crate::post_install;
use crate::receipts::{
    platform_receipt, read_platform_receipt, read_platform_receipts, read_tool_receipt,
    read_tool_receipts, tool_receipt, write_install_receipt,
};
use crate::uninstall::{remove_installed_tree, remove_stale_receipt};
use crate::InstallReceipt;

/// Mutation and query interface over the installed-package registry.
///
/// Queries read the registry afresh on every call. Mutations return raw
/// errors; callers classify them.
pub trait PackageManager {
    fn find_dependencies(
        &self,
        reference: &PlatformReference,
    ) -> Result<ResolvedPlatform, InstallError>;

    fn is_platform_installed(&self, id: &PlatformId) -> Result<bool>;

    fn is_tool_installed(&self, id: &ToolId) -> Result<bool>;

    /// The release recorded for `(package, architecture)`, if any.
    fn currently_installed(&self, package: &str, architecture: &str)
        -> Result<Option<PlatformId>>;

    fn install_tool(&self, tool: &ToolRelease) -> Result<()>;

    fn install_platform(&self, release: &PlatformRelease) -> Result<()>;

    fn uninstall_platform(&self, id: &PlatformId) -> Result<()>;

    fn run_post_install_script(&self, id: &PlatformId) -> Result<()>;

    fn rescan(&self) -> Result<()>;
}

/// Receipt-backed registry rooted at a [`PrefixLayout`].
pub struct PrefixPackageManager {
    layout: PrefixLayout,
    index: PlatformIndex,
    host: String,
}

impl PrefixPackageManager {
    pub fn new(layout: PrefixLayout, index: PlatformIndex) -> Self {
        Self::with_host(layout, index, host_target_triple())
    }

    pub fn with_host(layout: PrefixLayout, index: PlatformIndex, host: impl Into<String>) -> Self {
        Self {
            layout,
            index,
            host: host.into(),
        }
    }

    pub fn installed_platforms(&self) -> Result<Vec<InstallReceipt>> {
        read_platform_receipts(&self.layout)
    }

    pub fn installed_tools(&self) -> Result<Vec<InstallReceipt>> {
        read_tool_receipts(&self.layout)
    }

    fn install_archive(&self, resource: &DownloadResource, dst: &Path) -> Result<()> {
        let expected = resource.sha256_hex()?;
        let archive_path = self
            .layout
            .artifact_cache_path(expected, &resource.archive_file_name);
        if !archive_path.is_file() {
            return Err(anyhow!(
                "archive {} is not in the download cache",
                archive_path.display()
            ));
        }
        if !verify_sha256_file(&archive_path, expected)? {
            return Err(anyhow!(
                "cached archive {} does not match sha256 {expected}",
                archive_path.display()
            ));
        }
        install_from_artifact(&self.layout, &archive_path, resource.archive_type()?, dst)?;
        Ok(())
    }
}

impl PackageManager for PrefixPackageManager {
    fn find_dependencies(
        &self,
        reference: &PlatformReference,
    ) -> Result<ResolvedPlatform, InstallError> {
        Ok(find_platform_release_dependencies(
            &self.index,
            reference,
            &self.host,
        )?)
    }

    fn is_platform_installed(&self, id: &PlatformId) -> Result<bool> {
        Ok(read_platform_receipt(&self.layout, id)?.is_some()
            && self.layout.platform_dir(id).is_dir())
    }

    fn is_tool_installed(&self, id: &ToolId) -> Result<bool> {
        Ok(read_tool_receipt(&self.layout, id)?.is_some() && self.layout.tool_dir(id).is_dir())
    }

    fn currently_installed(
        &self,
        package: &str,
        architecture: &str,
    ) -> Result<Option<PlatformId>> {
        let mut matching = read_platform_receipts(&self.layout)?
            .iter()
            .filter(|receipt| receipt.packager == package && receipt.name == architecture)
            .map(InstallReceipt::platform_id)
            .collect::<Result<Vec<_>>>()?;
        matching.sort_by(|a, b| b.version.cmp(&a.version));

        if matching.len() > 1 {
            let versions = matching
                .iter()
                .map(|id| id.version.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            warn!(
                package,
                architecture,
                versions = %versions,
                "several releases of one platform are recorded; using the newest"
            );
        }
        Ok(matching.into_iter().next())
    }

    fn install_tool(&self, tool: &ToolRelease) -> Result<()> {
        let dst = self.layout.tool_dir(&tool.id);
        self.install_archive(&tool.resource, &dst)?;

        let receipt = tool_receipt(tool)?;
        if let Err(err) = write_install_receipt(&self.layout, &receipt) {
            let _ = fs::remove_dir_all(&dst);
            return Err(err);
        }
        debug!(tool = %tool.id, path = %dst.display(), "tool installed");
        Ok(())
    }

    fn install_platform(&self, release: &PlatformRelease) -> Result<()> {
        let dst = self.layout.platform_dir(&release.id);
        self.install_archive(&release.resource, &dst)?;

        let receipt = platform_receipt(release)?;
        if let Err(err) = write_install_receipt(&self.layout, &receipt) {
            let _ = fs::remove_dir_all(&dst);
            return Err(err);
        }
        debug!(platform = %release.id, path = %dst.display(), "platform installed");
        Ok(())
    }

    fn uninstall_platform(&self, id: &PlatformId) -> Result<()> {
        let existed = remove_installed_tree(
            &self.layout,
            &self.layout.platform_dir(id),
            &self.layout.platform_receipt_path(id),
        )
        .with_context(|| format!("failed to uninstall platform {id}"))?;
        if !existed {
            warn!(platform = %id, "platform files were already missing; removed receipt");
        }
        Ok(())
    }

    fn run_post_install_script(&self, id: &PlatformId) -> Result<()> {
        post_install::run_post_install_script(&self.layout.platform_dir(id))
    }

    fn rescan(&self) -> Result<()> {
        let platforms = read_platform_receipts(&self.layout)?;
        let tools = read_tool_receipts(&self.layout)?;

        let mut stale_platforms = 0_usize;
        for receipt in &platforms {
            let id = receipt.platform_id()?;
            if !self.layout.platform_dir(&id).is_dir() {
                warn!(platform = %id, "install receipt without files; dropping it");
                remove_stale_receipt(&self.layout.platform_receipt_path(&id))?;
                stale_platforms += 1;
            }
        }
        let mut stale_tools = 0_usize;
        for receipt in &tools {
            let id = receipt.tool_id()?;
            if !self.layout.tool_dir(&id).is_dir() {
                warn!(tool = %id, "install receipt without files; dropping it");
                remove_stale_receipt(&self.layout.tool_receipt_path(&id))?;
                stale_tools += 1;
            }
        }

        info!(
            platforms = platforms.len() - stale_platforms,
            tools = tools.len() - stale_tools,
            "rescanned installed packages"
        );
        Ok(())
    }
}
