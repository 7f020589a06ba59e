use anyhow::Result;
use boardkit_core::{PlatformManifest, PlatformRelease, ToolId, ToolManifest, ToolRelease};
use boardkit_index::PlatformIndex;

/// Release lookups the resolver needs from an index.
pub trait ReleaseSource {
    fn platform_versions(&self, packager: &str, architecture: &str)
        -> Result<Vec<PlatformManifest>>;

    fn tool_release(&self, id: &ToolId) -> Result<Option<ToolManifest>>;
}

impl ReleaseSource for PlatformIndex {
    fn platform_versions(
        &self,
        packager: &str,
        architecture: &str,
    ) -> Result<Vec<PlatformManifest>> {
        PlatformIndex::platform_versions(self, packager, architecture)
    }

    fn tool_release(&self, id: &ToolId) -> Result<Option<ToolManifest>> {
        PlatformIndex::tool_release(self, id)
    }
}

/// A platform release together with the tools it requires, in the order the
/// platform declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlatform {
    pub platform: PlatformRelease,
    pub tools: Vec<ToolRelease>,
}
