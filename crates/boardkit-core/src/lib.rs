mod archive;
mod host;
mod manifest;
mod reference;
mod release;
mod version;

pub use archive::ArchiveType;
pub use host::host_target_triple;
pub use manifest::{PlatformManifest, ToolDependency, ToolManifest, ToolSystem};
pub use reference::{parse_reference_args, PlatformReference};
pub use release::{DownloadResource, PlatformId, PlatformRelease, ToolId, ToolRelease};
pub use version::parse_version;

#[cfg(test)]
mod tests;
