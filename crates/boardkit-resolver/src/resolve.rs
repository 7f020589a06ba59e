use boardkit_core::{PlatformManifest, PlatformReference, ToolRelease};
use semver::Version;
use tracing::debug;

use crate::error::ResolveError;
use crate::types::{ReleaseSource, ResolvedPlatform};

/// `None` selects the highest version.
pub fn select_release<'a>(
    candidates: &'a [PlatformManifest],
    version: Option<&Version>,
) -> Option<&'a PlatformManifest> {
    match version {
        Some(version) => candidates.iter().find(|m| &m.version == version),
        None => candidates.iter().max_by(|a, b| a.version.cmp(&b.version)),
    }
}

pub fn find_platform_release_dependencies<S: ReleaseSource + ?Sized>(
    source: &S,
    reference: &PlatformReference,
    host: &str,
) -> Result<ResolvedPlatform, ResolveError> {
    let candidates = source
        .platform_versions(&reference.package, &reference.architecture)
        .map_err(|err| {
            ResolveError::index(
                format!("failed loading releases of {reference}"),
                err,
            )
        })?;
    if candidates.is_empty() {
        return Err(ResolveError::dependencies(format!(
            "platform {}:{} not found",
            reference.package, reference.architecture
        )));
    }

    let Some(selected) = select_release(&candidates, reference.version.as_ref()) else {
        return Err(ResolveError::InvalidVersion {
            package: reference.package.clone(),
            architecture: reference.architecture.clone(),
            version: reference
                .version
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        });
    };

    let platform = selected.to_release();
    let mut tools = Vec::with_capacity(platform.required_tools.len());
    for tool_id in &platform.required_tools {
        let manifest = source
            .tool_release(tool_id)
            .map_err(|err| {
                ResolveError::index(format!("failed loading tool {tool_id}"), err)
            })?
            .ok_or_else(|| {
                ResolveError::dependencies(format!(
                    "tool {tool_id} required by {} not found",
                    platform.id
                ))
            })?;
        let system = manifest.system_for_host(host).ok_or_else(|| {
            ResolveError::dependencies(format!(
                "tool {tool_id} required by {} is not available for host {host}",
                platform.id
            ))
        })?;
        tools.push(ToolRelease {
            id: tool_id.clone(),
            resource: system.resource(),
        });
    }

    debug!(platform = %platform.id, tools = tools.len(), "resolved platform dependencies");
    Ok(ResolvedPlatform { platform, tools })
}
