use anyhow::{anyhow, Context, Result};
use semver::Version;

/// Parses a release version, accepting the short `MAJOR` and `MAJOR.MINOR`
/// forms packagers commonly publish by padding the missing components with
/// zeros.
pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("version must not be empty"));
    }
    if let Ok(version) = Version::parse(trimmed) {
        return Ok(version);
    }

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let components = core.split('.').collect::<Vec<_>>();
    if components.len() >= 3
        || components
            .iter()
            .any(|part| part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()))
    {
        return Err(anyhow!("invalid version '{trimmed}'"));
    }

    let mut padded = components.join(".");
    for _ in components.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    Version::parse(&padded).with_context(|| format!("invalid version '{trimmed}'"))
}
