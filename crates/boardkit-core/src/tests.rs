use semver::Version;

use super::*;

const SHA: &str = "SHA-256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

fn version(raw: &str) -> Version {
    Version::parse(raw).expect("valid version")
}

#[test]
fn parse_reference_without_version() {
    let reference = PlatformReference::parse("arduino:samd").expect("must parse");
    assert_eq!(reference.package, "arduino");
    assert_eq!(reference.architecture, "samd");
    assert!(reference.version.is_none());
    assert_eq!(reference.to_string(), "arduino:samd");
}

#[test]
fn parse_reference_with_version() {
    let reference = PlatformReference::parse("arduino:samd@1.6.9").expect("must parse");
    assert_eq!(reference.version, Some(version("1.6.9")));
    assert_eq!(reference.to_string(), "arduino:samd@1.6.9");
}

#[test]
fn parse_reference_pads_short_versions() {
    let reference = PlatformReference::parse("esp8266:esp8266@2.5").expect("must parse");
    assert_eq!(reference.version, Some(version("2.5.0")));
}

#[test]
fn parse_reference_rejects_missing_architecture() {
    let err = PlatformReference::parse("arduino").expect_err("must reject");
    assert!(
        err.to_string().contains("expected PACKAGER:ARCH[@VERSION]"),
        "unexpected error: {err}"
    );
}

#[test]
fn parse_reference_rejects_empty_segments() {
    assert!(PlatformReference::parse(":samd").is_err());
    assert!(PlatformReference::parse("arduino:").is_err());
    assert!(PlatformReference::parse("arduino:samd:extra").is_err());
    assert!(PlatformReference::parse("arduino:sa/md").is_err());
}

#[test]
fn parse_reference_rejects_bad_version() {
    let err = PlatformReference::parse("arduino:samd@one.two").expect_err("must reject");
    assert!(
        err.to_string().contains("invalid version in 'arduino:samd@one.two'"),
        "unexpected error: {err}"
    );
    assert!(PlatformReference::parse("arduino:samd@").is_err());
}

#[test]
fn parse_reference_args_fails_on_first_bad_item() {
    let parsed = parse_reference_args(&["arduino:avr", "arduino:samd@1.8.9"]).expect("must parse");
    assert_eq!(parsed.len(), 2);

    assert!(parse_reference_args(&["arduino:avr", "broken"]).is_err());
}

#[test]
fn parse_version_keeps_prerelease_when_padding() {
    assert_eq!(
        parse_version("1.2-rc1").expect("must parse"),
        version("1.2.0-rc1")
    );
    assert!(parse_version("1.2.3.4").is_err());
}

#[test]
fn infer_archive_types() {
    assert_eq!(
        ArchiveType::infer_from_file_name("samd-1.8.9.tar.bz2"),
        Some(ArchiveType::TarBz2)
    );
    assert_eq!(
        ArchiveType::infer_from_file_name("bossac-1.9.1.TGZ"),
        Some(ArchiveType::TarGz)
    );
    assert_eq!(
        ArchiveType::infer_from_file_name("openocd.zip?token=1"),
        Some(ArchiveType::Zip)
    );
    assert_eq!(ArchiveType::infer_from_file_name("tool.exe"), None);
    assert_eq!(ArchiveType::parse("TXZ"), Some(ArchiveType::TarXz));
}

#[test]
fn download_resource_checksum_parsing() {
    let resource = DownloadResource {
        url: "https://example.test/samd.tar.bz2".to_string(),
        archive_file_name: "samd.tar.bz2".to_string(),
        checksum: SHA.to_string(),
        size: None,
    };
    assert_eq!(
        resource.sha256_hex().expect("must parse"),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );

    let md5 = DownloadResource {
        checksum: "MD5:abc".to_string(),
        ..resource.clone()
    };
    assert!(md5.sha256_hex().is_err());

    let short = DownloadResource {
        checksum: "SHA-256:abc".to_string(),
        ..resource
    };
    assert!(short.sha256_hex().is_err());
}

#[test]
fn parse_platform_manifest_and_dedupe_tools() {
    let content = format!(
        r#"
packager = "arduino"
architecture = "samd"
version = "1.8.9"
name = "Arduino SAMD Boards (32-bits ARM Cortex-M0+)"

[resource]
url = "https://downloads.example.test/cores/samd-1.8.9.tar.bz2"
archive_file_name = "samd-1.8.9.tar.bz2"
checksum = "{SHA}"
size = 1024

[[tool_dependencies]]
packager = "arduino"
name = "arm-none-eabi-gcc"
version = "7.2.1"

[[tool_dependencies]]
packager = "arduino"
name = "bossac"
version = "1.9.1"

[[tool_dependencies]]
packager = "arduino"
name = "arm-none-eabi-gcc"
version = "7.2.1"
"#
    );

    let manifest = PlatformManifest::from_toml_str(&content).expect("manifest should parse");
    assert_eq!(manifest.id().to_string(), "arduino:samd@1.8.9");
    assert_eq!(manifest.resource.size, Some(1024));

    let release = manifest.to_release();
    let tools = release
        .required_tools
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(
        tools,
        vec!["arduino:arm-none-eabi-gcc@7.2.1", "arduino:bossac@1.9.1"]
    );
}

#[test]
fn platform_manifest_rejects_unknown_archive() {
    let content = format!(
        r#"
packager = "arduino"
architecture = "samd"
version = "1.8.9"
name = "SAMD"

[resource]
url = "https://downloads.example.test/samd.rar"
archive_file_name = "samd.rar"
checksum = "{SHA}"
"#
    );

    let err = PlatformManifest::from_toml_str(&content).expect_err("must reject");
    assert!(
        format!("{err:#}").contains("unsupported archive 'samd.rar'"),
        "unexpected error: {err:#}"
    );
}

#[test]
fn parse_tool_manifest_and_select_host() {
    let content = format!(
        r#"
packager = "arduino"
name = "bossac"
version = "1.9.1"

[[systems]]
host = "x86_64-unknown-linux-gnu"
url = "https://downloads.example.test/bossac-linux64.tar.gz"
archive_file_name = "bossac-1.9.1-linux64.tar.gz"
checksum = "{SHA}"

[[systems]]
host = "*"
url = "https://downloads.example.test/bossac-any.zip"
archive_file_name = "bossac-1.9.1-any.zip"
checksum = "{SHA}"
"#
    );

    let manifest = ToolManifest::from_toml_str(&content).expect("manifest should parse");
    assert_eq!(manifest.id().to_string(), "arduino:bossac@1.9.1");
    assert_eq!(
        manifest
            .system_for_host("x86_64-unknown-linux-gnu")
            .map(|system| system.archive_file_name.as_str()),
        Some("bossac-1.9.1-linux64.tar.gz")
    );
    assert_eq!(
        manifest
            .system_for_host("aarch64-apple-darwin")
            .map(|system| system.host.as_str()),
        Some("*")
    );
}

#[test]
fn tool_manifest_rejects_duplicate_hosts() {
    let content = format!(
        r#"
packager = "arduino"
name = "bossac"
version = "1.9.1"

[[systems]]
host = "x86_64-unknown-linux-gnu"
url = "https://downloads.example.test/a.tar.gz"
archive_file_name = "a.tar.gz"
checksum = "{SHA}"

[[systems]]
host = "x86_64-unknown-linux-gnu"
url = "https://downloads.example.test/b.tar.gz"
archive_file_name = "b.tar.gz"
checksum = "{SHA}"
"#
    );

    let err = ToolManifest::from_toml_str(&content).expect_err("must reject");
    assert!(
        err.to_string()
            .contains("duplicate system 'x86_64-unknown-linux-gnu'"),
        "unexpected error: {err}"
    );
}

#[test]
fn host_triple_is_never_empty() {
    assert!(!host_target_triple().is_empty());
}
