use anyhow::{Context, Result};
use boardkit_core::{DownloadResource, PlatformId, PlatformRelease, ToolId, ToolRelease};
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::PrefixLayout;
use crate::{InstallReceipt, ReceiptKind};

pub fn current_unix_timestamp() -> Result<u64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}

pub fn platform_receipt(release: &PlatformRelease) -> Result<InstallReceipt> {
    receipt_for(
        ReceiptKind::Platform,
        &release.id.package,
        &release.id.architecture,
        &release.id.version.to_string(),
        &release.resource,
    )
}

pub fn tool_receipt(tool: &ToolRelease) -> Result<InstallReceipt> {
    receipt_for(
        ReceiptKind::Tool,
        &tool.id.packager,
        &tool.id.name,
        &tool.id.version.to_string(),
        &tool.resource,
    )
}

fn receipt_for(
    kind: ReceiptKind,
    packager: &str,
    name: &str,
    version: &str,
    resource: &DownloadResource,
) -> Result<InstallReceipt> {
    Ok(InstallReceipt {
        kind,
        packager: packager.to_string(),
        name: name.to_string(),
        version: version.to_string(),
        archive_file_name: Some(resource.archive_file_name.clone()),
        checksum: Some(resource.checksum.clone()),
        installed_at_unix: current_unix_timestamp()?,
    })
}

pub fn write_install_receipt(layout: &PrefixLayout, receipt: &InstallReceipt) -> Result<PathBuf> {
    let mut payload = String::new();
    payload.push_str(&format!("kind={}\n", receipt.kind.as_str()));
    payload.push_str(&format!("packager={}\n", receipt.packager));
    match receipt.kind {
        ReceiptKind::Platform => payload.push_str(&format!("architecture={}\n", receipt.name)),
        ReceiptKind::Tool => payload.push_str(&format!("name={}\n", receipt.name)),
    }
    payload.push_str(&format!("version={}\n", receipt.version));
    if let Some(archive_file_name) = &receipt.archive_file_name {
        payload.push_str(&format!("archive_file_name={}\n", archive_file_name));
    }
    if let Some(checksum) = &receipt.checksum {
        payload.push_str(&format!("checksum={}\n", checksum));
    }
    payload.push_str(&format!(
        "installed_at_unix={}\n",
        receipt.installed_at_unix
    ));

    let path = receipt_path(layout, receipt)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, payload.as_bytes())
        .with_context(|| format!("failed to write install receipt: {}", path.display()))?;
    Ok(path)
}

pub fn receipt_path(layout: &PrefixLayout, receipt: &InstallReceipt) -> Result<PathBuf> {
    Ok(match receipt.kind {
        ReceiptKind::Platform => layout.platform_receipt_path(&receipt.platform_id()?),
        ReceiptKind::Tool => layout.tool_receipt_path(&receipt.tool_id()?),
    })
}

pub fn read_platform_receipts(layout: &PrefixLayout) -> Result<Vec<InstallReceipt>> {
    read_receipts_in(&layout.platform_receipts_dir(), ReceiptKind::Platform)
}

pub fn read_tool_receipts(layout: &PrefixLayout) -> Result<Vec<InstallReceipt>> {
    read_receipts_in(&layout.tool_receipts_dir(), ReceiptKind::Tool)
}

pub fn read_platform_receipt(
    layout: &PrefixLayout,
    id: &PlatformId,
) -> Result<Option<InstallReceipt>> {
    read_receipt_file(&layout.platform_receipt_path(id))
}

pub fn read_tool_receipt(layout: &PrefixLayout, id: &ToolId) -> Result<Option<InstallReceipt>> {
    read_receipt_file(&layout.tool_receipt_path(id))
}

fn read_receipt_file(path: &Path) -> Result<Option<InstallReceipt>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read install receipt: {}", path.display()))?;
    let receipt = parse_receipt(&raw)
        .with_context(|| format!("failed to parse install receipt: {}", path.display()))?;
    Ok(Some(receipt))
}

fn read_receipts_in(dir: &Path, kind: ReceiptKind) -> Result<Vec<InstallReceipt>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut receipts = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("failed to read install state directory: {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|v| v.to_str()) != Some("receipt") {
            continue;
        }

        let Some(receipt) = read_receipt_file(&path)? else {
            continue;
        };
        if receipt.kind != kind {
            anyhow::bail!(
                "install receipt {} has kind '{}' but is stored with {} receipts",
                path.display(),
                receipt.kind.as_str(),
                kind.as_str()
            );
        }
        receipts.push(receipt);
    }

    receipts.sort_by(|a, b| {
        (&a.packager, &a.name, &a.version).cmp(&(&b.packager, &b.name, &b.version))
    });
    Ok(receipts)
}

pub(crate) fn parse_receipt(raw: &str) -> Result<InstallReceipt> {
    let mut kind = None;
    let mut packager = None;
    let mut name = None;
    let mut version = None;
    let mut archive_file_name = None;
    let mut checksum = None;
    let mut installed_at_unix = None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        match k {
            "kind" => kind = Some(ReceiptKind::parse(v)?),
            "packager" => packager = Some(v.to_string()),
            "architecture" | "name" => name = Some(v.to_string()),
            "version" => version = Some(v.to_string()),
            "archive_file_name" => archive_file_name = Some(v.to_string()),
            "checksum" => checksum = Some(v.to_string()),
            "installed_at_unix" => {
                installed_at_unix = Some(v.parse().context("installed_at_unix must be u64")?)
            }
            _ => {}
        }
    }

    Ok(InstallReceipt {
        kind: kind.context("missing kind")?,
        packager: packager.context("missing packager")?,
        name: name.context("missing architecture or name")?,
        version: version.context("missing version")?,
        archive_file_name,
        checksum,
        installed_at_unix: installed_at_unix.context("missing installed_at_unix")?,
    })
}
