use anyhow::{anyhow, Context, Result};
use boardkit_core::ArchiveType;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::fs_utils::remove_dir_if_exists;
use crate::layout::PrefixLayout;
use crate::receipts::current_unix_timestamp;

static TMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Extracts `archive_path` into `dst`, replacing whatever is there.
///
/// Packaged platforms and tools wrap their payload in a single top-level
/// directory; that directory is stripped so `dst` holds the payload itself.
pub fn install_from_artifact(
    layout: &PrefixLayout,
    archive_path: &Path,
    archive_type: ArchiveType,
    dst: &Path,
) -> Result<PathBuf> {
    let install_tmp = make_tmp_dir(layout, "install")?;
    let result = stage_and_move(&install_tmp, archive_path, archive_type, dst);
    let _ = fs::remove_dir_all(&install_tmp);
    result
}

fn stage_and_move(
    install_tmp: &Path,
    archive_path: &Path,
    archive_type: ArchiveType,
    dst: &Path,
) -> Result<PathBuf> {
    let raw_dir = install_tmp.join("raw");
    let staged_dir = install_tmp.join("staged");
    fs::create_dir_all(&raw_dir)
        .with_context(|| format!("failed to create {}", raw_dir.display()))?;
    fs::create_dir_all(&staged_dir)
        .with_context(|| format!("failed to create {}", staged_dir.display()))?;

    extract_archive(archive_path, &raw_dir, archive_type)?;

    let strip_components = single_root_strip_components(&raw_dir)?;
    if copy_tree(&raw_dir, &staged_dir, strip_components)? == 0 {
        return Err(anyhow!(
            "no files copied during extraction; archive appears to be empty"
        ));
    }

    remove_dir_if_exists(dst)
        .with_context(|| format!("failed to remove existing install dir: {}", dst.display()))?;

    move_dir_or_copy(&staged_dir, dst)?;
    Ok(dst.to_path_buf())
}

pub(crate) fn make_tmp_dir(layout: &PrefixLayout, prefix: &str) -> Result<PathBuf> {
    let mut dir = layout.tmp_state_dir();
    dir.push(format!(
        "{}-{}-{}-{}",
        prefix,
        std::process::id(),
        current_unix_timestamp()?,
        TMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed creating tmp dir: {}", dir.display()))?;
    Ok(dir)
}

fn extract_archive(archive_path: &Path, dst: &Path, archive_type: ArchiveType) -> Result<()> {
    if archive_type.is_tar() {
        return run_command(
            Command::new("tar").arg("-xf").arg(archive_path).arg("-C").arg(dst),
            "failed to extract tar archive",
        )
        .map(drop);
    }

    // Zip: PowerShell on Windows, then unzip, then whatever `tar` understands.
    let mut attempts = Vec::new();
    if cfg!(windows) {
        let mut powershell = Command::new("powershell");
        powershell.arg("-NoProfile").arg("-Command").arg(format!(
            "Expand-Archive -LiteralPath '{}' -DestinationPath '{}' -Force",
            ps_quote(archive_path),
            ps_quote(dst)
        ));
        attempts.push(powershell);
    }
    let mut unzip = Command::new("unzip");
    unzip.arg("-q").arg(archive_path).arg("-d").arg(dst);
    attempts.push(unzip);
    let mut tar = Command::new("tar");
    tar.arg("-xf").arg(archive_path).arg("-C").arg(dst);
    attempts.push(tar);

    let mut last_error = None;
    for mut command in attempts {
        let program = command.get_program().to_string_lossy().into_owned();
        match run_command(&mut command, &format!("failed to extract zip archive with {program}")) {
            Ok(_) => return Ok(()),
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("no zip extractor available")))
}

/// Runs `command` to completion, turning a spawn failure or non-zero exit into
/// an error that carries the captured output.
pub(crate) fn run_command(command: &mut Command, context_message: &str) -> Result<Output> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(output);
    }

    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        String::from_utf8_lossy(&output.stdout).trim(),
        String::from_utf8_lossy(&output.stderr).trim()
    ))
}

/// Moves `src` to `dst`, copying across filesystems when a rename is refused.
pub(crate) fn move_dir_or_copy(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create install parent: {}", parent.display()))?;
    }
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;
    copy_tree(src, dst, 0)?;
    fs::remove_dir_all(src)
        .with_context(|| format!("failed to cleanup staging dir: {}", src.display()))
}

/// Returns 1 when the extracted tree is a single directory, 0 otherwise.
fn single_root_strip_components(raw_dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(raw_dir)
        .with_context(|| format!("failed to read {}", raw_dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list {}", raw_dir.display()))?;
    match entries.as_slice() {
        [only] => Ok(usize::from(only.file_type()?.is_dir())),
        _ => Ok(0),
    }
}

/// Copies every file and symlink under `src_root` into `dst_root`, dropping
/// the first `strip_components` path segments. Returns the number of entries
/// written.
fn copy_tree(src_root: &Path, dst_root: &Path, strip_components: usize) -> Result<usize> {
    let mut copied = 0_usize;
    let mut pending = vec![src_root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))? {
            let path = entry?.path();
            let file_type = fs::symlink_metadata(&path)
                .with_context(|| format!("failed to stat {}", path.display()))?
                .file_type();
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }

            let rel = path
                .strip_prefix(src_root)
                .with_context(|| format!("failed to relativize {}", path.display()))?;
            let Some(rel) = strip_rel_components(rel, strip_components) else {
                continue;
            };
            let target = dst_root.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            copy_entry(&path, &target, file_type.is_symlink())?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_entry(src: &Path, dst: &Path, is_symlink: bool) -> Result<()> {
    #[cfg(unix)]
    if is_symlink {
        let target = fs::read_link(src)
            .with_context(|| format!("failed to read symlink {}", src.display()))?;
        return std::os::unix::fs::symlink(&target, dst).with_context(|| {
            format!("failed to create symlink {} -> {}", dst.display(), target.display())
        });
    }
    #[cfg(not(unix))]
    let _ = is_symlink;

    fs::copy(src, dst)
        .map(drop)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))
}

/// Drops the first `strip_components` normal segments of a relative path,
/// or `None` when nothing would remain.
pub(crate) fn strip_rel_components(path: &Path, strip_components: usize) -> Option<PathBuf> {
    let rest: PathBuf = path
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .skip(strip_components)
        .collect();
    (!rest.as_os_str().is_empty()).then_some(rest)
}

fn ps_quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "''")
}
