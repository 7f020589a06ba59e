use std::fs;
use std::io;
use std::path::Path;

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// Removes empty parents of an already deleted `dir`, stopping below `stop_at`.
pub fn prune_empty_parents(dir: &Path, stop_at: &Path) {
    let mut current = dir.parent();
    while let Some(parent) = current {
        if parent == stop_at || !parent.starts_with(stop_at) {
            break;
        }
        if fs::remove_dir(parent).is_err() {
            break;
        }
        current = parent.parent();
    }
}
