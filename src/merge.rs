//! Flattening of the archive's wrapper folder into the target directory.
//!
//! The merge is destructive and not atomic. If a filesystem call fails
//! partway, the files moved so far stay in the target, the rest stay
//! under the staging folder, and nothing is rolled back.

use crate::error::{InstallerError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Move everything under `root/<wrapper>` up into `root`, then delete the
/// emptied wrapper folder.
pub fn merge_up(root: &Path, wrapper: &str) -> Result<()> {
    let wrapper_path = root.join(wrapper);

    // Get the wrapper out of the way first so a child with the same name
    // can be moved into `root` without landing on its own source.
    let staging = root.join(format!(".octo-merge-{}", std::process::id()));
    fs::rename(&wrapper_path, &staging).map_err(|e| InstallerError::io(&wrapper_path, e))?;

    tracing::debug!(
        "Merging {} into {}",
        wrapper_path.display(),
        root.display()
    );

    let moved = merge_tree(&staging, root)?;
    tracing::info!("Moved {} files out of '{}'", moved, wrapper);
    Ok(())
}

/// Move the contents of `source` into `dest` and remove `source`.
///
/// Directories are walked with an explicit worklist so arbitrarily deep
/// trees don't grow the call stack. Returns the number of files moved.
pub fn merge_tree(source: &Path, dest: &Path) -> Result<usize> {
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(source.to_path_buf(), dest.to_path_buf())];
    let mut visited: Vec<PathBuf> = Vec::new();
    let mut moved = 0;

    while let Some((src_dir, dst_dir)) = pending.pop() {
        fs::create_dir_all(&dst_dir).map_err(|e| InstallerError::io(&dst_dir, e))?;

        let entries = fs::read_dir(&src_dir).map_err(|e| InstallerError::io(&src_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| InstallerError::io(&src_dir, e))?;
            let from = entry.path();
            let to = dst_dir.join(entry.file_name());
            let file_type = entry.file_type().map_err(|e| InstallerError::io(&from, e))?;

            if file_type.is_dir() {
                pending.push((from, to));
            } else {
                move_file(&from, &to)?;
                moved += 1;
            }
        }

        visited.push(src_dir);
    }

    // A directory is always visited after its parent, so walking the list
    // backwards removes children first.
    for dir in visited.iter().rev() {
        fs::remove_dir(dir).map_err(|e| InstallerError::io(dir, e))?;
    }

    Ok(moved)
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Err(e) = fs::rename(from, to) {
        tracing::debug!(
            "rename {} -> {} failed ({}), copying instead",
            from.display(),
            to.display(),
            e
        );
        fs::copy(from, to).map_err(|e| InstallerError::io(to, e))?;
        fs::remove_file(from).map_err(|e| InstallerError::io(from, e))?;
    }
    Ok(())
}
