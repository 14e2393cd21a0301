use crate::error::{InstallerError, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use zip::result::ZipError;

/// Result of unpacking an archive: where it went and which top-level
/// folder wraps its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTree {
    pub root: PathBuf,
    pub wrapper: String,
}

/// Unpack the wrapper folder of the zip at `archive_path` into `dest`,
/// creating `dest` if needed.
///
/// `expected_wrapper` is used when the archive has a top-level folder of
/// that name; other top-level entries (`__MACOSX/` and the like) are
/// skipped. Otherwise the archive must hold exactly one top-level folder,
/// which is used with a warning. The wrapper is settled before anything
/// is written.
pub fn extract_archive(
    archive_path: &Path,
    dest: &Path,
    expected_wrapper: &str,
) -> Result<ExtractedTree> {
    tracing::info!(
        "Extracting {} into {}...",
        archive_path.display(),
        dest.display()
    );

    let invalid = |source: ZipError| InstallerError::InvalidArchive {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = fs::File::open(archive_path).map_err(|e| invalid(ZipError::Io(e)))?;
    let mut archive = zip::ZipArchive::new(file).map_err(invalid)?;

    let wrapper = find_wrapper(archive.file_names(), expected_wrapper).ok_or_else(|| {
        InstallerError::MissingWrapper {
            path: archive_path.to_path_buf(),
        }
    })?;

    if wrapper != expected_wrapper {
        tracing::warn!(
            "Archive folder is '{}' rather than '{}', unpacking it anyway",
            wrapper,
            expected_wrapper
        );
    }

    fs::create_dir_all(dest).map_err(|e| InstallerError::io(dest, e))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(invalid)?;

        let relative = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                tracing::warn!("Skipping unsafe path in archive: {}", entry.name());
                continue;
            }
        };

        if top_level(&relative).as_deref() != Some(wrapper.as_str()) {
            tracing::debug!("Skipping {} outside '{}'", relative.display(), wrapper);
            continue;
        }

        let outpath = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| InstallerError::io(&outpath, e))?;
            continue;
        }

        // Decompress fully first so a bad CRC or deflate stream is blamed
        // on the archive, not on the file being written.
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| invalid(ZipError::Io(e)))?;

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallerError::io(parent, e))?;
        }
        fs::write(&outpath, &contents).map_err(|e| InstallerError::io(&outpath, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))
                    .map_err(|e| InstallerError::io(&outpath, e))?;
            }
        }
    }

    Ok(ExtractedTree {
        root: dest.to_path_buf(),
        wrapper,
    })
}

fn top_level(relative: &Path) -> Option<String> {
    match relative.components().next() {
        Some(Component::Normal(first)) => Some(first.to_string_lossy().to_string()),
        _ => None,
    }
}

/// Pick the folder to unpack from the archive's entry names.
fn find_wrapper<'a>(names: impl Iterator<Item = &'a str>, expected: &str) -> Option<String> {
    let mut folders = BTreeSet::new();
    let mut loose_files = false;

    for name in names {
        let relative = Path::new(name);
        let Some(first) = top_level(relative) else {
            continue;
        };
        if relative.components().count() > 1 || name.ends_with('/') {
            folders.insert(first);
        } else {
            loose_files = true;
        }
    }

    if folders.contains(expected) {
        return Some(expected.to_string());
    }

    match (folders.len(), loose_files) {
        (1, false) => folders.into_iter().next(),
        _ => None,
    }
}
