//! Local path resolution.
//!
//! The local root is resolved once per run. Each manifest entry's relative
//! path is then sanitized and joined onto it. Leading separators are stripped,
//! and any entry that would leave the root (`..` segments, drive prefixes) is
//! rejected outright rather than silently confined.

use std::path::{Component, Path, PathBuf};

use crate::error::{SyncError, SyncResult};

/// Resolve the local root directory.
///
/// An absolute `folder` is used verbatim; a relative one is joined onto
/// `app_dir` (the directory containing the running application). The result
/// is lexically normalized.
pub fn resolve_root(folder: &Path, app_dir: &Path) -> PathBuf {
    if folder.is_absolute() {
        normalize(folder)
    } else {
        normalize(&app_dir.join(folder))
    }
}

/// Directory containing the running executable.
pub fn application_dir() -> SyncResult<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| SyncError::Config(format!("cannot locate running executable: {}", e)))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| SyncError::Config(format!("executable has no parent: {}", exe.display())))
}

/// Sanitize a manifest-relative path.
///
/// Backslashes are treated as separators, leading separators and `.`
/// segments are dropped. Returns [`SyncError::UnsafePath`] for `..` segments,
/// drive or root prefixes, and paths that name the root itself.
pub fn sanitize_relative(relative: &str) -> SyncResult<PathBuf> {
    let unsafe_path = || SyncError::UnsafePath {
        path: relative.to_string(),
    };

    let unified = relative.replace('\\', "/");
    let mut sanitized = PathBuf::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(unsafe_path()),
            name => {
                let mut components = Path::new(name).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(part)), None) => sanitized.push(part),
                    _ => return Err(unsafe_path()),
                }
            }
        }
    }

    if sanitized.as_os_str().is_empty() {
        return Err(unsafe_path());
    }

    Ok(sanitized)
}

/// Resolve the local path of a manifest entry under `root`.
pub fn resolve_entry(root: &Path, relative: &str) -> SyncResult<PathBuf> {
    Ok(root.join(sanitize_relative(relative)?))
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
///
/// `..` components that would climb above the start of a relative path are
/// kept; at the root of an absolute path they are dropped.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}
