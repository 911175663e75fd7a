//! Server-side manifest generation.
//!
//! Scans a client directory and produces the two manifests a server
//! publishes: `fullcheck.json` listing every file, and `update.json` listing
//! only files under the update prefix.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use patchsync::publisher::ManifestGenerator;
//!
//! let generator = ManifestGenerator::new("http://host/l2updater/client");
//! let manifests = generator.scan(Path::new("client"))?;
//! let written = manifests.write(Path::new("."))?;
//! # Ok::<(), patchsync::SyncError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};
use crate::integrity::{calculate_file_checksum, HashAlgorithm};
use crate::manifest::{FileEntry, Manifest};

/// Output file name of the full manifest.
pub const FULLCHECK_FILENAME: &str = "fullcheck.json";

/// Output file name of the update manifest.
pub const UPDATE_FILENAME: &str = "update.json";

/// Default prefix selecting files for the update manifest.
pub const DEFAULT_UPDATE_PREFIX: &str = "system_en/";

const IGNORED_PREFIXES: [&str; 2] = [".git/", ".svn/"];
const IGNORED_FILES: [&str; 3] = [".DS_Store", "Thumbs.db", "web.config"];

/// Whether a relative path is left out of generated manifests.
pub fn should_ignore(relative: &str) -> bool {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return true;
    }

    if IGNORED_PREFIXES.iter().any(|p| relative.starts_with(p)) {
        return true;
    }

    let file_name = relative.rsplit('/').next().unwrap_or(relative);
    IGNORED_FILES.contains(&file_name)
}

/// Percent-encode each segment of a `/`-separated path.
pub fn encode_url_path(relative: &str) -> String {
    relative
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds manifests from a directory tree.
#[derive(Debug, Clone)]
pub struct ManifestGenerator {
    base_url: String,
    update_prefix: String,
}

/// The pair of manifests produced by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedManifests {
    /// Every file of the client directory.
    pub fullcheck: Manifest,
    /// Files under the update prefix.
    pub update: Manifest,
}

impl ManifestGenerator {
    /// Create a generator publishing files under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            update_prefix: DEFAULT_UPDATE_PREFIX.to_string(),
        }
    }

    /// Select files for the update manifest by path prefix.
    pub fn with_update_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.update_prefix = prefix.into().trim_start_matches('/').to_string();
        self
    }

    /// Base URL files are published under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Scan `client_dir` and build both manifests.
    ///
    /// Entries are sorted by path. Files whose hash cannot be computed are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if `client_dir` is not a directory and
    /// [`SyncError::Io`] if it cannot be walked.
    pub fn scan(&self, client_dir: &Path) -> SyncResult<GeneratedManifests> {
        if !client_dir.is_dir() {
            return Err(SyncError::Config(format!(
                "client directory not found: {}",
                client_dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(client_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| client_dir.to_path_buf());
                SyncError::io(path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match relative_path(client_dir, entry.path()) {
                Some(relative) => relative,
                None => continue,
            };
            if should_ignore(&relative) {
                continue;
            }

            let sha1 = match calculate_file_checksum(entry.path(), HashAlgorithm::Sha1) {
                Ok(sha1) => sha1,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

            files.push(
                FileEntry::new(relative.clone())
                    .with_url(self.file_url(&relative))
                    .with_hash(sha1)
                    .with_size(size),
            );
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(files = files.len(), "Client directory scanned");

        let update = files
            .iter()
            .filter(|f| f.path.starts_with(&self.update_prefix))
            .cloned()
            .collect();

        Ok(GeneratedManifests {
            fullcheck: self.manifest(files),
            update: self.manifest(update),
        })
    }

    fn file_url(&self, relative: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            encode_url_path(relative)
        )
    }

    fn manifest(&self, files: Vec<FileEntry>) -> Manifest {
        Manifest {
            base_url: Some(self.base_url.clone()),
            files,
        }
    }
}

impl GeneratedManifests {
    /// Write both manifests into `output_dir`, returning the written paths.
    pub fn write(&self, output_dir: &Path) -> SyncResult<Vec<PathBuf>> {
        fs::create_dir_all(output_dir).map_err(|e| SyncError::io(output_dir, e))?;

        let mut written = Vec::with_capacity(2);
        for (name, manifest) in [
            (FULLCHECK_FILENAME, &self.fullcheck),
            (UPDATE_FILENAME, &self.update),
        ] {
            let path = output_dir.join(name);
            fs::write(&path, manifest.to_json_pretty()).map_err(|e| SyncError::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// `path` relative to `root` with `/` separators.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn client_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("system_en")).unwrap();
        fs::create_dir_all(root.join("maps")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join("system_en/l2.ini"), b"hello world").unwrap();
        fs::write(root.join("maps/a b.unr"), [1, 2, 3]).unwrap();
        fs::write(root.join(".git/objects/x"), b"git").unwrap();
        fs::write(root.join("maps/Thumbs.db"), b"thumb").unwrap();
        temp
    }

    #[test]
    fn test_should_ignore() {
        assert!(should_ignore(".git/config"));
        assert!(should_ignore("/.svn/entries"));
        assert!(should_ignore("textures/.DS_Store"));
        assert!(should_ignore("web.config"));
        assert!(should_ignore(""));
        assert!(!should_ignore("system_en/l2.ini"));
        assert!(!should_ignore("legit/.gitignore"));
    }

    #[test]
    fn test_encode_url_path_per_segment() {
        assert_eq!(encode_url_path("maps/a b.unr"), "maps/a%20b.unr");
        assert_eq!(encode_url_path("system_en/l2.ini"), "system_en/l2.ini");
    }

    #[test]
    fn test_scan_builds_sorted_manifests() {
        let temp = client_tree();
        let generator = ManifestGenerator::new("http://host/client/");

        let manifests = generator.scan(temp.path()).unwrap();

        let paths: Vec<&str> = manifests
            .fullcheck
            .files
            .iter()
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(paths, vec!["maps/a b.unr", "system_en/l2.ini"]);

        let maps = &manifests.fullcheck.files[0];
        assert_eq!(maps.url.as_deref(), Some("http://host/client/maps/a%20b.unr"));
        assert_eq!(
            maps.expected_hash(),
            Some("7037807198c22a7d2b0807371d763779a84fdfcf")
        );
        assert_eq!(maps.size_bytes, Some(3));

        assert_eq!(manifests.update.files.len(), 1);
        assert_eq!(manifests.update.files[0].path, "system_en/l2.ini");
    }

    #[test]
    fn test_custom_update_prefix() {
        let temp = client_tree();
        let manifests = ManifestGenerator::new("http://host/client")
            .with_update_prefix("/maps/")
            .scan(temp.path())
            .unwrap();

        assert_eq!(manifests.update.files.len(), 1);
        assert_eq!(manifests.update.files[0].path, "maps/a b.unr");
    }

    #[test]
    fn test_write_outputs_parse_back() {
        let temp = client_tree();
        let out = TempDir::new().unwrap();
        let manifests = ManifestGenerator::new("http://host/client")
            .scan(temp.path())
            .unwrap();

        let written = manifests.write(out.path()).unwrap();

        assert_eq!(written.len(), 2);
        let full = Manifest::from_slice(&fs::read(out.path().join(FULLCHECK_FILENAME)).unwrap())
            .unwrap();
        assert_eq!(full, manifests.fullcheck);
        assert!(out.path().join(UPDATE_FILENAME).exists());
    }

    #[test]
    fn test_missing_client_dir() {
        let temp = TempDir::new().unwrap();
        let err = ManifestGenerator::new("http://host")
            .scan(&temp.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
