//! Manifest document types.

use serde::{Deserialize, Serialize};

/// UTF-8 byte order mark, tolerated at the start of a manifest body.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Remote-published list of expected files.
///
/// The `files` array is required; an empty array is a valid manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Prefix used to derive the URL of entries without an explicit `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Expected files, in processing order.
    pub files: Vec<FileEntry>,
}

/// One expected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the local root, with `/` separators.
    pub path: String,

    /// Expected content hash as hex. Absent or empty means the file is
    /// trusted as soon as it exists.
    #[serde(
        rename = "sha1",
        alias = "hash",
        alias = "sha256",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_hash: Option<String>,

    /// Absolute download URL. Derived from `base_url` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Size in bytes, only used for status text.
    #[serde(rename = "size", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl Manifest {
    /// Parse a manifest from a JSON document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        serde_json::from_slice(bytes).map_err(|e| format!("invalid manifest document: {}", e))
    }

    /// Serialize the manifest as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the manifest lists no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The base URL, if set and non-empty.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

impl FileEntry {
    /// Create an entry with only a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected_hash: None,
            url: None,
            size_bytes: None,
        }
    }

    /// Set the expected hash.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.expected_hash = Some(hash.into());
        self
    }

    /// Set the explicit download URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the size in bytes.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size_bytes = Some(size);
        self
    }

    /// The expected hash, trimmed, or `None` when absent or blank.
    pub fn expected_hash(&self) -> Option<&str> {
        self.expected_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    /// URL to download this entry from.
    ///
    /// An explicit `url` wins. Otherwise the URL is `base_url` and `path`
    /// joined by a single `/`. Without a base URL the result is not an
    /// absolute URL and fails at transfer time.
    pub fn download_url(&self, base_url: Option<&str>) -> String {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return url.to_string();
        }

        let base = base_url.unwrap_or_default().trim_end_matches('/');
        format!("{}/{}", base, self.path.trim_start_matches('/'))
    }

    /// Size in bytes when known and non-zero.
    pub fn known_size(&self) -> Option<u64> {
        self.size_bytes.filter(|&s| s > 0)
    }
}
