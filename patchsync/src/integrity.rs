//! Content hash calculation and the download decision.
//!
//! Files are hashed in fixed-size chunks so that large files never have to
//! fit in memory. One algorithm is used per run; SHA-1 matches the manifests
//! published by the generator.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{SyncError, SyncResult};

/// Buffer size for reading files during checksum calculation (1MB).
const BUFFER_SIZE: usize = 1024 * 1024;

/// Content hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// SHA-1, 40 hex characters.
    #[default]
    Sha1,
    /// SHA-256, 64 hex characters.
    Sha256,
}

impl HashAlgorithm {
    /// Name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!(
                "unknown hash algorithm '{}' (expected sha1 or sha256)",
                other
            )),
        }
    }
}

/// Outcome of checking a local file against its manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No regular file exists at the path.
    Missing,
    /// The file exists and no hash was given; it is trusted as-is.
    Trusted,
    /// The file's hash matches the expected value.
    Matches,
    /// The file's hash differs from the expected value.
    Mismatch { actual: String },
}

impl Verdict {
    /// Whether the file has to be (re)downloaded.
    pub fn needs_download(&self) -> bool {
        matches!(self, Self::Missing | Self::Mismatch { .. })
    }
}

/// Calculate the checksum of a file.
///
/// # Returns
///
/// The lowercase hexadecimal digest of the file contents.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn calculate_file_checksum(path: &Path, algorithm: HashAlgorithm) -> SyncResult<String> {
    let file = File::open(path).map_err(|e| SyncError::io(path, e))?;

    match algorithm {
        HashAlgorithm::Sha1 => digest_reader::<Sha1, _>(file, path),
        HashAlgorithm::Sha256 => digest_reader::<Sha256, _>(file, path),
    }
}

fn digest_reader<D: Digest, R: Read>(mut reader: R, path: &Path) -> SyncResult<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| SyncError::io(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex_lower(&hasher.finalize()))
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Check a local file against an expected hash.
///
/// The file content is only read when it exists and `expected` is non-blank.
/// Hashes are compared case-insensitively.
pub fn check_file(
    path: &Path,
    expected: Option<&str>,
    algorithm: HashAlgorithm,
) -> SyncResult<Verdict> {
    check_file_with(path, expected, |p| calculate_file_checksum(p, algorithm))
}

fn check_file_with<F>(path: &Path, expected: Option<&str>, digest: F) -> SyncResult<Verdict>
where
    F: FnOnce(&Path) -> SyncResult<String>,
{
    if !path.is_file() {
        return Ok(Verdict::Missing);
    }

    let expected = match expected.map(str::trim).filter(|h| !h.is_empty()) {
        Some(expected) => expected,
        None => return Ok(Verdict::Trusted),
    };

    let actual = digest(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(Verdict::Matches)
    } else {
        Ok(Verdict::Mismatch { actual })
    }
}

/// Whether the file at `path` must be downloaded.
pub fn needs_download(
    path: &Path,
    expected: Option<&str>,
    algorithm: HashAlgorithm,
) -> SyncResult<bool> {
    Ok(check_file(path, expected, algorithm)?.needs_download())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;
    use tempfile::TempDir;

    /// SHA-1 of the bytes 0x01 0x02 0x03.
    const SHA1_123: &str = "7037807198c22a7d2b0807371d763779a84fdfcf";

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_calculate_sha1() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "test.txt", b"hello world");

        let checksum = calculate_file_checksum(&path, HashAlgorithm::Sha1).unwrap();

        assert_eq!(checksum, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
    }

    #[test]
    fn test_calculate_sha256() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "test.txt", b"hello world");

        let checksum = calculate_file_checksum(&path, HashAlgorithm::Sha256).unwrap();

        assert_eq!(
            checksum,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_calculate_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "empty.txt", b"");

        let checksum = calculate_file_checksum(&path, HashAlgorithm::Sha1).unwrap();

        assert_eq!(checksum, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn test_large_file_spans_buffers() {
        let temp = TempDir::new().unwrap();
        let data = vec![0xABu8; BUFFER_SIZE * 2 + 17];
        let path = write_file(&temp, "large.bin", &data);

        let streamed = calculate_file_checksum(&path, HashAlgorithm::Sha256).unwrap();
        let direct = hex_lower(&Sha256::digest(&data));

        assert_eq!(streamed, direct);
    }

    #[test]
    fn test_missing_file_needs_download_regardless_of_hash() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.bin");

        assert_eq!(
            check_file(&path, None, HashAlgorithm::Sha1).unwrap(),
            Verdict::Missing
        );
        assert!(needs_download(&path, Some(SHA1_123), HashAlgorithm::Sha1).unwrap());
        assert!(needs_download(&path, Some(""), HashAlgorithm::Sha1).unwrap());
    }

    #[test]
    fn test_directory_counts_as_missing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            check_file(temp.path(), Some(SHA1_123), HashAlgorithm::Sha1).unwrap(),
            Verdict::Missing
        );
    }

    #[test]
    fn test_existing_file_without_hash_is_trusted() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "a.bin", b"anything");

        assert_eq!(
            check_file(&path, None, HashAlgorithm::Sha1).unwrap(),
            Verdict::Trusted
        );
        assert_eq!(
            check_file(&path, Some("  "), HashAlgorithm::Sha1).unwrap(),
            Verdict::Trusted
        );
    }

    #[test]
    fn test_trusted_file_is_never_read() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "a.bin", b"anything");
        let reads = Cell::new(0);
        let digest = |p: &Path| {
            reads.set(reads.get() + 1);
            calculate_file_checksum(p, HashAlgorithm::Sha1)
        };

        for expected in [None, Some(""), Some("  ")] {
            assert_eq!(
                check_file_with(&path, expected, digest).unwrap(),
                Verdict::Trusted
            );
        }
        assert_eq!(reads.get(), 0);

        assert!(matches!(
            check_file_with(&path, Some("00"), digest).unwrap(),
            Verdict::Mismatch { .. }
        ));
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn test_matching_hash_any_case() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "a.bin", &[1, 2, 3]);

        assert!(!needs_download(&path, Some(SHA1_123), HashAlgorithm::Sha1).unwrap());
        assert!(!needs_download(
            &path,
            Some(&SHA1_123.to_uppercase()),
            HashAlgorithm::Sha1
        )
        .unwrap());
    }

    #[test]
    fn test_single_byte_mutation_needs_download() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "a.bin", &[1, 2, 4]);

        let verdict = check_file(&path, Some(SHA1_123), HashAlgorithm::Sha1).unwrap();

        assert!(verdict.needs_download());
        assert!(matches!(verdict, Verdict::Mismatch { .. }));
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("SHA1".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha1));
        assert_eq!("sha-256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert!("md5".parse::<HashAlgorithm>().is_err());
        assert_eq!(HashAlgorithm::default().to_string(), "sha1");
    }
}
