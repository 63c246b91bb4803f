//! Package archives and checksums.
//!
//! Each distro package is a flat zip: every file under the package directory
//! is stored by its file name alone, which is what the SSM agent expects when
//! it unpacks `install.sh`/`uninstall.sh` next to each other.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Read buffer size used while hashing
const DIGEST_CHUNK_SIZE: usize = 64 * 1024;

/// Statistics about a created archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Number of files stored
    pub file_count: usize,
    /// Total uncompressed size
    pub original_size: u64,
    /// Size of the zip file
    pub archive_size: u64,
}

/// Collect the regular files under `source`, sorted by path
fn collect_files(source: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::archive(source, e.to_string()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Zip every file under `package_dir` into `zip_path`, flattening paths to
/// file names.
pub fn zip_package(package_dir: &Path, zip_path: &Path) -> Result<ArchiveStats> {
    if !package_dir.is_dir() {
        return Err(Error::archive(
            zip_path,
            format!("package directory '{}' does not exist", package_dir.display()),
        ));
    }

    tracing::info!("Creating zip file: {}", zip_path.display());

    if let Some(parent) = zip_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let files = collect_files(package_dir)?;
    let mut total_size: u64 = 0;

    let mut zip = zip::ZipWriter::new(File::create(zip_path)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);

    for file_path in &files {
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::archive(zip_path, "file without a name"))?;

        zip.start_file(name, options)?;
        let mut file = File::open(file_path)?;
        total_size += io::copy(&mut file, &mut zip)?;
    }

    zip.finish()?;

    Ok(ArchiveStats {
        file_count: files.len(),
        original_size: total_size,
        archive_size: fs::metadata(zip_path)?.len(),
    })
}

/// Lowercase hex SHA-256 of a file, read in chunks
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
