//! Zip archive writer for a job's output directory.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::ArchiveError;

/// Regular files directly inside `dir` whose name ends in `.{extension}`,
/// sorted by name.
pub fn matching_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let suffix = format!(".{}", extension);
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .map(|name| name.ends_with(&suffix))
            .unwrap_or(false);
        if matches {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Runs [`matching_files`] on the blocking pool.
pub async fn list_matching_files(dir: PathBuf, extension: String) -> std::io::Result<Vec<PathBuf>> {
    tokio::task::spawn_blocking(move || matching_files(&dir, &extension))
        .await
        .map_err(std::io::Error::other)?
}

/// Writes every `.{extension}` file of `source_dir` into a flat zip at `dest`.
///
/// Returns the archived source paths. On failure nothing is left at `dest`.
pub fn write_archive(
    source_dir: &Path,
    dest: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let result = write_archive_inner(source_dir, dest, extension);
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(dest) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove partial archive {:?}: {}", dest, e);
            }
        }
    }
    result
}

fn write_archive_inner(
    source_dir: &Path,
    dest: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let files = matching_files(source_dir, extension)?;

    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        zip.start_file(name, options)?;
        let mut reader = BufReader::new(File::open(path)?);
        std::io::copy(&mut reader, &mut zip)?;
    }

    zip.finish()?;
    debug!("Archived {} files into {:?}", files.len(), dest);
    Ok(files)
}

/// Runs [`write_archive`] on the blocking pool.
pub async fn create_archive(
    source_dir: PathBuf,
    dest: PathBuf,
    extension: String,
) -> Result<Vec<PathBuf>, ArchiveError> {
    tokio::task::spawn_blocking(move || write_archive(&source_dir, &dest, &extension))
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
}
