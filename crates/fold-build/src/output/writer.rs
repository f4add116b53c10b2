//! Secure file writing utilities for build output.
//!
//! # Security Features
//!
//! - **Path Validation**: All paths are validated to prevent directory traversal (`..` components)
//! - **Atomic Writes**: Content goes to a temporary file in the target directory and is renamed
//!   into place, so readers never observe a partially written file
//! - **Automatic Rollback**: If any write in a batch fails, all temporary files are deleted
//! - **Directory Creation**: Parent directories are created with `mkdir -p` behavior

// The writer is the one place build output touches std::fs directly
#![allow(clippy::disallowed_methods)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::asset::AssetTable;
use crate::{Error, Result};

/// Writes every asset in the table to `dir` with security checks and atomic guarantees.
///
/// # Arguments
///
/// * `assets` - Asset table to write
/// * `dir` - Target directory for output files; existing files are replaced
///
/// # Atomic Guarantees
///
/// Either all files are written or none are. If any operation fails, all
/// temporary files written so far are removed.
pub fn write_assets_to(assets: &AssetTable, dir: &Path) -> Result<()> {
    let dir = validate_and_normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut operations = Vec::with_capacity(assets.len());
    for (filename, source) in assets.iter() {
        let target_path = validate_output_path(&dir, filename)?;
        operations.push((target_path, source.source().into_owned()));
    }

    write_files_atomic(&operations)
}

/// Atomically replaces a single file below `dir`.
///
/// The content is written to a temporary file next to the target and renamed
/// over it. The temporary file is removed on every failure path, so the target
/// either keeps its previous content or holds exactly `content`.
///
/// Returns the absolute path that was written.
pub fn write_file_atomic(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let dir = validate_and_normalize_dir(dir)?;
    let target_path = validate_output_path(&dir, filename)?;
    let parent = target_path.parent().unwrap_or(&dir).to_path_buf();

    fs::create_dir_all(&parent).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create temporary file in '{}': {}",
            parent.display(),
            e
        ))
    })?;

    temp.write_all(content)
        .and_then(|_| temp.flush())
        .map_err(|e| {
            Error::WriteFailure(format!(
                "Failed to write temporary file for '{}': {}",
                target_path.display(),
                e
            ))
        })?;

    temp.persist(&target_path).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to move temporary file to '{}': {}",
            target_path.display(),
            e.error
        ))
    })?;

    Ok(target_path)
}

/// Validates and normalizes a directory path.
///
/// - Normalizes the path (resolving `.` and `..`)
/// - Converts to an absolute path
fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();

    let absolute = if cleaned.is_absolute() {
        cleaned
    } else {
        std::env::current_dir()
            .map_err(|e| {
                Error::InvalidOutputPath(format!("Failed to get current directory: {}", e))
            })?
            .join(&cleaned)
            .clean()
    };

    Ok(absolute)
}

/// Validates an output path to prevent directory traversal attacks.
///
/// 1. Cleaning the filename path
/// 2. Joining it onto the base directory
/// 3. Cleaning the result again to resolve any remaining `..`
/// 4. Checking that the final path is still under the base directory
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(Error::InvalidOutputPath("Filename is empty".to_string()));
    }

    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let filename_path = Path::new(filename).clean();
    let full_path = base_dir.join(&filename_path).clean();

    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

/// Temporary sibling path used during a batch write.
fn temp_path_for(target_path: &Path) -> PathBuf {
    let mut name = target_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target_path.with_file_name(name)
}

/// Writes multiple files atomically with automatic rollback on failure.
///
/// Two-phase commit:
/// 1. Write all content to temporary files (`<name>.tmp`)
/// 2. If all writes succeed, rename temp files to final names
/// 3. If any operation fails, delete all temp files
fn write_files_atomic(operations: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut temp_files = Vec::with_capacity(operations.len());

    // Phase 1: Write to temporary files
    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = temp_path_for(target_path);
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    // Phase 2: Rename temp files to final names
    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Best-effort cleanup of temporary files; we're already in an error state.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                warn!(
                    "Failed to clean up temporary file '{}': {}",
                    temp_path.display(),
                    e
                );
            }
        }
    }
}
