//! Wrapper around std::fs commands to make them easier to use
//! and eventually abstract away the fs implementation
//!

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::RestoreError;

pub fn restoredb_config_dir() -> Result<PathBuf, RestoreError> {
    // ~/.config/restoredb on linux, the platform equivalent elsewhere
    let config_dir = dirs::config_dir().ok_or_else(RestoreError::config_dir_not_found)?;
    Ok(config_dir.join(constants::CONFIG_DIR))
}

pub fn read_from_path(path: impl AsRef<Path>) -> Result<String, RestoreError> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(err) => {
            log::debug!("util::fs::read_from_path could not read {:?}: {}", path, err);
            Err(RestoreError::IO(err))
        }
    }
}

pub fn write_to_path(path: impl AsRef<Path>, data: impl AsRef<str>) -> Result<(), RestoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, data.as_ref())?;
    Ok(())
}

/// Returns true if the file has one of the backup extensions the server restores.
/// The comparison is case-insensitive.
pub fn is_accepted_backup(path: impl AsRef<Path>) -> bool {
    match path.as_ref().extension().and_then(|ext| ext.to_str()) {
        Some(ext) => constants::ACCEPTED_BACKUP_EXTENSIONS
            .iter()
            .any(|accepted| ext.eq_ignore_ascii_case(accepted)),
        None => false,
    }
}

pub fn validate_backup_file(path: impl AsRef<Path>) -> Result<(), RestoreError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RestoreError::path_does_not_exist(path));
    }
    if !is_accepted_backup(path) {
        return Err(RestoreError::invalid_file_type(path));
    }
    Ok(())
}
