use serde::de::DeserializeOwned;
use std::fs;

use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// This function reads a file from `file_path`, attempts to parse it
/// as JSON, and returns an instance of `T`.
///
/// Errors are automatically converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path).map_err(|e| Error::IoError(e))?;

    let parsed_data: T = serde_json::from_str(&data).map_err(|e| Error::DeserializationError(e))?;

    Ok(parsed_data)
}

/// Reads a JSON file and returns the raw string, or `None` when the file
/// is missing or unreadable. Used where a missing file is not an error
/// (e.g. the optional harvest config).
pub fn get_json_as_str(file_path: &str) -> Option<String> {
    match fs::read_to_string(file_path) {
        Ok(data) => Some(data),
        Err(e) => {
            log::debug!("Could not read '{}': {}", file_path, e);
            None
        }
    }
}
