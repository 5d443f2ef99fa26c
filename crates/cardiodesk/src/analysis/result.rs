//! NAD result files.
//!
//! The analysis writes one small file per patient whose second line carries
//! the NAD value, either as `label: value` text or as a CSV data row.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Layout of the NAD result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    /// `result_<id>.txt`, value after the colon on line two.
    #[default]
    Text,
    /// `NAD_detection_result_<id>.csv`, second column of the first data row.
    Csv,
}

impl std::fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl ResultFormat {
    /// File name of the result for a patient.
    #[must_use]
    pub fn file_name(self, patient_id: i64) -> String {
        match self {
            Self::Text => format!("result_{patient_id}.txt"),
            Self::Csv => format!("NAD_detection_result_{patient_id}.csv"),
        }
    }

    /// Extract the NAD value from file content.
    ///
    /// `path` is only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResultMalformed`] if the value cannot be located.
    pub fn parse(self, content: &str, path: &Path) -> Result<String> {
        let value = match self {
            Self::Text => parse_text(content, path)?,
            Self::Csv => parse_csv(content, path)?,
        };
        if value.is_empty() {
            return Err(Error::result_malformed(path, "empty NAD value"));
        }
        Ok(value)
    }
}

fn parse_text(content: &str, path: &Path) -> Result<String> {
    let line = content
        .lines()
        .nth(1)
        .ok_or_else(|| Error::result_malformed(path, "expected at least two lines"))?;
    // Value sits between the first and an optional second colon.
    let value = line
        .trim()
        .split(':')
        .nth(1)
        .ok_or_else(|| Error::result_malformed(path, "second line has no ':' separator"))?;
    Ok(value.trim().to_string())
}

fn parse_csv(content: &str, path: &Path) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let record = reader
        .records()
        .next()
        .ok_or_else(|| Error::result_malformed(path, "no data row"))?
        .map_err(|e| Error::result_malformed(path, e.to_string()))?;

    let value = record
        .get(1)
        .ok_or_else(|| Error::result_malformed(path, "data row has fewer than two columns"))?;
    Ok(value.trim().to_string())
}

/// Read and parse the NAD result of a patient from `result_dir`.
///
/// # Errors
///
/// Returns [`Error::ResultMissing`] when the file does not exist,
/// [`Error::ResultMalformed`] when it cannot be parsed, or an I/O error.
pub async fn read_nad_result(
    result_dir: &Path,
    format: ResultFormat,
    patient_id: i64,
) -> Result<String> {
    let path: PathBuf = result_dir.join(format.file_name(patient_id));
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ResultMissing { path });
        }
        Err(e) => return Err(e.into()),
    };
    format.parse(&content, &path)
}
