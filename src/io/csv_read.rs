use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{BillingError, Result};
use crate::model::{CellValue, RawRecord};

/// Parsed content of one delimited source file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvSource {
    pub path: PathBuf,
    pub headers: Arc<Vec<String>>,
    pub records: Vec<RawRecord>,
}

/// Lists the `*.csv` files directly inside `dir`, sorted by path.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| BillingError::io(dir, source))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| BillingError::io(dir, source))?.path();
        let is_csv = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Reads every row of a header-first CSV file. Values are kept as text; blank
/// values become [`CellValue::Empty`].
pub fn read_records(path: &Path) -> Result<CsvSource> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| BillingError::csv(path, source))?;

    let headers: Arc<Vec<String>> = Arc::new(
        reader
            .headers()
            .map_err(|source| BillingError::csv(path, source))?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').to_string())
            .collect(),
    );

    let origin = path.display().to_string();
    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|source| BillingError::csv(path, source))?;
        let values = row.iter().map(CellValue::from).collect();
        records.push(RawRecord::new(
            origin.clone(),
            index + 2,
            Arc::clone(&headers),
            values,
        ));
    }

    debug!(path = %path.display(), record_count = records.len(), "read CSV source");
    Ok(CsvSource {
        path: path.to_path_buf(),
        headers,
        records,
    })
}
