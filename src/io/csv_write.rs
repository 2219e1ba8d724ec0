use std::path::Path;

use crate::error::{BillingError, Result};
use crate::report::CsvTable;

/// Writes `table` to `path`, header row first.
pub fn write_table(path: &Path, table: &CsvTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| BillingError::csv(path, source))?;

    writer
        .write_record(&table.columns)
        .map_err(|source| BillingError::csv(path, source))?;
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|source| BillingError::csv(path, source))?;
    }

    writer.flush().map_err(|source| BillingError::io(path, source))
}
