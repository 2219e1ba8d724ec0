use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::{debug, warn};

use crate::error::{BillingError, Result};
use crate::model::{Category, CellValue, RawRecord};

/// Reads the four category sheets of a shipment workbook. A missing sheet
/// yields no records for its category.
pub fn read_category_sheets(path: &Path) -> Result<BTreeMap<Category, Vec<RawRecord>>> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|source| BillingError::ExcelRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut sheets = BTreeMap::new();
    for category in Category::ALL {
        let Some(range) = read_optional_sheet(&mut workbook, category.sheet_name(), path)? else {
            warn!(sheet = category.sheet_name(), "sheet not found in workbook");
            continue;
        };
        let records = sheet_records(&range, category.sheet_name());
        debug!(
            sheet = category.sheet_name(),
            record_count = records.len(),
            "read category sheet"
        );
        sheets.insert(category, records);
    }

    Ok(sheets)
}

fn read_optional_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
    path: &Path,
) -> Result<Option<calamine::Range<DataType>>> {
    match workbook.worksheet_range(name) {
        Some(range) => range.map(Some).map_err(|source| BillingError::ExcelRead {
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(None),
    }
}

/// The first non-empty row supplies the column keys; every later non-empty
/// row becomes a record.
fn sheet_records(range: &calamine::Range<DataType>, sheet_name: &str) -> Vec<RawRecord> {
    let (first_row, _) = range.start().unwrap_or((0, 0));
    let mut rows = range
        .rows()
        .enumerate()
        .map(|(offset, row)| (first_row as usize + offset + 1, row))
        .filter(|(_, row)| row.iter().any(|cell| !cell_to_value(cell).is_blank()));

    let Some((_, header_row)) = rows.next() else {
        return Vec::new();
    };
    let headers: Arc<Vec<String>> = Arc::new(
        header_row
            .iter()
            .map(|cell| cell_to_value(cell).as_text().trim().to_string())
            .collect(),
    );

    rows.map(|(line, row)| {
        RawRecord::new(
            sheet_name,
            line,
            Arc::clone(&headers),
            row.iter().map(cell_to_value).collect(),
        )
    })
    .collect()
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) if value.trim().is_empty() => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::Empty => CellValue::Empty,
        DataType::DateTime(serial) => match excel_serial_to_date(*serial) {
            Some(date) => CellValue::Text(date),
            None => CellValue::Number(*serial),
        },
        other => CellValue::Text(other.to_string()),
    }
}

/// Excel counts days from 1899-12-30 (accounting for the 1900 leap year bug).
fn excel_serial_to_date(serial: f64) -> Option<String> {
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(chrono::Duration::try_days(serial.trunc() as i64)?)?;
    Some(date.format("%Y-%m-%d").to_string())
}
