use std::path::Path;

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Table, TableColumn, Workbook, Worksheet};

use crate::billing::parse_amount;
use crate::config::{ColumnType, StyleConfig};
use crate::error::{BillingError, Result};
use crate::model::CellValue;
use crate::report::{SheetTable, WorkbookData};

/// Date spellings accepted in date-typed columns.
const DATE_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
/// Serial of 1900-03-01. Earlier serials are skewed by Excel's phantom 1900-02-29.
const FIRST_SERIAL_DATE: i64 = 61;

struct Formats {
    header: Format,
    currency: Format,
    date: Format,
}

/// Number format carried by a numeric cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    General,
    Currency,
    Date,
}

/// What ends up in one worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutput {
    Blank,
    Number(f64, CellFormat),
    Bool(bool),
    Text(String),
}

/// Writes the provided workbook data to the given path.
pub fn write_workbook(path: &Path, workbook: &WorkbookData, style: &StyleConfig) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let formats = Formats {
        header: Format::new().set_bold(),
        currency: Format::new().set_num_format(&style.currency_format),
        date: Format::new().set_num_format(&style.date_format),
    };

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;
        write_table(worksheet, table, style, &formats)?;
    }

    workbook_writer
        .save(path)
        .map_err(|source| BillingError::ExcelSave {
            path: path.to_path_buf(),
            source,
        })
}

fn write_table(
    worksheet: &mut Worksheet,
    table: &SheetTable,
    style: &StyleConfig,
    formats: &Formats,
) -> Result<()> {
    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, header, &formats.header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let column_type = table
                .columns
                .get(col_idx)
                .and_then(|column| style.column_type(column));
            write_cell(
                worksheet,
                (row_idx + 1) as u32,
                col_idx as u16,
                cell,
                column_type,
                formats,
            )?;
        }
    }

    let table_name = table
        .table_name
        .as_ref()
        .filter(|_| !table.rows.is_empty() && !table.columns.is_empty());
    if let Some(name) = table_name {
        let columns: Vec<TableColumn> = table
            .columns
            .iter()
            .map(|header| TableColumn::new().set_header(header))
            .collect();
        let mut excel_table = Table::new();
        excel_table
            .set_name(name)
            .set_autofilter(true)
            .set_columns(&columns);

        let col_end = (table.columns.len() as u16).saturating_sub(1);
        worksheet.add_table(0, 0, table.rows.len() as u32, col_end, &excel_table)?;
    }

    for (col_idx, width) in column_widths(table, style).into_iter().enumerate() {
        worksheet.set_column_width(col_idx as u16, width as f64)?;
    }

    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
    column_type: Option<ColumnType>,
    formats: &Formats,
) -> Result<()> {
    match cell_output(cell, column_type) {
        CellOutput::Blank => {}
        CellOutput::Number(value, CellFormat::General) => {
            worksheet.write_number(row, col, value)?;
        }
        CellOutput::Number(value, CellFormat::Currency) => {
            worksheet.write_number_with_format(row, col, value, &formats.currency)?;
        }
        CellOutput::Number(value, CellFormat::Date) => {
            worksheet.write_number_with_format(row, col, value, &formats.date)?;
        }
        CellOutput::Bool(value) => {
            worksheet.write_boolean(row, col, value)?;
        }
        CellOutput::Text(value) => {
            worksheet.write_string(row, col, &value)?;
        }
    }

    Ok(())
}

/// Decides how a cell is rendered under a column of the given type. Text that
/// does not parse as the column's type is kept as text.
pub fn cell_output(cell: &CellValue, column_type: Option<ColumnType>) -> CellOutput {
    let text_or = |value: &str, parsed: Option<f64>, format: CellFormat| match parsed {
        Some(number) => CellOutput::Number(number, format),
        None => CellOutput::Text(value.to_string()),
    };

    match (cell, column_type) {
        (CellValue::Empty, _) => CellOutput::Blank,
        (CellValue::Bool(value), _) => CellOutput::Bool(*value),
        (CellValue::Number(value), Some(ColumnType::Currency)) => {
            CellOutput::Number(*value, CellFormat::Currency)
        }
        (CellValue::Number(value), Some(ColumnType::Date)) => {
            CellOutput::Number(*value, CellFormat::Date)
        }
        (CellValue::Number(value), _) => CellOutput::Number(*value, CellFormat::General),
        (CellValue::Text(value), Some(ColumnType::Currency)) => {
            text_or(value, parse_amount(value), CellFormat::Currency)
        }
        (CellValue::Text(value), Some(ColumnType::Number)) => {
            text_or(value, parse_amount(value), CellFormat::General)
        }
        (CellValue::Text(value), Some(ColumnType::Date)) => {
            text_or(value, date_serial(value), CellFormat::Date)
        }
        (CellValue::Text(value), _) => CellOutput::Text(value.clone()),
    }
}

fn date_serial(value: &str) -> Option<f64> {
    let value = value.trim();
    let date = DATE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())?;
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = date.signed_duration_since(base).num_days();
    (days >= FIRST_SERIAL_DATE).then_some(days as f64)
}

/// Longest rendered value per column, floored at the minimum width, plus padding.
pub fn column_widths(table: &SheetTable, style: &StyleConfig) -> Vec<usize> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(col_idx, header)| {
            let longest = table
                .rows
                .iter()
                .filter_map(|row| row.get(col_idx))
                .map(|cell| cell.as_text().chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0);
            longest.max(style.min_column_width) + style.column_padding
        })
        .collect()
}
