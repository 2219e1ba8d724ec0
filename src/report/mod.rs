//! Pure assembly of output tables from finalised ledgers. Nothing here touches
//! the filesystem; the [`io`](crate::io) writers persist the results.

use std::collections::HashSet;

use crate::aggregate::{AccountLedger, Ledger};
use crate::billing::TOTAL_CHARGE;
use crate::model::{Category, CellValue};
use crate::registry::AccountRegistry;

pub const SUMMARY_SHEET: &str = "Summary";
pub const DATA_SHEET: &str = "Data";
pub const ACCOUNT_NAME: &str = "Account Name";
pub const INVOICE_TYPE: &str = "Invoice Type";
pub const TOTAL_CHARGES: &str = "Total Charges";
pub const CREDIT_CARD_LABEL: &str = "Total if by Credit Card";

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    /// Excel table name, when the sheet should carry a structured table.
    pub table_name: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Represents all tables required to materialise one account workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub account_name: String,
    pub tables: Vec<SheetTable>,
}

/// A flat table destined for a CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Account workbook of the numeric-ID flow: one sheet per non-empty category
/// followed by the category summary. `None` when the account has no category
/// records at all.
pub fn shipment_workbook(ledger: &AccountLedger) -> Option<WorkbookData> {
    let mut tables: Vec<SheetTable> = Category::ALL
        .iter()
        .filter_map(|&category| category_sheet(ledger, category))
        .collect();

    if tables.is_empty() {
        return None;
    }

    let summary = ledger.grand_summary();
    let mut rows: Vec<Vec<CellValue>> = summary
        .category_totals
        .iter()
        .map(|(category, total)| vec![category.sheet_name().into(), CellValue::Number(*total)])
        .collect();
    rows.push(vec!["Total".into(), CellValue::Number(summary.grand_total)]);
    rows.push(vec![
        CREDIT_CARD_LABEL.into(),
        CellValue::Number(summary.credit_card_total()),
    ]);

    tables.push(SheetTable {
        sheet_name: SUMMARY_SHEET.to_string(),
        table_name: None,
        columns: vec![INVOICE_TYPE.to_string(), TOTAL_CHARGE.to_string()],
        rows,
    });

    Some(WorkbookData {
        account_name: ledger.account_name.clone(),
        tables,
    })
}

fn category_sheet(ledger: &AccountLedger, category: Category) -> Option<SheetTable> {
    let records = &ledger.category(category)?.records;
    let source_headers = records.first()?.raw().headers();

    // Excel table headers must be unique ignoring case. A source column
    // spelled like `Total Charge` is replaced by the computed charge.
    let mut seen: HashSet<String> = HashSet::from([ACCOUNT_NAME.to_lowercase()]);
    let mut columns: Vec<String> = vec![ACCOUNT_NAME.to_string()];
    for header in source_headers.iter().filter(|header| !header.is_empty()) {
        if !seen.insert(header.to_lowercase()) {
            continue;
        }
        if header.eq_ignore_ascii_case(TOTAL_CHARGE) {
            columns.push(TOTAL_CHARGE.to_string());
        } else {
            columns.push(header.clone());
        }
    }
    if seen.insert(TOTAL_CHARGE.to_lowercase()) {
        columns.push(TOTAL_CHARGE.to_string());
    }

    let rows: Vec<Vec<CellValue>> = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| match column.as_str() {
                    ACCOUNT_NAME => ledger.account_name.as_str().into(),
                    TOTAL_CHARGE => CellValue::Number(record.total_charge),
                    other => record.raw().get(other).clone(),
                })
                .collect()
        })
        .collect();

    Some(SheetTable {
        sheet_name: category.sheet_name().to_string(),
        table_name: Some(category.table_name()),
        columns,
        rows,
    })
}

/// Cross-account summary of the numeric-ID flow.
pub fn shipment_summary(ledger: &Ledger) -> CsvTable {
    let rows: Vec<Vec<String>> = ledger
        .summary_rows()
        .into_iter()
        .map(|row| {
            vec![
                row.account_name,
                row.category.sheet_name().to_string(),
                format_amount(row.total_charge),
            ]
        })
        .collect();

    CsvTable {
        columns: vec![
            "Account".to_string(),
            INVOICE_TYPE.to_string(),
            TOTAL_CHARGE.to_string(),
        ],
        rows,
    }
}

/// Account workbook of the alias flow: the per-product breakdown and the
/// account's raw rows laid out under `headers`.
pub fn invoice_workbook(ledger: &AccountLedger, headers: &[String]) -> WorkbookData {
    let summary_rows: Vec<Vec<CellValue>> = ledger
        .product_summaries()
        .into_iter()
        .map(|product| {
            vec![
                CellValue::from(product.product_name.as_str()),
                CellValue::Number(product.total_charge),
            ]
        })
        .collect();

    let data_rows: Vec<Vec<CellValue>> = ledger
        .records()
        .map(|record| {
            headers
                .iter()
                .map(|header| record.raw().get_ignore_case(header).clone())
                .collect()
        })
        .collect();

    WorkbookData {
        account_name: ledger.account_name.clone(),
        tables: vec![
            SheetTable {
                sheet_name: SUMMARY_SHEET.to_string(),
                table_name: None,
                columns: vec!["Product Name".to_string(), TOTAL_CHARGES.to_string()],
                rows: summary_rows,
            },
            SheetTable {
                sheet_name: DATA_SHEET.to_string(),
                table_name: Some(DATA_SHEET.to_string()),
                columns: headers.to_vec(),
                rows: data_rows,
            },
        ],
    }
}

/// Cross-account summary of the alias flow, one row per (account, invoice).
/// `Billing Account` is the resolved account's export identifier.
pub fn invoice_summary(ledger: &Ledger, registry: &AccountRegistry) -> CsvTable {
    let rows: Vec<Vec<String>> = ledger
        .invoice_summaries()
        .into_iter()
        .map(|invoice| {
            let billing_account = registry
                .get(&invoice.account_name)
                .map(|account| account.export_id.clone())
                .unwrap_or_default();
            vec![
                billing_account,
                invoice.due_date,
                invoice.invoice_date,
                invoice.invoice_number,
                invoice.product_name,
                format_amount(invoice.total_charge),
            ]
        })
        .collect();

    CsvTable {
        columns: [
            "Billing Account",
            "Due Date",
            "Invoice Date",
            "Invoice Number",
            "Product Name",
            TOTAL_CHARGE,
        ]
        .into_iter()
        .map(str::to_string)
        .collect(),
        rows,
    }
}

/// Two-decimal rendering used for currency in CSV outputs.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}
