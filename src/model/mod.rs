use std::fmt;
use std::sync::Arc;

/// A single cell value as read from a source file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Blank cell or missing column.
    Empty,
    /// Plain string literal.
    Text(String),
    /// Floating point number literal.
    Number(f64),
    /// Boolean literal.
    Bool(bool),
}

impl CellValue {
    /// Returns `true` for blank cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }

    /// Renders the value the way it reads in a spreadsheet cell.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(value) => value.clone(),
            CellValue::Number(value) => value.to_string(),
            CellValue::Bool(value) => value.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Direction of a shipment flow. Selects which numeric identifier of an
/// account a row is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Export,
    Import,
}

/// The four fixed billing classes. Every row of the numeric-ID flow belongs to
/// exactly one of them, determined by the sheet it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    ExportData,
    ExportDestinationCharges,
    ImportData,
    ImportDestinationCharges,
}

impl Category {
    /// All categories in report order.
    pub const ALL: [Category; 4] = [
        Category::ExportData,
        Category::ExportDestinationCharges,
        Category::ImportData,
        Category::ImportDestinationCharges,
    ];

    /// Sheet name used both in the source workbook and in account workbooks.
    pub fn sheet_name(self) -> &'static str {
        match self {
            Category::ExportData => "Export Data",
            Category::ExportDestinationCharges => "Export Destination Charges",
            Category::ImportData => "Import Data",
            Category::ImportDestinationCharges => "Import Destination Charges",
        }
    }

    /// Excel table name; table names may not contain spaces.
    pub fn table_name(self) -> String {
        self.sheet_name().replace(' ', "_")
    }

    pub fn direction(self) -> Direction {
        match self {
            Category::ExportData | Category::ExportDestinationCharges => Direction::Export,
            Category::ImportData | Category::ImportDestinationCharges => Direction::Import,
        }
    }

    /// Destination charges are passed through to the customer unmodified.
    pub fn is_destination_charge(self) -> bool {
        matches!(
            self,
            Category::ExportDestinationCharges | Category::ImportDestinationCharges
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// One input row keyed by the header of the file or sheet it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// File path or sheet name the row was read from.
    pub origin: String,
    /// 1-based row number within the origin, header included.
    pub line: usize,
    headers: Arc<Vec<String>>,
    values: Vec<CellValue>,
}

impl RawRecord {
    pub fn new(
        origin: impl Into<String>,
        line: usize,
        headers: Arc<Vec<String>>,
        values: Vec<CellValue>,
    ) -> Self {
        Self {
            origin: origin.into(),
            line,
            headers,
            values,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the cell under `column`, or [`CellValue::Empty`] when the column
    /// is absent or the row is short.
    pub fn get(&self, column: &str) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.headers
            .iter()
            .position(|header| header == column)
            .and_then(|idx| self.values.get(idx))
            .unwrap_or(EMPTY)
    }

    /// Like [`RawRecord::get`], but falls back to a header that differs from
    /// `column` only in ASCII case.
    pub fn get_ignore_case(&self, column: &str) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.headers
            .iter()
            .position(|header| header == column)
            .or_else(|| {
                self.headers
                    .iter()
                    .position(|header| header.eq_ignore_ascii_case(column))
            })
            .and_then(|idx| self.values.get(idx))
            .unwrap_or(EMPTY)
    }

    /// Text rendering of the cell under `column`, trimmed.
    pub fn text(&self, column: &str) -> String {
        self.get(column).as_text().trim().to_string()
    }
}

/// A raw record attributed to exactly one account.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub raw: RawRecord,
    pub account_name: String,
    /// `None` for invoice lines of the alias flow, which carry no sheet.
    pub category: Option<Category>,
}

/// A resolved record with its customer-facing charge.
#[derive(Debug, Clone, PartialEq)]
pub struct BilledRecord {
    pub resolved: ResolvedRecord,
    pub total_charge: f64,
}

impl BilledRecord {
    pub fn account_name(&self) -> &str {
        &self.resolved.account_name
    }

    pub fn category(&self) -> Option<Category> {
        self.resolved.category
    }

    pub fn raw(&self) -> &RawRecord {
        &self.resolved.raw
    }
}
