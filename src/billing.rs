use crate::error::{BillingError, Result};
use crate::model::{BilledRecord, Category, CellValue, RawRecord, ResolvedRecord};
use crate::registry::Account;

pub const GRAND_TOTAL: &str = "Grand Total";
pub const TOTAL_CHARGE: &str = "Total Charge";

/// How the charge of one kind of record is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRule {
    /// Column holding the base amount.
    pub column: String,
    /// Whether the account markup is applied to the base amount.
    pub apply_markup: bool,
}

impl ChargeRule {
    pub fn marked_up(column: &str) -> Self {
        Self {
            column: column.to_string(),
            apply_markup: true,
        }
    }

    pub fn pass_through(column: &str) -> Self {
        Self {
            column: column.to_string(),
            apply_markup: false,
        }
    }
}

/// Charge rules for every record kind handled by a run.
///
/// Data categories are marked up from `Grand Total`; destination charges pass
/// `Grand Total` through. Alias-flow invoice lines read `Total Charge`, which
/// the carrier export has already billed.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingPolicy {
    pub export_data: ChargeRule,
    pub export_destination_charges: ChargeRule,
    pub import_data: ChargeRule,
    pub import_destination_charges: ChargeRule,
    pub invoice_line: ChargeRule,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            export_data: ChargeRule::marked_up(GRAND_TOTAL),
            export_destination_charges: ChargeRule::pass_through(GRAND_TOTAL),
            import_data: ChargeRule::marked_up(GRAND_TOTAL),
            import_destination_charges: ChargeRule::pass_through(GRAND_TOTAL),
            invoice_line: ChargeRule::pass_through(TOTAL_CHARGE),
        }
    }
}

impl BillingPolicy {
    /// Rule for a category, or the invoice-line rule when there is none.
    pub fn rule_for(&self, category: Option<Category>) -> &ChargeRule {
        match category {
            Some(Category::ExportData) => &self.export_data,
            Some(Category::ExportDestinationCharges) => &self.export_destination_charges,
            Some(Category::ImportData) => &self.import_data,
            Some(Category::ImportDestinationCharges) => &self.import_destination_charges,
            None => &self.invoice_line,
        }
    }

    /// Computes the customer-facing charge of `record` for `account`.
    pub fn compute_charge(
        &self,
        record: &RawRecord,
        category: Option<Category>,
        account: &Account,
    ) -> Result<f64> {
        let rule = self.rule_for(category);
        let base = required_amount(record, &rule.column)?;
        Ok(if rule.apply_markup {
            base * account.markup
        } else {
            base
        })
    }

    pub fn bill(&self, resolved: ResolvedRecord, account: &Account) -> Result<BilledRecord> {
        let total_charge = self.compute_charge(&resolved.raw, resolved.category, account)?;
        Ok(BilledRecord {
            resolved,
            total_charge,
        })
    }
}

/// Reads a numeric column, failing with [`BillingError::MalformedRecord`] when
/// it is missing or not a number.
pub fn required_amount(record: &RawRecord, column: &str) -> Result<f64> {
    let cell = record.get(column);
    let amount = match cell {
        CellValue::Number(value) => Some(*value),
        CellValue::Text(value) => parse_amount(value),
        CellValue::Empty | CellValue::Bool(_) => None,
    };

    amount
        .filter(|value| value.is_finite())
        .ok_or_else(|| BillingError::MalformedRecord {
            origin: record.origin.clone(),
            line: record.line,
            column: column.to_string(),
            value: cell.as_text(),
        })
}

/// Parses a currency amount such as `1,234.50`, `$12` or `(3.00)`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.replace([',', '$', '"'], "");
    let cleaned = cleaned.trim();
    if let Some(inner) = cleaned.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|value| -value);
    }
    cleaned.parse::<f64>().ok()
}
