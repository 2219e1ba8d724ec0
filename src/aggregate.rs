use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::model::{BilledRecord, Category};
use crate::registry::AccountRegistry;

/// Card-processing surcharge applied on top of an account's grand total.
pub const CREDIT_CARD_SURCHARGE: f64 = 1.03;
/// Label of the synthetic row closing the per-product breakdown.
pub const TOTAL_LABEL: &str = "Total";

pub const INVOICE_NUMBER: &str = "Invoice Number";
pub const DUE_DATE: &str = "Due Date";
pub const INVOICE_DATE: &str = "Invoice Date";
pub const PRODUCT_NAME: &str = "Product Name";

/// Records of one kind for one account, with their running total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryLedger {
    pub records: Vec<BilledRecord>,
    pub total: f64,
}

impl CategoryLedger {
    fn push(&mut self, record: BilledRecord) {
        self.total += record.total_charge;
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Everything billed to one account during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountLedger {
    pub account_name: String,
    categories: BTreeMap<Category, CategoryLedger>,
    invoice_lines: CategoryLedger,
}

impl AccountLedger {
    fn new(account_name: String) -> Self {
        Self {
            account_name,
            categories: BTreeMap::new(),
            invoice_lines: CategoryLedger::default(),
        }
    }

    fn push(&mut self, record: BilledRecord) {
        match record.category() {
            Some(category) => self.categories.entry(category).or_default().push(record),
            None => self.invoice_lines.push(record),
        }
    }

    pub fn category(&self, category: Category) -> Option<&CategoryLedger> {
        self.categories
            .get(&category)
            .filter(|ledger| !ledger.is_empty())
    }

    pub fn category_total(&self, category: Category) -> f64 {
        self.category(category).map_or(0.0, |ledger| ledger.total)
    }

    /// Every record of the account: categories in report order, then invoice lines.
    pub fn records(&self) -> impl Iterator<Item = &BilledRecord> {
        self.categories
            .values()
            .flat_map(|ledger| ledger.records.iter())
            .chain(self.invoice_lines.records.iter())
    }

    pub fn record_count(&self) -> usize {
        self.categories
            .values()
            .map(|ledger| ledger.records.len())
            .sum::<usize>()
            + self.invoice_lines.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    pub fn grand_summary(&self) -> GrandSummaryRow {
        let category_totals: Vec<(Category, f64)> = Category::ALL
            .iter()
            .map(|&category| (category, self.category_total(category)))
            .collect();
        let grand_total: f64 = category_totals.iter().map(|(_, total)| total).sum();
        GrandSummaryRow {
            account_name: self.account_name.clone(),
            category_totals,
            grand_total,
        }
    }

    /// Totals grouped by invoice number in first-seen order. Dates and product
    /// come from the first record of each invoice.
    pub fn invoice_summaries(&self) -> Vec<InvoiceSummary> {
        let mut summaries: Vec<InvoiceSummary> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in self.records() {
            let raw = record.raw();
            let invoice_number = raw.text(INVOICE_NUMBER);
            match index.get(&invoice_number) {
                Some(&position) => summaries[position].total_charge += record.total_charge,
                None => {
                    index.insert(invoice_number.clone(), summaries.len());
                    summaries.push(InvoiceSummary {
                        account_name: self.account_name.clone(),
                        invoice_number,
                        due_date: raw.text(DUE_DATE),
                        invoice_date: raw.text(INVOICE_DATE),
                        product_name: raw.text(PRODUCT_NAME),
                        total_charge: record.total_charge,
                    });
                }
            }
        }

        summaries
    }

    /// Totals grouped by product name in first-seen order, closed by a
    /// synthetic `Total` row.
    pub fn product_summaries(&self) -> Vec<ProductSummary> {
        let mut summaries: Vec<ProductSummary> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in self.records() {
            let product_name = record.raw().text(PRODUCT_NAME);
            match index.get(&product_name) {
                Some(&position) => summaries[position].total_charge += record.total_charge,
                None => {
                    index.insert(product_name.clone(), summaries.len());
                    summaries.push(ProductSummary {
                        product_name,
                        total_charge: record.total_charge,
                    });
                }
            }
        }

        let total: f64 = summaries.iter().map(|summary| summary.total_charge).sum();
        summaries.push(ProductSummary {
            product_name: TOTAL_LABEL.to_string(),
            total_charge: total,
        });
        summaries
    }
}

/// Total charge of one account in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub account_name: String,
    pub category: Category,
    pub total_charge: f64,
}

/// Per-account roll-up of the four category totals.
#[derive(Debug, Clone, PartialEq)]
pub struct GrandSummaryRow {
    pub account_name: String,
    pub category_totals: Vec<(Category, f64)>,
    pub grand_total: f64,
}

impl GrandSummaryRow {
    pub fn credit_card_total(&self) -> f64 {
        self.grand_total * CREDIT_CARD_SURCHARGE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceSummary {
    pub account_name: String,
    pub invoice_number: String,
    pub due_date: String,
    pub invoice_date: String,
    pub product_name: String,
    pub total_charge: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub product_name: String,
    pub total_charge: f64,
}

/// Folds billed records into per-account ledgers.
#[derive(Debug, Default)]
pub struct Aggregator {
    ledgers: HashMap<String, AccountLedger>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: BilledRecord) {
        let account_name = record.account_name().to_string();
        self.ledgers
            .entry(account_name.clone())
            .or_insert_with(|| AccountLedger::new(account_name))
            .push(record);
    }

    /// Orders the ledgers by registration and drops accounts without records.
    pub fn finish(mut self, registry: &AccountRegistry) -> Ledger {
        let accounts: Vec<AccountLedger> = registry
            .accounts()
            .iter()
            .filter_map(|account| self.ledgers.remove(&account.name))
            .filter(|ledger| !ledger.is_empty())
            .collect();
        debug!(account_count = accounts.len(), "ledgers finalised");
        Ledger { accounts }
    }
}

impl Extend<BilledRecord> for Aggregator {
    fn extend<I: IntoIterator<Item = BilledRecord>>(&mut self, records: I) {
        for record in records {
            self.push(record);
        }
    }
}

/// Finalised ledgers of a run, one per account that had any record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    accounts: Vec<AccountLedger>,
}

impl Ledger {
    pub fn accounts(&self) -> &[AccountLedger] {
        &self.accounts
    }

    pub fn account(&self, name: &str) -> Option<&AccountLedger> {
        self.accounts.iter().find(|ledger| ledger.account_name == name)
    }

    /// One row per (account, category) with a non-zero total, grouped by
    /// category and then by account registration order.
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        Category::ALL
            .iter()
            .flat_map(|&category| {
                self.accounts.iter().filter_map(move |ledger| {
                    let total_charge = ledger.category_total(category);
                    (total_charge != 0.0).then(|| SummaryRow {
                        account_name: ledger.account_name.clone(),
                        category,
                        total_charge,
                    })
                })
            })
            .collect()
    }

    pub fn invoice_summaries(&self) -> Vec<InvoiceSummary> {
        self.accounts
            .iter()
            .flat_map(AccountLedger::invoice_summaries)
            .collect()
    }
}
