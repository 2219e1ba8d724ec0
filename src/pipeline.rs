use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::aggregate::{Aggregator, Ledger};
use crate::billing::BillingPolicy;
use crate::config::Settings;
use crate::error::{BillingError, Result};
use crate::io::csv_read::{self, CsvSource};
use crate::io::{csv_write, excel_read, excel_write};
use crate::model::{BilledRecord, Category, RawRecord};
use crate::registry::AccountRegistry;
use crate::report;
use crate::resolve::{BILLING_ACCOUNT, RowResolver};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub workbooks: Vec<PathBuf>,
    pub summary: PathBuf,
    pub record_count: usize,
    pub ledger: Ledger,
}

/// Resolves and bills every row of the alias flow. Each source is processed
/// independently; an unresolved or malformed row aborts the whole batch.
pub fn bill_invoice_sources(
    sources: &[CsvSource],
    registry: &AccountRegistry,
    policy: &BillingPolicy,
) -> Result<Ledger> {
    let resolver = RowResolver::new(registry);

    let billed: Vec<Vec<BilledRecord>> = sources
        .par_iter()
        .map(|source| {
            source
                .records
                .iter()
                .map(|raw| {
                    let resolution = resolver.resolve_by_alias(&source.path, raw.clone())?;
                    policy.bill(resolution.record, resolution.account)
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let mut aggregator = Aggregator::new();
    aggregator.extend(billed.into_iter().flatten());
    Ok(aggregator.finish(registry))
}

/// Resolves and bills the category sheets of the numeric-ID flow. Rows whose
/// billing account is not configured are skipped.
pub fn bill_category_sheets(
    sheets: BTreeMap<Category, Vec<RawRecord>>,
    registry: &AccountRegistry,
    policy: &BillingPolicy,
) -> Result<Ledger> {
    let resolver = RowResolver::new(registry);
    let mut aggregator = Aggregator::new();

    for (category, records) in sheets {
        let mut skipped = 0usize;
        for raw in records {
            if raw.get(BILLING_ACCOUNT).is_blank() {
                continue;
            }
            match resolver.resolve_by_id(raw, category) {
                Some(resolution) => {
                    aggregator.push(policy.bill(resolution.record, resolution.account)?);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(%category, skipped, "rows without a configured account skipped");
        }
    }

    Ok(aggregator.finish(registry))
}

/// Alias flow over every `*.csv` file in `input_dir`.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input_dir.display(), output = %output_root.display())
)]
pub fn run_invoice_directory(
    input_dir: &Path,
    output_root: &Path,
    settings: &Settings,
    policy: &BillingPolicy,
    date: &str,
) -> Result<RunReport> {
    if !input_dir.is_dir() {
        return Err(BillingError::InvalidInput(format!(
            "not a directory: {}",
            input_dir.display()
        )));
    }

    let files = csv_read::list_csv_files(input_dir)?;
    if files.is_empty() {
        return Err(BillingError::InvalidInput(format!(
            "no CSV files found in {}",
            input_dir.display()
        )));
    }
    info!(file_count = files.len(), "reading CSV sources");

    let sources: Vec<CsvSource> = files
        .par_iter()
        .map(|path| csv_read::read_records(path))
        .collect::<Result<Vec<_>>>()?;
    let record_count: usize = sources.iter().map(|source| source.records.len()).sum();
    info!(record_count, "CSV sources read");

    let headers = merged_headers(&sources);
    let ledger = bill_invoice_sources(&sources, &settings.registry, policy)?;

    let output_dir = prepare_output_dir(output_root, date)?;
    let mut workbooks = Vec::with_capacity(ledger.accounts().len());
    for account in ledger.accounts() {
        let workbook = report::invoice_workbook(account, &headers);
        let path = output_dir.join(format!("{}.xlsx", account.account_name));
        excel_write::write_workbook(&path, &workbook, &settings.style)?;
        debug!(account = %account.account_name, path = %path.display(), "account workbook written");
        workbooks.push(path);
    }

    let summary = output_dir.join("summary.csv");
    csv_write::write_table(&summary, &report::invoice_summary(&ledger, &settings.registry))?;
    info!(
        account_count = workbooks.len(),
        summary = %summary.display(),
        "summary has been saved"
    );

    Ok(RunReport {
        output_dir,
        workbooks,
        summary,
        record_count,
        ledger,
    })
}

/// Numeric-ID flow over the four category sheets of `input`.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output_root.display())
)]
pub fn run_shipment_workbook(
    input: &Path,
    output_root: &Path,
    settings: &Settings,
    policy: &BillingPolicy,
    date: &str,
) -> Result<RunReport> {
    if !input.is_file() {
        return Err(BillingError::InvalidInput(format!(
            "workbook not found: {}",
            input.display()
        )));
    }

    let sheets = excel_read::read_category_sheets(input)?;
    let record_count: usize = sheets.values().map(Vec::len).sum();
    info!(record_count, sheet_count = sheets.len(), "shipment workbook read");

    let ledger = bill_category_sheets(sheets, &settings.registry, policy)?;

    let output_dir = prepare_output_dir(output_root, date)?;
    let mut workbooks = Vec::with_capacity(ledger.accounts().len());
    for account in ledger.accounts() {
        let Some(workbook) = report::shipment_workbook(account) else {
            continue;
        };
        let path = output_dir.join(format!(
            "{}_{date}_shipment_report.xlsx",
            account.account_name
        ));
        excel_write::write_workbook(&path, &workbook, &settings.style)?;
        debug!(account = %account.account_name, path = %path.display(), "account workbook written");
        workbooks.push(path);
    }

    let summary = output_dir.join(format!("{date}_summary.csv"));
    csv_write::write_table(&summary, &report::shipment_summary(&ledger))?;
    info!(
        account_count = workbooks.len(),
        summary = %summary.display(),
        "summary has been saved"
    );

    Ok(RunReport {
        output_dir,
        workbooks,
        summary,
        record_count,
        ledger,
    })
}

fn prepare_output_dir(output_root: &Path, date: &str) -> Result<PathBuf> {
    let output_dir = output_root.join(date);
    std::fs::create_dir_all(&output_dir).map_err(|source| BillingError::io(&output_dir, source))?;
    Ok(output_dir)
}

/// Union of the source headers in first-seen order. Headers differing only in
/// case collapse onto the first spelling seen.
fn merged_headers(sources: &[CsvSource]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    sources
        .iter()
        .flat_map(|source| source.headers.iter())
        .filter(|header| !header.is_empty() && seen.insert(header.to_lowercase()))
        .cloned()
        .collect()
}
