use std::fs;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use freight_billing::BillingError;
use freight_billing::billing::BillingPolicy;
use freight_billing::config::{Settings, StyleConfig};
use freight_billing::registry::{Account, AccountRegistry};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

const DATE: &str = "2024-05-01";

fn settings() -> Settings {
    let account = |name: &str, export_id: &str, import_id: &str, markup: f64| Account {
        name: name.to_string(),
        aliases: Vec::new(),
        export_id: export_id.to_string(),
        import_id: import_id.to_string(),
        markup,
    };
    Settings {
        registry: AccountRegistry::from_accounts(vec![
            account("Acme", "100", "200", 1.25),
            account("Globex", "300", "400", 1.1),
            account("Initech", "500", "600", 1.5),
        ])
        .expect("registry"),
        style: StyleConfig::default(),
    }
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("summary opened");
    reader
        .records()
        .map(|row| row.expect("row").iter().map(str::to_string).collect())
        .collect()
}

fn write_invoice_csv(path: &Path, rows: &[[&str; 8]]) {
    let mut writer = csv::Writer::from_path(path).expect("CSV created");
    writer
        .write_record([
            "Billing Account",
            "Senders Name",
            "Sender Contact",
            "Receivers Name",
            "Invoice Number",
            "Due Date",
            "Invoice Date",
            "Total Charge",
        ])
        .expect("header written");
    for row in rows {
        writer.write_record(row).expect("row written");
    }
    writer.flush().expect("CSV flushed");
}

#[test]
fn invoice_directory_aggregates_rows_per_invoice() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("input");
    let output = temp_dir.path().join("results");
    fs::create_dir(&input).expect("input directory");

    write_invoice_csv(
        &input.join("a.csv"),
        &[
            ["999", "Acme", "", "Someone", "INV1", "2024-06-01", "2024-05-01", "30.00"],
            ["999", "", "", "GLOBEX", "INV7", "2024-06-02", "2024-05-02", "12.00"],
        ],
    );
    write_invoice_csv(
        &input.join("b.csv"),
        &[["999", "someone else", "acme", "", "INV1", "2024-06-01", "2024-05-01", "20.00"]],
    );
    fs::write(input.join("notes.txt"), "ignored").expect("non-CSV file written");

    let report = freight_billing::pipeline::run_invoice_directory(
        &input,
        &output,
        &settings(),
        &BillingPolicy::default(),
        DATE,
    )
    .expect("run succeeds");

    assert_eq!(report.record_count, 3);
    assert_eq!(report.output_dir, output.join(DATE));
    assert_eq!(report.workbooks.len(), 2);
    assert!(output.join(DATE).join("Acme.xlsx").is_file());
    assert!(output.join(DATE).join("Globex.xlsx").is_file());
    assert!(!output.join(DATE).join("Initech.xlsx").exists());

    let summary = read_csv(&report.summary);
    assert_eq!(
        summary[0],
        vec![
            "Billing Account",
            "Due Date",
            "Invoice Date",
            "Invoice Number",
            "Product Name",
            "Total Charge"
        ]
    );
    assert_eq!(summary.len(), 3);
    assert_eq!(summary[1], vec!["100", "2024-06-01", "2024-05-01", "INV1", "", "50.00"]);
    assert_eq!(summary[2], vec!["300", "2024-06-02", "2024-05-02", "INV7", "", "12.00"]);

    let mut workbook: Xlsx<_> =
        open_workbook(output.join(DATE).join("Acme.xlsx")).expect("account workbook");
    let summary_sheet = workbook
        .worksheet_range("Summary")
        .expect("summary sheet")
        .expect("summary range");
    assert_eq!(summary_sheet.get_value((2, 0)), Some(&DataType::String("Total".into())));
    assert_eq!(summary_sheet.get_value((2, 1)), Some(&DataType::Float(50.0)));

    let data_sheet = workbook
        .worksheet_range("Data")
        .expect("data sheet")
        .expect("data range");
    assert_eq!(data_sheet.height(), 3);
}

#[test]
fn unresolved_alias_aborts_the_run() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("input");
    let output = temp_dir.path().join("results");
    fs::create_dir(&input).expect("input directory");

    write_invoice_csv(
        &input.join("mystery.csv"),
        &[["1", "Nobody", "No Contact", "No Receiver", "INV1", "", "", "5.00"]],
    );

    let result = freight_billing::pipeline::run_invoice_directory(
        &input,
        &output,
        &settings(),
        &BillingPolicy::default(),
        DATE,
    );

    match result {
        Err(error @ BillingError::UnresolvedAccount { .. }) => {
            let message = error.to_string();
            assert!(message.contains("mystery.csv"), "{message}");
            assert!(message.contains("Nobody"), "{message}");
        }
        other => panic!("expected unresolved account, got {other:?}"),
    }
    assert!(!output.join(DATE).join("summary.csv").exists());
}

#[test]
fn malformed_total_charge_aborts_the_run() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("input");
    fs::create_dir(&input).expect("input directory");

    write_invoice_csv(
        &input.join("a.csv"),
        &[["1", "Acme", "", "", "INV1", "", "", "not a number"]],
    );

    let result = freight_billing::pipeline::run_invoice_directory(
        &input,
        &temp_dir.path().join("results"),
        &settings(),
        &BillingPolicy::default(),
        DATE,
    );
    assert!(matches!(result, Err(BillingError::MalformedRecord { .. })));
}

#[test]
fn invoice_flow_rejects_non_directory_input() {
    let temp_dir = tempdir().expect("temporary directory");
    let file = temp_dir.path().join("file.csv");
    fs::write(&file, "a,b\n").expect("file written");

    for input in [file, temp_dir.path().join("missing")] {
        let result = freight_billing::pipeline::run_invoice_directory(
            &input,
            &temp_dir.path().join("results"),
            &settings(),
            &BillingPolicy::default(),
            DATE,
        );
        assert!(matches!(result, Err(BillingError::InvalidInput(_))));
    }
}

fn write_shipment_workbook(path: &Path) {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Export Data").expect("sheet named");
    sheet.write_string(0, 0, "Billing Account").expect("header");
    sheet.write_string(0, 1, "Tracking").expect("header");
    sheet.write_string(0, 2, "Grand Total").expect("header");
    sheet.write_string(1, 0, "100").expect("cell");
    sheet.write_string(1, 1, "TRK-1").expect("cell");
    sheet.write_number(1, 2, 80.0).expect("cell");
    sheet.write_number(2, 0, 300.0).expect("cell");
    sheet.write_string(2, 1, "TRK-2").expect("cell");
    sheet.write_number(2, 2, 10.0).expect("cell");
    sheet.write_string(3, 0, "777").expect("cell");
    sheet.write_string(3, 1, "TRK-3").expect("cell");
    sheet.write_number(3, 2, 1000.0).expect("cell");

    let sheet = workbook.add_worksheet();
    sheet.set_name("Export Destination Charges").expect("sheet named");
    sheet.write_string(0, 0, "Billing Account").expect("header");
    sheet.write_string(0, 1, "Grand Total").expect("header");
    sheet.write_string(0, 2, "Total Charge").expect("header");
    sheet.write_string(1, 0, "100").expect("cell");
    sheet.write_number(1, 1, 50.0).expect("cell");

    let sheet = workbook.add_worksheet();
    sheet.set_name("Import Data").expect("sheet named");
    sheet.write_string(0, 0, "Billing Account").expect("header");
    sheet.write_string(0, 1, "Grand Total").expect("header");
    sheet.write_string(1, 0, "100").expect("cell");
    sheet.write_number(1, 1, 999.0).expect("cell");

    workbook.save(path).expect("input workbook saved");
}

#[test]
fn shipment_workbook_applies_markup_per_category() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("shipments.xlsx");
    let output = temp_dir.path().join("results");
    write_shipment_workbook(&input);

    let report = freight_billing::pipeline::run_shipment_workbook(
        &input,
        &output,
        &settings(),
        &BillingPolicy::default(),
        DATE,
    )
    .expect("run succeeds");

    assert_eq!(report.record_count, 5);

    let acme_path = output
        .join(DATE)
        .join(format!("Acme_{DATE}_shipment_report.xlsx"));
    assert!(acme_path.is_file());
    assert!(
        output
            .join(DATE)
            .join(format!("Globex_{DATE}_shipment_report.xlsx"))
            .is_file()
    );
    assert_eq!(report.workbooks.len(), 2);

    let summary = read_csv(&report.summary);
    assert_eq!(
        summary,
        vec![
            vec!["Account", "Invoice Type", "Total Charge"],
            vec!["Acme", "Export Data", "100.00"],
            vec!["Globex", "Export Data", "11.00"],
            vec!["Acme", "Export Destination Charges", "50.00"],
        ]
    );

    let mut workbook: Xlsx<_> = open_workbook(&acme_path).expect("account workbook");
    let export_data = workbook
        .worksheet_range("Export Data")
        .expect("export data sheet")
        .expect("export data range");
    assert_eq!(
        export_data.get_value((0, 0)),
        Some(&DataType::String("Account Name".into()))
    );
    assert_eq!(export_data.get_value((1, 0)), Some(&DataType::String("Acme".into())));
    assert_eq!(
        export_data.get_value((0, 4)),
        Some(&DataType::String("Total Charge".into()))
    );
    assert_eq!(export_data.get_value((1, 4)), Some(&DataType::Float(100.0)));

    let destination = workbook
        .worksheet_range("Export Destination Charges")
        .expect("destination sheet")
        .expect("destination range");
    assert_eq!(destination.width(), 4, "existing Total Charge column is reused");
    assert_eq!(destination.get_value((1, 3)), Some(&DataType::Float(50.0)));

    assert!(
        workbook.worksheet_range("Import Data").is_none(),
        "export identifier does not match on import sheets"
    );
    assert!(workbook.worksheet_range("Import Destination Charges").is_none());

    let summary_sheet = workbook
        .worksheet_range("Summary")
        .expect("summary sheet")
        .expect("summary range");
    let totals: Vec<(String, f64)> = (1..=6)
        .map(|row| {
            let label = summary_sheet
                .get_value((row, 0))
                .map(ToString::to_string)
                .unwrap_or_default();
            let value = summary_sheet
                .get_value((row, 1))
                .and_then(DataType::get_float)
                .unwrap_or(f64::NAN);
            (label, value)
        })
        .collect();
    assert_eq!(totals[0], ("Export Data".to_string(), 100.0));
    assert_eq!(totals[1], ("Export Destination Charges".to_string(), 50.0));
    assert_eq!(totals[2], ("Import Data".to_string(), 0.0));
    assert_eq!(totals[3], ("Import Destination Charges".to_string(), 0.0));
    assert_eq!(totals[4], ("Total".to_string(), 150.0));
    assert_eq!(totals[5].0, "Total if by Credit Card");
    assert!((totals[5].1 - totals[4].1 * 1.03).abs() < 1e-9);
}

#[test]
fn missing_shipment_workbook_is_invalid_input() {
    let temp_dir = tempdir().expect("temporary directory");
    let result = freight_billing::pipeline::run_shipment_workbook(
        &temp_dir.path().join("absent.xlsx"),
        &temp_dir.path().join("results"),
        &settings(),
        &BillingPolicy::default(),
        DATE,
    );
    assert!(matches!(result, Err(BillingError::InvalidInput(_))));
}

fn write_csv(path: &Path, headers: &[&str], rows: &[&[&str]]) {
    let mut writer = csv::Writer::from_path(path).expect("CSV created");
    writer.write_record(headers).expect("header written");
    for row in rows {
        writer.write_record(*row).expect("row written");
    }
    writer.flush().expect("CSV flushed");
}

#[test]
fn data_sheet_lays_rows_out_under_the_union_of_headers() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("input");
    let output = temp_dir.path().join("results");
    fs::create_dir(&input).expect("input directory");

    write_csv(
        &input.join("a.csv"),
        &["Senders Name", "Invoice Number", "Total Charge", "Notes"],
        &[&["Acme", "INV1", "30.00", "first"]],
    );
    write_csv(
        &input.join("b.csv"),
        &["Receivers Name", "Invoice Number", "Tracking", "Total Charge", "NOTES"],
        &[&["Acme", "INV2", "TRK-9", "20.00", "second"]],
    );

    let report = freight_billing::pipeline::run_invoice_directory(
        &input,
        &output,
        &settings(),
        &BillingPolicy::default(),
        DATE,
    )
    .expect("headers differing only in case do not abort the run");

    let mut workbook: Xlsx<_> =
        open_workbook(&report.workbooks[0]).expect("account workbook");
    let data_sheet = workbook
        .worksheet_range("Data")
        .expect("data sheet")
        .expect("data range");

    let text = |row: usize, col: usize| {
        data_sheet
            .get_value((row as u32, col as u32))
            .map(ToString::to_string)
            .unwrap_or_default()
    };
    let header: Vec<String> = (0..data_sheet.width()).map(|col| text(0, col)).collect();
    assert_eq!(
        header,
        vec![
            "Senders Name",
            "Invoice Number",
            "Total Charge",
            "Notes",
            "Receivers Name",
            "Tracking"
        ]
    );
    let first: Vec<String> = (0..6).map(|col| text(1, col)).collect();
    assert_eq!(first, vec!["Acme", "INV1", "30.00", "first", "", ""]);
    let second: Vec<String> = (0..6).map(|col| text(2, col)).collect();
    assert_eq!(second, vec!["", "INV2", "20.00", "second", "Acme", "TRK-9"]);
}

#[test]
fn shipment_workbook_uses_configured_formats_and_skips_blank_accounts() {
    let temp_dir = tempdir().expect("temporary directory");
    let input = temp_dir.path().join("shipments.xlsx");
    let output = temp_dir.path().join("results");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Export Data").expect("sheet named");
    sheet.write_string(0, 0, "Billing Account").expect("header");
    sheet.write_string(0, 1, "Invoice Date").expect("header");
    sheet.write_string(0, 2, "Grand Total").expect("header");
    sheet.write_string(0, 3, "total charge").expect("header");
    sheet.write_string(1, 0, "100").expect("cell");
    sheet.write_string(1, 1, "2024-05-01").expect("cell");
    sheet.write_string(1, 2, "$80.00").expect("cell");
    sheet.write_number(1, 3, 1.0).expect("cell");
    sheet.write_string(2, 0, "  ").expect("cell");
    sheet.write_string(2, 1, "2024-05-02").expect("cell");
    sheet.write_number(2, 2, 5000.0).expect("cell");
    workbook.save(&input).expect("input workbook saved");

    let settings = Settings {
        style: Settings::embedded().expect("embedded settings").style,
        ..settings()
    };
    let report = freight_billing::pipeline::run_shipment_workbook(
        &input,
        &output,
        &settings,
        &BillingPolicy::default(),
        DATE,
    )
    .expect("run succeeds");

    assert_eq!(report.record_count, 2);
    let acme = report.ledger.account("Acme").expect("acme ledger");
    assert_eq!(acme.record_count(), 1, "blank billing account row is skipped");
    assert_eq!(
        read_csv(&report.summary),
        vec![
            vec!["Account", "Invoice Type", "Total Charge"],
            vec!["Acme", "Export Data", "100.00"],
        ]
    );

    let mut workbook: Xlsx<_> = open_workbook(&report.workbooks[0]).expect("account workbook");
    let export_data = workbook
        .worksheet_range("Export Data")
        .expect("export data sheet")
        .expect("export data range");
    assert_eq!(export_data.height(), 2);
    assert_eq!(export_data.width(), 5, "lower-case total charge column is replaced");
    assert_eq!(
        export_data.get_value((0, 4)),
        Some(&DataType::String("Total Charge".into()))
    );
    assert_eq!(
        export_data.get_value((1, 1)),
        Some(&DataType::String("100".into())),
        "text-typed identifiers stay text"
    );
    assert_eq!(
        export_data.get_value((1, 2)),
        Some(&DataType::DateTime(45413.0)),
        "date-typed column carries a date number format"
    );
    assert_eq!(
        export_data.get_value((1, 3)),
        Some(&DataType::Float(80.0)),
        "currency-typed text is written as a number"
    );
    assert_eq!(export_data.get_value((1, 4)), Some(&DataType::Float(100.0)));
}
