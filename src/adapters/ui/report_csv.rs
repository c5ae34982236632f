//! CSV export of a price report. Uses the `csv` crate for quoting.
//!
//! Format: semicolon-delimited, one row per in-app purchase (one row for
//! regions without any), regions in ranked order.

use crate::domain::{DomainError, PriceReport, RegionOutcome};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

const HEADER: [&str; 9] = [
    "Rank",
    "Region",
    "Status",
    "App price",
    "Currency",
    "App price (ref)",
    "In-app purchase",
    "In-app price",
    "In-app price (ref)",
];

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

/// Render `report` as CSV text.
pub fn report_to_csv(report: &PriceReport) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(HEADER)?;

    for (rank, record) in report.records.iter().enumerate() {
        let rank = (rank + 1).to_string();
        match &record.outcome {
            RegionOutcome::Ok { prices, .. } => {
                let base = [
                    rank.clone(),
                    record.region_code.clone(),
                    "ok".to_string(),
                    format!("{:.2}", prices.base.amount),
                    prices.base.currency.clone(),
                    fmt_opt(prices.base.converted),
                ];
                if prices.in_app_purchases.is_empty() {
                    wtr.write_record(base.iter().map(String::as_str).chain(["", "", ""]))?;
                }
                for iap in &prices.in_app_purchases {
                    let converted = fmt_opt(iap.converted_price);
                    wtr.write_record(base.iter().map(String::as_str).chain([
                        iap.name.as_str(),
                        iap.price_text.as_str(),
                        converted.as_str(),
                    ]))?;
                }
            }
            RegionOutcome::NotListed => {
                wtr.write_record([
                    rank.as_str(),
                    record.region_code.as_str(),
                    "not_listed",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                ])?;
            }
            RegionOutcome::Error { message } => {
                let status = format!("error: {}", message.replace(['\n', '\r'], " "));
                wtr.write_record([
                    rank.as_str(),
                    record.region_code.as_str(),
                    status.as_str(),
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                ])?;
            }
        }
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

/// Write `report` to `dir/<id>_<timestamp>.csv`. Returns the file path.
pub fn write_report(dir: &Path, report: &PriceReport) -> Result<PathBuf, DomainError> {
    let text = report_to_csv(report).map_err(|e| DomainError::Ui(format!("CSV: {}", e)))?;
    std::fs::create_dir_all(dir).map_err(|e| DomainError::Ui(e.to_string()))?;
    let path = dir.join(format!(
        "id{}_{}.csv",
        report.app.store_id,
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    std::fs::write(&path, text).map_err(|e| DomainError::Ui(e.to_string()))?;
    info!(path = %path.display(), "report exported");
    Ok(path)
}
