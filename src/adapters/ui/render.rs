//! Plain-text rendering of result pages and price reports.

use crate::domain::regions;
use crate::domain::{AppCandidate, PriceReport, PriceSource, RegionOutcome, RegionPriceRecord};
use crate::usecases::ResultsPage;
use std::fmt::Write;

/// One candidate line, numbered from 1 across pages.
pub fn candidate_label(position: usize, app: &AppCandidate) -> String {
    let mut label = format!("{}. {}", position + 1, app.name);
    if let Some(dev) = &app.developer {
        let _ = write!(label, " ({})", dev);
    }
    if let Some(price) = &app.formatted_price {
        let _ = write!(label, " [{}]", price);
    }
    label
}

pub fn results_header(page: &ResultsPage) -> String {
    let mut out = format!(
        "{} search for \"{}\" in {} {}",
        page.platform.display_name(),
        page.query,
        regions::flag(&page.region),
        regions::display_name(&page.region),
    );
    if let Some(err) = &page.error {
        let _ = write!(out, "\nSearch failed: {}", err);
    } else if page.total_results == 0 {
        out.push_str("\nNo apps found.");
    } else {
        let _ = write!(
            out,
            "\n{} results, page {}/{}",
            page.total_results, page.page, page.total_pages
        );
    }
    out
}

fn money(value: f64, currency: &str) -> String {
    format!("{:.2} {}", value, currency)
}

fn record_block(record: &RegionPriceRecord, reference: &str) -> String {
    let mut out = format!(
        "{} {} ({})",
        regions::flag(&record.region_code),
        record.region_name,
        record.region_code
    );
    let (prices, source) = match &record.outcome {
        RegionOutcome::Ok { prices, source } => (prices, source),
        _ => {
            if let Some(status) = record.status_line() {
                let _ = write!(out, ": {}", status);
            }
            return out;
        }
    };

    if prices.base.is_free() {
        out.push_str("\n  App: free");
    } else {
        let _ = write!(out, "\n  App: {}", money(prices.base.amount, &prices.base.currency));
        match prices.base.converted {
            Some(c) => {
                let _ = write!(out, " (~{})", money(c, reference));
            }
            None => out.push_str(" (no rate)"),
        }
    }
    for iap in &prices.in_app_purchases {
        let _ = write!(out, "\n  - {}: {}", iap.name, iap.price_text);
        if let Some(c) = iap.converted_price {
            let _ = write!(out, " (~{})", money(c, reference));
        }
    }
    if let PriceSource::Cached { stored_at } = source {
        let _ = write!(out, "\n  cached {}", stored_at.format("%Y-%m-%d %H:%M UTC"));
    }
    out
}

/// Full report: header, priced regions cheapest first, then unavailable ones.
pub fn price_report(report: &PriceReport) -> String {
    let mut out = format!(
        "{} ({})\nApp ID: id{}",
        report.app.name,
        report.platform.display_name(),
        report.app.store_id
    );
    if let Some(plan) = &report.common_plan {
        let _ = write!(out, "\nRanked by: {}", plan);
    }
    out.push('\n');

    if report.priced().next().is_none() {
        out.push_str("\nNo price found in the requested regions.");
    }
    for record in report.priced() {
        out.push('\n');
        out.push_str(&record_block(record, &report.reference_currency));
    }
    let unavailable: Vec<String> = report
        .unavailable()
        .map(|r| record_block(r, &report.reference_currency))
        .collect();
    if !unavailable.is_empty() {
        out.push_str("\n\n");
        out.push_str(&unavailable.join("\n"));
    }
    out
}
