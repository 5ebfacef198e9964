// src/preview.rs

use crate::filter::FilterOutcome;
use crate::invoice::InvoiceLineItem;
use crate::leads::LeadRecord;
use crate::money;
use crate::request::BillingRequest;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

/// Headline numbers shown above the preview rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewMetrics {
    pub total_listings: usize,
    pub total_amount: String,
    pub billing_period: String,
}

impl PreviewMetrics {
    pub fn new(outcome: &FilterOutcome<'_>, request: &BillingRequest) -> Self {
        Self {
            total_listings: outcome.count(),
            total_amount: money::format_grouped(outcome.total),
            billing_period: request.period.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PreviewReport {
    metrics: PreviewMetrics,
    filters: Vec<String>,
    lines: Vec<InvoiceLineItem>,
}

/// The surviving rows as they appear in the export, one table row each.
pub fn rows_table(records: &[&LeadRecord]) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Property Name",
            "MLS#",
            "Listing Date",
            "State",
            "County",
            "APN",
        ]);

    for record in records {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        table.add_row(vec![
            Cell::new(text(&record.display_name)),
            Cell::new(text(&record.mls)),
            Cell::new(text(&record.listing_date_raw)),
            Cell::new(text(&record.state)),
            Cell::new(text(&record.county)),
            Cell::new(text(&record.apn)),
        ]);
    }
    table
}

fn metrics_table(metrics: &PreviewMetrics) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Total Listings", "Total Amount", "Billing Period"]);
    table.add_row(vec![
        Cell::new(metrics.total_listings).set_alignment(CellAlignment::Right),
        Cell::new(&metrics.total_amount).set_alignment(CellAlignment::Right),
        Cell::new(&metrics.billing_period),
    ]);
    table
}

/// Human-readable preview: metrics block followed by the row table.
pub fn render_text(outcome: &FilterOutcome<'_>, request: &BillingRequest) -> String {
    let metrics = PreviewMetrics::new(outcome, request);
    format!(
        "{}\n\n{}\n",
        metrics_table(&metrics),
        rows_table(&outcome.records)
    )
}

/// Machine-readable preview including the invoice line items exactly as
/// they will be rendered.
pub fn render_json(
    outcome: &FilterOutcome<'_>,
    request: &BillingRequest,
) -> Result<String, serde_json::Error> {
    let report = PreviewReport {
        metrics: PreviewMetrics::new(outcome, request),
        filters: outcome.steps.iter().map(ToString::to_string).collect(),
        lines: outcome
            .records
            .iter()
            .map(|r| InvoiceLineItem::from_record(r, request.unit_price))
            .collect(),
    };
    serde_json::to_string_pretty(&report)
}
