// src/billing.rs

use crate::error::BillingError;
use crate::filter::{FilterOutcome, Warning, apply_filters};
use crate::invoice::{Invoice, invoice_file_name};
use crate::leads::LeadTable;
use crate::render::render_invoice;
use crate::request::BillingRequest;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Filtered rows for one request plus every warning gathered so far.
#[derive(Debug)]
pub struct PreparedBilling<'a> {
    pub outcome: FilterOutcome<'a>,
    pub warnings: Vec<Warning>,
}

/// Run the filters for `request`. Schema warnings from ingestion are
/// carried along; an empty result adds [`Warning::EmptyResult`].
pub fn prepare<'a>(
    table: &'a LeadTable,
    request: &BillingRequest,
    mut warnings: Vec<Warning>,
) -> Result<PreparedBilling<'a>, BillingError> {
    warnings.extend(table.warnings.iter().cloned().map(Warning::Schema));

    let outcome = apply_filters(table, &request.criteria, request.unit_price)?;
    if outcome.is_empty() {
        warn!(rows = table.len(), "No leads match the current filter criteria");
        warnings.push(Warning::EmptyResult);
    }

    Ok(PreparedBilling { outcome, warnings })
}

#[derive(Debug, PartialEq, Eq)]
pub enum Generated {
    Written {
        path: PathBuf,
        line_items: usize,
        total: Decimal,
    },
    /// Nothing matched the filters, so no document was produced.
    Skipped,
}

/// Build the invoice PDF and write it into `out_dir`.
///
/// The file only appears once the whole document has been rendered and
/// written; on any failure nothing is left behind.
pub fn generate(
    prepared: &PreparedBilling<'_>,
    request: &BillingRequest,
    out_dir: &Path,
) -> Result<Generated, BillingError> {
    if prepared.outcome.is_empty() {
        return Ok(Generated::Skipped);
    }

    let invoice = Invoice::build(&prepared.outcome.records, request)?;
    let bytes = render_invoice(&invoice)?;

    let file_name = invoice_file_name(&request.organization, request.period, request.billing_date);
    let path = out_dir.join(&file_name);
    write_atomically(&path, &bytes)?;

    info!(
        path = %path.display(),
        line_items = invoice.lines.len(),
        total = %invoice.summary.total,
        "Invoice written"
    );

    Ok(Generated::Written {
        path,
        line_items: invoice.lines.len(),
        total: invoice.summary.total,
    })
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), BillingError> {
    let partial = path.with_extension("pdf.part");
    let result = fs::write(&partial, bytes).and_then(|()| fs::rename(&partial, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&partial);
        return Err(BillingError::io(format!("writing {}", path.display()), e));
    }
    Ok(())
}
