// src/invoice.rs

use crate::dates::{BillingPeriod, format_us_date};
use crate::error::BillingError;
use crate::leads::LeadRecord;
use crate::money;
use crate::request::BillingRequest;
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Month};

/// Marker in CRM display names after which the parcel number was appended.
const APN_MARKER: &str = "APN";

/// One rendered row of the invoice table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLineItem {
    pub date: String,
    pub mls: String,
    pub property: String,
    pub price: String,
}

impl InvoiceLineItem {
    /// Never fails: missing fields become blank cells.
    pub fn from_record(record: &LeadRecord, unit_price: Decimal) -> Self {
        Self {
            date: record.listing_date.cell_text(),
            mls: record.mls.as_deref().map(str::trim).unwrap_or("").to_string(),
            property: property_description(record),
            price: money::format_plain(unit_price),
        }
    }

    pub fn cells(&self) -> [&str; 4] {
        [&self.date, &self.mls, &self.property, &self.price]
    }
}

/// Display name with everything from the first "APN" onward removed.
pub fn base_property_name(display_name: &str) -> &str {
    match display_name.find(APN_MARKER) {
        Some(pos) => display_name[..pos].trim(),
        None => display_name.trim(),
    }
}

/// `<state> <county> <base name> APN# <apn>`, skipping empty parts.
pub fn property_description(record: &LeadRecord) -> String {
    let apn = record
        .apn
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|apn| format!("APN# {apn}"));

    [
        record.state.as_deref().map(str::trim),
        record.county.as_deref().map(str::trim),
        record.display_name.as_deref().map(base_property_name),
        apn.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceSummary {
    pub count: usize,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub billing_period: String,
    pub billing_date: String,
}

impl InvoiceSummary {
    pub fn new(
        count: usize,
        unit_price: Decimal,
        period: BillingPeriod,
        billing_date: Date,
    ) -> Result<Self, BillingError> {
        Ok(Self {
            count,
            unit_price,
            total: money::total_for(count, unit_price)?,
            billing_period: period.to_string(),
            billing_date: format_us_date(billing_date),
        })
    }

    pub fn total_display(&self) -> String {
        money::format_grouped(self.total)
    }
}

/// Everything the renderer needs, already formatted.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub title: String,
    pub headers: [String; 4],
    pub lines: Vec<InvoiceLineItem>,
    pub summary: InvoiceSummary,
}

impl Invoice {
    pub fn build(records: &[&LeadRecord], request: &BillingRequest) -> Result<Self, BillingError> {
        let period = request.period;
        let title = invoice_title(&request.organization, period.month_number())?;
        let lines = records
            .iter()
            .map(|r| InvoiceLineItem::from_record(r, request.unit_price))
            .collect::<Vec<_>>();
        let summary = InvoiceSummary::new(
            lines.len(),
            request.unit_price,
            period,
            request.billing_date,
        )?;

        Ok(Self {
            title,
            headers: [
                "Date".to_string(),
                "MLS".to_string(),
                "Property".to_string(),
                request.payer.clone(),
            ],
            lines,
            summary,
        })
    }
}

/// "GOODFIRE REALTY LISTINGS - MARCH BILLING"
pub fn invoice_title(organization: &str, month: u8) -> Result<String, BillingError> {
    let month = Month::try_from(month).map_err(|_| BillingError::InvalidDate(month))?;
    Ok(format!(
        "{} LISTINGS - {} BILLING",
        organization.to_uppercase(),
        month.to_string().to_uppercase()
    ))
}

/// `2025-03-07_Goodfire_Realty_Billing.pdf`: billing year and month, then
/// the day the invoice was generated.
pub fn invoice_file_name(organization: &str, period: BillingPeriod, today: Date) -> String {
    let org = organization.split_whitespace().collect::<Vec<_>>().join("_");
    format!(
        "{}-{:02}-{:02}_{}_Billing.pdf",
        period.year,
        period.month_number(),
        today.day(),
        org
    )
}
