// src/leads.rs

use crate::config::ColumnNames;
use crate::dates::ListingDate;
use crate::error::BillingError;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// The columns the billing flow knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadColumn {
    DisplayName,
    Mls,
    ListingDate,
    State,
    County,
    Apn,
    Status,
}

impl LeadColumn {
    pub const ALL: [LeadColumn; 7] = [
        LeadColumn::DisplayName,
        LeadColumn::Mls,
        LeadColumn::ListingDate,
        LeadColumn::State,
        LeadColumn::County,
        LeadColumn::Apn,
        LeadColumn::Status,
    ];

    pub fn header<'a>(&self, names: &'a ColumnNames) -> &'a str {
        match self {
            LeadColumn::DisplayName => &names.display_name,
            LeadColumn::Mls => &names.mls,
            LeadColumn::ListingDate => &names.listing_date,
            LeadColumn::State => &names.state,
            LeadColumn::County => &names.county,
            LeadColumn::Apn => &names.apn,
            LeadColumn::Status => &names.status,
        }
    }
}

impl fmt::Display for LeadColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LeadColumn::DisplayName => "display name",
            LeadColumn::Mls => "MLS number",
            LeadColumn::ListingDate => "listing date",
            LeadColumn::State => "state",
            LeadColumn::County => "county",
            LeadColumn::Apn => "APN",
            LeadColumn::Status => "status",
        };
        f.write_str(label)
    }
}

/// An expected column that is absent from the export header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaWarning {
    pub column: LeadColumn,
    pub header: String,
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column '{}' ({}) not found in CSV",
            self.header, self.column
        )
    }
}

/// One row of the CRM export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadRecord {
    /// 1-based data row number in the source file.
    pub row: usize,
    pub display_name: Option<String>,
    pub mls: Option<String>,
    pub listing_date_raw: Option<String>,
    pub listing_date: ListingDate,
    pub state: Option<String>,
    pub county: Option<String>,
    pub apn: Option<String>,
    pub status: Option<String>,
}

impl LeadRecord {
    /// MLS number with surrounding whitespace removed, if any is left.
    pub fn mls_number(&self) -> Option<&str> {
        self.mls.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// All rows of an export plus what was learned about its header.
#[derive(Debug, Clone)]
pub struct LeadTable {
    pub records: Vec<LeadRecord>,
    present: Vec<LeadColumn>,
    pub warnings: Vec<SchemaWarning>,
}

impl LeadTable {
    pub fn has_column(&self, column: LeadColumn) -> bool {
        self.present.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn load_leads(path: impl AsRef<Path>, names: &ColumnNames) -> Result<LeadTable, BillingError> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).map_err(|e| BillingError::io(format!("reading {}", path.display()), e))?;
    info!(path = %path.display(), bytes = bytes.len(), "Loaded CSV export");
    parse_leads(&bytes, names)
}

/// Parse an in-memory CSV export into typed records.
///
/// Absent expected columns are reported once in [`LeadTable::warnings`];
/// their fields stay empty on every record.
pub fn parse_leads(content: &[u8], names: &ColumnNames) -> Result<LeadTable, BillingError> {
    let span = tracing::info_span!("ingest");
    let _guard = span.enter();

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(BillingError::Ingestion(
            "No columns to parse from file".to_string(),
        ));
    }

    let mut index = [None; LeadColumn::ALL.len()];
    let mut present = Vec::new();
    let mut warnings = Vec::new();
    for (slot, column) in index.iter_mut().zip(LeadColumn::ALL) {
        let header = column.header(names);
        match headers.iter().position(|h| h == header) {
            Some(pos) => {
                *slot = Some(pos);
                present.push(column);
            }
            None => {
                let warning = SchemaWarning {
                    column,
                    header: header.to_string(),
                };
                warn!(column = %column, header = %header, "Expected column missing");
                warnings.push(warning);
            }
        }
    }

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let cell = |column: LeadColumn| -> Option<String> {
            let pos = index[column as usize]?;
            record
                .get(pos)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        };

        let listing_date_raw = cell(LeadColumn::ListingDate);
        records.push(LeadRecord {
            row: i + 1,
            display_name: cell(LeadColumn::DisplayName),
            mls: cell(LeadColumn::Mls),
            listing_date: ListingDate::from_raw(listing_date_raw.as_deref()),
            listing_date_raw,
            state: cell(LeadColumn::State),
            county: cell(LeadColumn::County),
            apn: cell(LeadColumn::Apn),
            status: cell(LeadColumn::Status),
        });
    }

    info!(
        rows = records.len(),
        columns = headers.len(),
        missing = warnings.len(),
        "Parsed leads"
    );

    Ok(LeadTable {
        records,
        present,
        warnings,
    })
}
