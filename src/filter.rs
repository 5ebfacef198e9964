use crate::dates::BillingPeriod;
use crate::error::BillingError;
use crate::leads::{LeadColumn, LeadRecord, LeadTable, SchemaWarning};
use crate::money;
use rust_decimal::Decimal;
use std::fmt;
use tracing::{info, info_span, warn};

/// Which rows make it onto the invoice. A `None`/`false` criterion is
/// disabled and keeps every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub status: Option<String>,
    pub period: Option<BillingPeriod>,
    pub require_mls: bool,
}

impl FilterCriteria {
    fn status_matches(status: &str, record: &LeadRecord) -> bool {
        record.status.as_deref() == Some(status)
    }

    fn listed_in(period: BillingPeriod, record: &LeadRecord) -> bool {
        record
            .listing_date
            .date()
            .is_some_and(|date| period.contains(date))
    }

    fn has_mls(record: &LeadRecord) -> bool {
        record.mls_number().is_some()
    }
}

/// Non-fatal conditions surfaced to the user. None of them abort a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    Schema(SchemaWarning),
    /// The status filter was asked for a value outside the known list.
    UnknownStatus(String),
    EmptyResult,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Schema(w) => match w.column {
                LeadColumn::Status | LeadColumn::ListingDate | LeadColumn::Mls => {
                    write!(f, "{w}; the matching filter is skipped")
                }
                _ => write!(f, "{w}"),
            },
            Warning::UnknownStatus(s) => write!(f, "Status '{s}' is not a known lead status"),
            Warning::EmptyResult => f.write_str(
                "No leads match the current filter criteria. Please adjust your filters.",
            ),
        }
    }
}

/// One applied filter and how many rows were left after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStep {
    pub description: String,
    pub remaining: usize,
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filtered to {} leads {}", self.remaining, self.description)
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutcome<'a> {
    pub records: Vec<&'a LeadRecord>,
    pub steps: Vec<FilterStep>,
    pub total: Decimal,
}

impl FilterOutcome<'_> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// Keep the rows that pass every enabled criterion, in source order.
///
/// A criterion whose column is absent from the export is treated as
/// disabled. The total is the exact `count × unit_price`; a total that
/// does not fit a `Decimal` fails with `InvalidConfiguration`.
pub fn apply_filters<'a>(
    table: &'a LeadTable,
    criteria: &FilterCriteria,
    unit_price: Decimal,
) -> Result<FilterOutcome<'a>, BillingError> {
    let span = info_span!("filter", rows = table.len());
    let _guard = span.enter();

    let mut records: Vec<&LeadRecord> = table.records.iter().collect();
    let mut steps = Vec::new();

    if let Some(status) = criteria.status.as_deref() {
        if table.has_column(LeadColumn::Status) {
            records.retain(|r| FilterCriteria::status_matches(status, r));
            steps.push(FilterStep {
                description: format!("with status: {status}"),
                remaining: records.len(),
            });
        } else {
            warn!(status = %status, "Status column missing, status filter skipped");
        }
    }

    if let Some(period) = criteria.period {
        if table.has_column(LeadColumn::ListingDate) {
            records.retain(|r| FilterCriteria::listed_in(period, r));
            steps.push(FilterStep {
                description: format!("listed in {period}"),
                remaining: records.len(),
            });
        } else {
            warn!(period = %period, "Listing date column missing, date filter skipped");
        }
    }

    if criteria.require_mls {
        if table.has_column(LeadColumn::Mls) {
            records.retain(|r| FilterCriteria::has_mls(r));
            steps.push(FilterStep {
                description: "with MLS numbers".to_string(),
                remaining: records.len(),
            });
        } else {
            warn!("MLS column missing, MLS filter skipped");
        }
    }

    for step in &steps {
        info!(remaining = step.remaining, "{}", step);
    }

    let total = money::total_for(records.len(), unit_price)?;
    info!(kept = records.len(), total = %total, "Filtering complete");

    Ok(FilterOutcome {
        records,
        steps,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnNames;
    use crate::leads::parse_leads;

    const HEADER: &str = "display_name,custom.Asset_MLS#,custom.Asset_MLS_Listing_Date,custom.All_State,custom.All_County,custom.All_APN,primary_opportunity_status_label";

    fn table(rows: &[&str]) -> LeadTable {
        let csv = format!("{HEADER}\n{}\n", rows.join("\n"));
        parse_leads(csv.as_bytes(), &ColumnNames::default()).unwrap()
    }

    fn sample() -> LeadTable {
        table(&[
            "A,MLS-1,2025-03-07 10:00:00,TX,Travis,1,Listed",
            "B,  ,2025-03-20,TX,Travis,2,Listed",
            "C,MLS-3,2025-04-01,TX,Travis,3,Listed",
            "D,MLS-4,2025-03-15,TX,Travis,4,Under Contract",
            "E,MLS-5,,TX,Travis,5,Listed",
            "F,MLS-6,sometime,TX,Travis,6,listed",
            "G,MLS-7,3/31/2025,TX,Travis,7,Listed",
        ])
    }

    fn names(outcome: &FilterOutcome<'_>) -> Vec<String> {
        outcome
            .records
            .iter()
            .map(|r| r.display_name.clone().unwrap_or_default())
            .collect()
    }

    fn all_filters() -> FilterCriteria {
        FilterCriteria {
            status: Some("Listed".to_string()),
            period: Some(BillingPeriod::new(3, 2025).unwrap()),
            require_mls: true,
        }
    }

    #[test]
    fn test_status_filter_counts() {
        let t = table(&[
            "A,1,2025-03-01,TX,X,1,Listed",
            "B,2,2025-03-01,TX,X,2,Purchased",
            "C,3,2025-03-01,TX,X,3,Listed",
        ]);
        let criteria = FilterCriteria {
            status: Some("Listed".to_string()),
            period: None,
            require_mls: false,
        };
        let outcome = apply_filters(&t, &criteria, Decimal::from(200)).unwrap();

        assert_eq!(outcome.count(), 2);
        assert_eq!(names(&outcome), ["A", "C"]);
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(
            outcome.steps[0].to_string(),
            "Filtered to 2 leads with status: Listed"
        );
    }

    #[test]
    fn test_all_filters_preserve_order() {
        let t = sample();
        let outcome = apply_filters(&t, &all_filters(), Decimal::from(200)).unwrap();

        assert_eq!(names(&outcome), ["A", "G"]);
        assert_eq!(outcome.total, Decimal::from(400));
        let steps: Vec<String> = outcome.steps.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            steps,
            [
                "Filtered to 5 leads with status: Listed",
                "Filtered to 3 leads listed in March 2025",
                "Filtered to 2 leads with MLS numbers",
            ]
        );
    }

    #[test]
    fn test_disabled_filters_keep_everything() {
        let t = sample();
        let criteria = FilterCriteria {
            status: None,
            period: None,
            require_mls: false,
        };
        let outcome = apply_filters(&t, &criteria, Decimal::from(200)).unwrap();

        assert_eq!(outcome.count(), t.len());
        assert!(outcome.steps.is_empty());
    }

    #[test]
    fn test_mls_survivors_have_trimmed_numbers() {
        let t = sample();
        let criteria = FilterCriteria {
            status: None,
            period: None,
            require_mls: true,
        };
        let outcome = apply_filters(&t, &criteria, Decimal::ONE).unwrap();

        assert_eq!(outcome.count(), 6);
        for record in &outcome.records {
            let mls = record.mls.as_deref().unwrap();
            assert!(!mls.trim().is_empty());
        }
    }

    #[test]
    fn test_date_survivors_are_in_period() {
        let t = sample();
        let period = BillingPeriod::new(3, 2025).unwrap();
        let criteria = FilterCriteria {
            status: None,
            period: Some(period),
            require_mls: false,
        };
        let outcome = apply_filters(&t, &criteria, Decimal::ONE).unwrap();

        assert_eq!(names(&outcome), ["A", "B", "D", "G"]);
        for record in &outcome.records {
            assert!(period.contains(record.listing_date.date().unwrap()));
        }
    }

    #[test]
    fn test_filters_commute() {
        let t = sample();
        let criteria = all_filters();
        let status = criteria.status.as_deref().unwrap();
        let period = criteria.period.unwrap();

        let forward = apply_filters(&t, &criteria, Decimal::ONE).unwrap();

        let mut reversed: Vec<&LeadRecord> = t.records.iter().collect();
        reversed.retain(|r| FilterCriteria::has_mls(r));
        reversed.retain(|r| FilterCriteria::listed_in(period, r));
        reversed.retain(|r| FilterCriteria::status_matches(status, r));

        let mut shuffled: Vec<&LeadRecord> = t.records.iter().collect();
        shuffled.retain(|r| FilterCriteria::listed_in(period, r));
        shuffled.retain(|r| FilterCriteria::status_matches(status, r));
        shuffled.retain(|r| FilterCriteria::has_mls(r));

        assert_eq!(forward.records, reversed);
        assert_eq!(forward.records, shuffled);
    }

    #[test]
    fn test_missing_column_degrades_to_noop() {
        let csv = "display_name,custom.Asset_MLS#\nA,MLS-1\nB,\n";
        let t = parse_leads(csv.as_bytes(), &ColumnNames::default()).unwrap();
        let outcome = apply_filters(&t, &all_filters(), Decimal::from(200)).unwrap();

        // Status and date columns are absent; only the MLS filter applies.
        assert_eq!(names(&outcome), ["A"]);
        assert_eq!(outcome.steps.len(), 1);
    }

    #[test]
    fn test_empty_result_is_valid() {
        let t = sample();
        let criteria = FilterCriteria {
            status: Some("Purchased".to_string()),
            period: None,
            require_mls: false,
        };
        let outcome = apply_filters(&t, &criteria, Decimal::from(200)).unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.total, Decimal::ZERO);
    }

    #[test]
    fn test_total_is_count_times_price() {
        let t = sample();
        let price: Decimal = "199.99".parse().unwrap();
        let outcome = apply_filters(
            &t,
            &FilterCriteria {
                status: None,
                period: None,
                require_mls: false,
            },
            price,
        )
        .unwrap();
        assert_eq!(outcome.total, price * Decimal::from(7));
    }

    #[test]
    fn test_overflowing_total_is_an_error() {
        let t = sample();
        let criteria = FilterCriteria {
            status: Some("Listed".to_string()),
            period: None,
            require_mls: false,
        };
        let err = apply_filters(&t, &criteria, Decimal::MAX).unwrap_err();
        assert!(matches!(err, BillingError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_schema_warning_mentions_skipped_filter_only_for_filter_columns() {
        let csv = "custom.Asset_MLS#\nMLS-1\n";
        let t = parse_leads(csv.as_bytes(), &ColumnNames::default()).unwrap();
        let shown: Vec<(LeadColumn, String)> = t
            .warnings
            .iter()
            .map(|w| (w.column, Warning::Schema(w.clone()).to_string()))
            .collect();

        for (column, text) in &shown {
            let skipped = text.ends_with("; the matching filter is skipped");
            match column {
                LeadColumn::Status | LeadColumn::ListingDate => assert!(skipped, "{text}"),
                _ => assert!(!skipped, "{text}"),
            }
        }
        assert!(shown.iter().any(|(c, _)| *c == LeadColumn::County));
        assert!(shown.iter().any(|(c, _)| *c == LeadColumn::Status));
    }
}
