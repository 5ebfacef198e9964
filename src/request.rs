// src/request.rs

use crate::config::Config;
use crate::dates::BillingPeriod;
use crate::error::BillingError;
use crate::filter::{FilterCriteria, Warning};
use crate::money;
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use tracing::warn;

/// Values the user supplied for this run. Anything left `None` falls back to
/// the config file, then to today's date.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub payer: Option<String>,
    pub price: Option<String>,
    pub month: Option<u8>,
    pub year: Option<i32>,
    pub status: Option<String>,
    pub filter_by_status: bool,
    pub filter_by_date: bool,
    pub require_mls: bool,
}

#[cfg(test)]
impl RequestOverrides {
    /// All filters on, nothing overridden.
    pub fn with_all_filters() -> Self {
        Self {
            filter_by_status: true,
            filter_by_date: true,
            require_mls: true,
            ..Self::default()
        }
    }
}

/// Immutable, validated input for one filter + render pass.
#[derive(Debug, Clone)]
pub struct BillingRequest {
    pub organization: String,
    pub payer: String,
    pub unit_price: Decimal,
    pub period: BillingPeriod,
    pub criteria: FilterCriteria,
    pub billing_date: Date,
}

impl BillingRequest {
    /// Validate user input against the config. Fails before any rendering
    /// work with `InvalidConfiguration` when the price or billing period is
    /// out of range.
    pub fn resolve(
        cfg: &Config,
        overrides: &RequestOverrides,
        today: Date,
    ) -> Result<(Self, Vec<Warning>), BillingError> {
        let mut warnings = Vec::new();

        let raw_price = overrides
            .price
            .as_deref()
            .unwrap_or(&cfg.defaults.price_per_listing);
        let unit_price = money::parse_unit_price(raw_price)?;

        let month = overrides.month.unwrap_or(u8::from(today.month()));
        if !(1..=12).contains(&month) {
            return Err(BillingError::InvalidConfiguration(format!(
                "billing month {month} is outside 1-12"
            )));
        }
        let year = overrides.year.unwrap_or(today.year());
        let (min_year, max_year) = (cfg.billing.min_year, cfg.billing.max_year);
        if !(min_year..=max_year).contains(&year) {
            return Err(BillingError::InvalidConfiguration(format!(
                "billing year {year} is outside {min_year}-{max_year}"
            )));
        }
        let period = BillingPeriod::new(month, year)?;

        let payer = overrides
            .payer
            .clone()
            .unwrap_or_else(|| cfg.defaults.payer.clone());

        let status = if overrides.filter_by_status {
            let status = overrides
                .status
                .clone()
                .unwrap_or_else(|| cfg.defaults.status.clone());
            if !cfg.billing.statuses.contains(&status) {
                warn!(status = %status, known = ?cfg.billing.statuses, "Unknown status value");
                warnings.push(Warning::UnknownStatus(status.clone()));
            }
            Some(status)
        } else {
            None
        };

        let request = Self {
            organization: cfg.organization.name.clone(),
            payer,
            unit_price,
            period,
            criteria: FilterCriteria {
                status,
                period: overrides.filter_by_date.then_some(period),
                require_mls: overrides.require_mls,
            },
            billing_date: today,
        };
        Ok((request, warnings))
    }
}

/// Today's date in local time, UTC when the local offset is unavailable.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;
    use time::macros::date;

    const TODAY: Date = date!(2025 - 03 - 07);

    #[test]
    fn test_defaults_follow_today_and_config() {
        let cfg = Config::default();
        let (request, warnings) =
            BillingRequest::resolve(&cfg, &RequestOverrides::with_all_filters(), TODAY).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(request.payer, "RLV22 LLC");
        assert_eq!(request.unit_price, Decimal::from(200));
        assert_eq!(request.period.month, Month::March);
        assert_eq!(request.period.year, 2025);
        assert_eq!(request.criteria.status.as_deref(), Some("Listed"));
        assert_eq!(request.criteria.period, Some(request.period));
        assert!(request.criteria.require_mls);
        assert_eq!(request.organization, "Goodfire Realty");
    }

    #[test]
    fn test_overrides_win() {
        let overrides = RequestOverrides {
            payer: Some("Acme".to_string()),
            price: Some("150.5".to_string()),
            month: Some(11),
            year: Some(2024),
            status: Some("Purchased".to_string()),
            filter_by_status: true,
            filter_by_date: false,
            require_mls: false,
        };
        let (request, _) = BillingRequest::resolve(&Config::default(), &overrides, TODAY).unwrap();

        assert_eq!(request.payer, "Acme");
        assert_eq!(request.unit_price, "150.5".parse::<Decimal>().unwrap());
        assert_eq!(request.period, BillingPeriod::new(11, 2024).unwrap());
        assert_eq!(request.criteria.status.as_deref(), Some("Purchased"));
        assert_eq!(request.criteria.period, None);
        assert!(!request.criteria.require_mls);
    }

    #[test]
    fn test_disabled_status_filter_ignores_status_value() {
        let overrides = RequestOverrides {
            status: Some("Listed".to_string()),
            ..RequestOverrides::default()
        };
        let (request, _) = BillingRequest::resolve(&Config::default(), &overrides, TODAY).unwrap();
        assert_eq!(request.criteria.status, None);
    }

    #[test]
    fn test_rejects_out_of_range_input() {
        let cfg = Config::default();
        for overrides in [
            RequestOverrides {
                price: Some("-1".to_string()),
                ..RequestOverrides::default()
            },
            RequestOverrides {
                price: Some("abc".to_string()),
                ..RequestOverrides::default()
            },
            RequestOverrides {
                month: Some(13),
                ..RequestOverrides::default()
            },
            RequestOverrides {
                year: Some(2019),
                ..RequestOverrides::default()
            },
            RequestOverrides {
                year: Some(2031),
                ..RequestOverrides::default()
            },
        ] {
            let err = BillingRequest::resolve(&cfg, &overrides, TODAY).unwrap_err();
            assert!(
                matches!(err, BillingError::InvalidConfiguration(_)),
                "{overrides:?}"
            );
        }
    }

    #[test]
    fn test_unknown_status_warns() {
        let overrides = RequestOverrides {
            status: Some("Closed Lost".to_string()),
            ..RequestOverrides::with_all_filters()
        };
        let (request, warnings) =
            BillingRequest::resolve(&Config::default(), &overrides, TODAY).unwrap();

        assert_eq!(request.criteria.status.as_deref(), Some("Closed Lost"));
        assert_eq!(
            warnings,
            vec![Warning::UnknownStatus("Closed Lost".to_string())]
        );
    }
}
