use crate::error::BillingError;
use serde::Deserialize;
use std::{fs, io, path::Path};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub organization: OrganizationConfig,
    pub defaults: DefaultsConfig,
    pub billing: BillingLimits,
    pub columns: ColumnNames,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OrganizationConfig {
    /// Shown upper-cased in the invoice title and underscored in the file name.
    pub name: String,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            name: "Goodfire Realty".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub payer: String,
    /// Kept as text so a bad value surfaces as an invalid-configuration error
    /// instead of a TOML type error.
    pub price_per_listing: String,
    pub status: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            payer: "RLV22 LLC".to_string(),
            price_per_listing: "200.00".to_string(),
            status: "Listed".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BillingLimits {
    pub min_year: i32,
    pub max_year: i32,
    pub statuses: Vec<String>,
}

impl Default for BillingLimits {
    fn default() -> Self {
        Self {
            min_year: 2020,
            max_year: 2030,
            statuses: vec![
                "Listed".to_string(),
                "Under Contract".to_string(),
                "Purchased".to_string(),
            ],
        }
    }
}

/// Header names of the expected columns in the CRM export.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub display_name: String,
    pub mls: String,
    pub listing_date: String,
    pub state: String,
    pub county: String,
    pub apn: String,
    pub status: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            display_name: "display_name".to_string(),
            mls: "custom.Asset_MLS#".to_string(),
            listing_date: "custom.Asset_MLS_Listing_Date".to_string(),
            state: "custom.All_State".to_string(),
            county: "custom.All_County".to_string(),
            apn: "custom.All_APN".to_string(),
            status: "primary_opportunity_status_label".to_string(),
        }
    }
}

impl Config {
    /// Load the config file, falling back to built-in defaults when it does
    /// not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BillingError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| match e {
                BillingError::InvalidConfiguration(msg) => {
                    BillingError::InvalidConfiguration(format!("{}: {msg}", path.display()))
                }
                other => other,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(BillingError::io(format!("reading {}", path.display()), e)),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, BillingError> {
        let cfg: Config =
            toml::from_str(content).map_err(|e| BillingError::InvalidConfiguration(e.to_string()))?;
        if cfg.billing.min_year > cfg.billing.max_year {
            return Err(BillingError::InvalidConfiguration(format!(
                "billing.min_year ({}) is after billing.max_year ({})",
                cfg.billing.min_year, cfg.billing.max_year
            )));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
            [defaults]
            payer = "Acme Holdings"

            [columns]
            mls = "MLS Number"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.defaults.payer, "Acme Holdings");
        assert_eq!(cfg.defaults.price_per_listing, "200.00");
        assert_eq!(cfg.columns.mls, "MLS Number");
        assert_eq!(cfg.columns.display_name, "display_name");
        assert_eq!(cfg.organization.name, "Goodfire Realty");
        assert_eq!(cfg.billing.min_year, 2020);
    }

    #[test]
    fn test_inverted_year_range_is_rejected() {
        let err = Config::from_toml("[billing]\nmin_year = 2031\nmax_year = 2030\n").unwrap_err();
        assert!(matches!(err, BillingError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let err = Config::from_toml("[defaults\npayer = 1").unwrap_err();
        assert!(matches!(err, BillingError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults.status, "Listed");
        assert_eq!(cfg.billing.statuses.len(), 3);
    }
}
