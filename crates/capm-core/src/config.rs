use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::error::{CapmError, CapmResult};
use crate::types::{Annualization, ReturnUnit};

/// Per-run analysis settings. One convention of each kind applies to every
/// asset in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapmConfig {
    pub risk_free_rate: f64,         // annual, as a fraction
    pub annualization: Annualization,
    pub periods_per_year: u32,       // 252 trading days
    pub return_unit: ReturnUnit,
    pub neutral_beta_epsilon: f64,   // |beta - 1| within this is market-neutral
    pub parallel: bool,              // per-asset stage on rayon

    // Data selection, used by callers that fetch through a PriceSource
    pub benchmark_symbol: String,
    pub lookback_years: u32,
}

impl Default for CapmConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            annualization: Annualization::Geometric,
            periods_per_year: 252,
            return_unit: ReturnUnit::Fraction,
            neutral_beta_epsilon: 1e-6,
            parallel: true,
            benchmark_symbol: "^GSPC".to_string(),
            lookback_years: 1,
        }
    }
}

impl CapmConfig {
    pub fn from_env() -> CapmResult<Self> {
        let defaults = Self::default();

        let annualization = match env::var("CAPM_ANNUALIZATION") {
            Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
                "arithmetic" => Annualization::Arithmetic,
                "geometric" => Annualization::Geometric,
                other => {
                    return Err(CapmError::Config(format!(
                        "CAPM_ANNUALIZATION must be 'arithmetic' or 'geometric', got '{other}'"
                    )))
                }
            },
            Err(_) => defaults.annualization,
        };

        let return_unit = match env::var("CAPM_RETURN_UNIT") {
            Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
                "fraction" => ReturnUnit::Fraction,
                "percent" => ReturnUnit::Percent,
                other => {
                    return Err(CapmError::Config(format!(
                        "CAPM_RETURN_UNIT must be 'fraction' or 'percent', got '{other}'"
                    )))
                }
            },
            Err(_) => defaults.return_unit,
        };

        let config = Self {
            risk_free_rate: parse_var("CAPM_RISK_FREE_RATE", defaults.risk_free_rate)?,
            annualization,
            periods_per_year: parse_var("CAPM_PERIODS_PER_YEAR", defaults.periods_per_year)?,
            return_unit,
            neutral_beta_epsilon: parse_var(
                "CAPM_NEUTRAL_BETA_EPSILON",
                defaults.neutral_beta_epsilon,
            )?,
            parallel: parse_var("CAPM_PARALLEL", defaults.parallel)?,
            benchmark_symbol: env::var("CAPM_BENCHMARK").unwrap_or(defaults.benchmark_symbol),
            lookback_years: parse_var("CAPM_LOOKBACK_YEARS", defaults.lookback_years)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CapmResult<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(CapmError::Config("risk_free_rate must be finite".to_string()));
        }
        if self.periods_per_year == 0 {
            return Err(CapmError::Config("periods_per_year must be positive".to_string()));
        }
        if !(self.neutral_beta_epsilon >= 0.0 && self.neutral_beta_epsilon.is_finite()) {
            return Err(CapmError::Config(
                "neutral_beta_epsilon must be a finite non-negative number".to_string(),
            ));
        }
        if !(1..=10).contains(&self.lookback_years) {
            return Err(CapmError::Config(format!(
                "lookback_years must be between 1 and 10, got {}",
                self.lookback_years
            )));
        }
        if self.benchmark_symbol.trim().is_empty() {
            return Err(CapmError::Config("benchmark_symbol must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> CapmResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CapmError::Config(format!("{key} has an invalid value '{raw}'"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CapmConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.annualization, Annualization::Geometric);
        assert_eq!(config.periods_per_year, 252);
        assert_eq!(config.neutral_beta_epsilon, 1e-6);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CapmConfig {
            periods_per_year: 0,
            ..CapmConfig::default()
        };
        assert!(matches!(config.validate(), Err(CapmError::Config(_))));

        let config = CapmConfig {
            neutral_beta_epsilon: -1.0,
            ..CapmConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CapmConfig {
            lookback_years: 11,
            ..CapmConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CapmConfig {
            risk_free_rate: f64::NAN,
            ..CapmConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_names() {
        let json = serde_json::to_value(CapmConfig::default()).unwrap();
        assert_eq!(json["annualization"], "geometric");
        assert_eq!(json["return_unit"], "fraction");
    }
}
