use capm_core::{
    Annualization, CapmConfig, CapmError, CapmEstimate, CapmResult, RegressionResult, ReturnUnit,
    VolatilityClass,
};
use statrs::statistics::Statistics;

/// CAPM expected return: `rf + beta * (rm - rf)`
pub fn expected_return(beta: f64, market_return: f64, risk_free_rate: f64) -> f64 {
    risk_free_rate + beta * (market_return - risk_free_rate)
}

/// Turns a regression beta into a CAPM estimate.
///
/// Holds one annualization convention and one risk-free rate so that every
/// asset of a batch is priced the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct CapmEstimator {
    risk_free_rate: f64,
    annualization: Annualization,
    periods_per_year: u32,
    return_unit: ReturnUnit,
    neutral_beta_epsilon: f64,
}

impl CapmEstimator {
    pub fn new(config: &CapmConfig) -> Self {
        Self {
            risk_free_rate: config.risk_free_rate,
            annualization: config.annualization,
            periods_per_year: config.periods_per_year,
            return_unit: config.return_unit,
            neutral_beta_epsilon: config.neutral_beta_epsilon,
        }
    }

    /// Annual market return as a fraction, from periodic market returns
    /// expressed in the estimator's return unit.
    pub fn annual_market_return(&self, market_returns: &[f64]) -> CapmResult<f64> {
        if market_returns.is_empty() {
            return Err(CapmError::InsufficientData(
                "no market returns to annualize".to_string(),
            ));
        }

        let mean_daily = self.return_unit.to_fraction(market_returns.mean());
        Ok(self
            .annualization
            .annualize(mean_daily, self.periods_per_year))
    }

    /// Alpha is reported per period in the regression's return unit; every
    /// other rate is an annual fraction.
    pub fn estimate(
        &self,
        ticker: &str,
        regression: &RegressionResult,
        annual_market_return: f64,
    ) -> CapmEstimate {
        let expected =
            expected_return(regression.beta, annual_market_return, self.risk_free_rate);

        CapmEstimate {
            ticker: ticker.to_string(),
            beta: regression.beta,
            alpha: regression.alpha,
            r_squared: regression.r_squared,
            annual_market_return,
            risk_free_rate: self.risk_free_rate,
            expected_annual_return: expected,
            volatility: VolatilityClass::classify(regression.beta, self.neutral_beta_epsilon),
        }
    }
}

impl Default for CapmEstimator {
    fn default() -> Self {
        Self::new(&CapmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn regression(beta: f64) -> RegressionResult {
        RegressionResult {
            beta,
            alpha: 0.0002,
            r_squared: Some(0.5),
            observations: 250,
        }
    }

    #[test]
    fn test_expected_return_formula() {
        assert_relative_eq!(expected_return(1.5, 0.08, 0.0), 0.12, epsilon = 1e-12);
        assert_relative_eq!(expected_return(0.5, 0.10, 0.04), 0.07, epsilon = 1e-12);
        assert_relative_eq!(expected_return(0.0, 0.10, 0.04), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_estimate_more_volatile() {
        let estimator = CapmEstimator::default();
        let estimate = estimator.estimate("NVDA", &regression(1.5), 0.08);

        assert_eq!(estimate.ticker, "NVDA");
        assert_relative_eq!(estimate.expected_annual_return, 0.12, epsilon = 1e-12);
        assert_eq!(estimate.volatility, VolatilityClass::MoreVolatile);
        assert_eq!(estimate.r_squared, Some(0.5));
    }

    #[test]
    fn test_neutral_beta_epsilon_is_pinned() {
        let config = CapmConfig {
            neutral_beta_epsilon: 1e-6,
            ..CapmConfig::default()
        };
        let estimator = CapmEstimator::new(&config);
        assert_eq!(
            estimator.estimate("X", &regression(1.0), 0.08).volatility,
            VolatilityClass::MarketNeutral
        );
        assert_eq!(
            estimator.estimate("X", &regression(0.9999999), 0.08).volatility,
            VolatilityClass::MarketNeutral
        );

        let strict = CapmEstimator::new(&CapmConfig {
            neutral_beta_epsilon: 0.0,
            ..CapmConfig::default()
        });
        assert_eq!(
            strict.estimate("X", &regression(0.9999999), 0.08).volatility,
            VolatilityClass::LessVolatile
        );
    }

    #[test]
    fn test_annualization_follows_config() {
        let daily = [0.001, 0.002, -0.0005, 0.0015];
        let mean = 0.001;

        let arithmetic = CapmEstimator::new(&CapmConfig {
            annualization: Annualization::Arithmetic,
            ..CapmConfig::default()
        });
        assert_relative_eq!(
            arithmetic.annual_market_return(&daily).unwrap(),
            mean * 252.0,
            epsilon = 1e-12
        );

        let geometric = CapmEstimator::default();
        assert_relative_eq!(
            geometric.annual_market_return(&daily).unwrap(),
            (1.0_f64 + mean).powi(252) - 1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_percent_returns_annualize_as_fractions() {
        let daily_pct = [0.1, 0.2, -0.05, 0.15];
        let estimator = CapmEstimator::new(&CapmConfig {
            return_unit: ReturnUnit::Percent,
            ..CapmConfig::default()
        });
        assert_relative_eq!(
            estimator.annual_market_return(&daily_pct).unwrap(),
            1.001_f64.powi(252) - 1.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_empty_market_returns() {
        assert!(CapmEstimator::default().annual_market_return(&[]).is_err());
    }
}
