use capm_core::{CapmError, CapmResult, RegressionResult};
use statrs::statistics::Statistics;

/// Fit `asset = alpha + beta * market` by ordinary least squares.
///
/// Beta is Cov(market, asset) / Var(market) and alpha is the intercept
/// through the means. R² is `None` when the asset return never changes,
/// since the total sum of squares is then zero.
pub fn fit(market: &[f64], asset: &[f64]) -> CapmResult<RegressionResult> {
    if market.len() != asset.len() {
        return Err(CapmError::LengthMismatch {
            market: market.len(),
            asset: asset.len(),
        });
    }

    let n = market.len();
    if n < 2 {
        return Err(CapmError::InsufficientData(format!(
            "need at least 2 return pairs for a regression, got {n}"
        )));
    }

    if market.iter().chain(asset.iter()).any(|x| !x.is_finite()) {
        return Err(CapmError::DegenerateRegression(
            "returns contain non-finite values".to_string(),
        ));
    }

    if is_constant(market) {
        return Err(CapmError::DegenerateRegression(
            "market return is constant over the window".to_string(),
        ));
    }

    let market_mean = market.mean();
    let asset_mean = asset.mean();

    let mut covariance = 0.0;
    let mut market_variance = 0.0;
    for (m, a) in market.iter().zip(asset.iter()) {
        let market_diff = m - market_mean;
        covariance += market_diff * (a - asset_mean);
        market_variance += market_diff * market_diff;
    }

    if market_variance == 0.0 {
        return Err(CapmError::DegenerateRegression(
            "market return has zero variance".to_string(),
        ));
    }

    let beta = covariance / market_variance;
    let alpha = asset_mean - beta * market_mean;

    let r_squared = if is_constant(asset) {
        None
    } else {
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (m, a) in market.iter().zip(asset.iter()) {
            let residual = a - (alpha + beta * m);
            ss_res += residual * residual;
            ss_tot += (a - asset_mean).powi(2);
        }
        if ss_tot == 0.0 {
            None
        } else {
            Some((1.0 - ss_res / ss_tot).clamp(0.0, 1.0))
        }
    };

    Ok(RegressionResult {
        beta,
        alpha,
        r_squared,
        observations: n,
    })
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|&v| v == values[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MARKET: [f64; 6] = [0.012, -0.021, 0.004, 0.017, -0.008, 0.0];

    #[test]
    fn test_perfect_linear_fit() {
        let asset: Vec<f64> = MARKET.iter().map(|m| 2.0 * m + 0.01).collect();
        let fit = fit(&MARKET, &asset).unwrap();

        assert_relative_eq!(fit.beta, 2.0, epsilon = 1e-10);
        assert_relative_eq!(fit.alpha, 0.01, epsilon = 1e-10);
        assert_relative_eq!(fit.r_squared.unwrap(), 1.0, epsilon = 1e-10);
        assert_eq!(fit.observations, 6);
    }

    #[test]
    fn test_matches_covariance_over_variance() {
        let asset = [0.010, -0.015, 0.009, 0.011, -0.012, 0.003];
        let fit = fit(&MARKET, &asset).unwrap();

        let expected_beta = MARKET.covariance(asset) / MARKET.variance();
        assert_relative_eq!(fit.beta, expected_beta, epsilon = 1e-10);
        assert_relative_eq!(
            fit.alpha,
            asset.mean() - expected_beta * MARKET.mean(),
            epsilon = 1e-12
        );
        let r2 = fit.r_squared.unwrap();
        assert!(r2 > 0.0 && r2 < 1.0);
    }

    #[test]
    fn test_unit_scaling() {
        let asset = [0.010, -0.015, 0.009, 0.011, -0.012, 0.003];
        let market_pct: Vec<f64> = MARKET.iter().map(|m| m * 100.0).collect();
        let asset_pct: Vec<f64> = asset.iter().map(|a| a * 100.0).collect();

        let fraction = fit(&MARKET, &asset).unwrap();
        let percent = fit(&market_pct, &asset_pct).unwrap();

        assert_relative_eq!(fraction.beta, percent.beta, epsilon = 1e-9);
        assert_relative_eq!(fraction.alpha * 100.0, percent.alpha, epsilon = 1e-9);
        assert_relative_eq!(
            fraction.r_squared.unwrap(),
            percent.r_squared.unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_constant_market_is_degenerate() {
        let market = [0.01, 0.01, 0.01, 0.01];
        let asset = [0.02, -0.01, 0.03, 0.0];
        assert!(matches!(
            fit(&market, &asset),
            Err(CapmError::DegenerateRegression(_))
        ));
    }

    #[test]
    fn test_constant_asset_has_no_r_squared() {
        let asset = [0.005; 6];
        let fit = fit(&MARKET, &asset).unwrap();

        assert_relative_eq!(fit.beta, 0.0, epsilon = 1e-12);
        assert_relative_eq!(fit.alpha, 0.005, epsilon = 1e-12);
        assert!(fit.r_squared.is_none());
    }

    #[test]
    fn test_input_validation() {
        assert_eq!(
            fit(&[0.1, 0.2], &[0.1]).unwrap_err(),
            CapmError::LengthMismatch { market: 2, asset: 1 }
        );
        assert!(matches!(
            fit(&[0.1], &[0.1]),
            Err(CapmError::InsufficientData(_))
        ));
        assert!(matches!(
            fit(&[0.1, f64::NAN], &[0.1, 0.2]),
            Err(CapmError::DegenerateRegression(_))
        ));
    }
}
