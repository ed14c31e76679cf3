use capm_core::{CapmError, CapmResult};

/// Rescale prices so the first observation is 1.0. Used for comparative
/// price charts only; the regression never sees normalized prices.
pub fn normalize(prices: &[f64]) -> CapmResult<Vec<f64>> {
    let base = *prices
        .first()
        .ok_or_else(|| CapmError::InsufficientData("cannot normalize an empty series".to_string()))?;

    if !(base.is_finite() && base > 0.0) {
        return Err(CapmError::InvalidPrice {
            series: String::new(),
            index: 0,
            price: base,
        });
    }

    Ok(prices.iter().map(|p| p / base).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_to_first_price() {
        let normalized = normalize(&[50.0, 75.0, 25.0]).unwrap();
        assert_relative_eq!(normalized[0], 1.0);
        assert_relative_eq!(normalized[1], 1.5);
        assert_relative_eq!(normalized[2], 0.5);
    }

    #[test]
    fn test_normalize_rejects_zero_base() {
        assert!(matches!(
            normalize(&[0.0, 1.0]),
            Err(CapmError::InvalidPrice { index: 0, .. })
        ));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(matches!(normalize(&[]), Err(CapmError::InsufficientData(_))));
    }
}
