use capm_core::{CapmError, CapmResult, ReturnUnit};
use chrono::NaiveDate;
use serde::Serialize;

use crate::aligner::{rename_series, AlignedTable};

/// Periodic returns from consecutive prices: `(p[t] - p[t-1]) / p[t-1]`.
///
/// The first price has no return, so the output is one shorter than the
/// input. Every price must be finite and strictly positive.
pub fn daily_returns(prices: &[f64], unit: ReturnUnit) -> CapmResult<Vec<f64>> {
    if prices.len() < 2 {
        return Err(CapmError::InsufficientData(format!(
            "need at least 2 prices to compute returns, got {}",
            prices.len()
        )));
    }

    if let Some((index, &price)) = prices
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.is_finite() && **p > 0.0))
    {
        return Err(CapmError::InvalidPrice {
            series: String::new(),
            index,
            price,
        });
    }

    let scale = unit.scale();
    Ok(prices
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0] * scale)
        .collect())
}

/// Rebuild a price path from its first price and its returns
pub fn reconstruct_prices(initial: f64, returns: &[f64], unit: ReturnUnit) -> Vec<f64> {
    let mut prices = Vec::with_capacity(returns.len() + 1);
    prices.push(initial);
    let mut last = initial;
    for r in returns {
        last *= 1.0 + unit.to_fraction(*r);
        prices.push(last);
    }
    prices
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Returns of every column of an aligned table, sharing one unit.
///
/// `dates[i]` is the date of the later price in pair `i`, so the table has one
/// row fewer than the price table it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnTable {
    dates: Vec<NaiveDate>,
    unit: ReturnUnit,
    market: ReturnSeries,
    assets: Vec<ReturnSeries>,
}

impl ReturnTable {
    pub fn from_aligned(table: &AlignedTable, unit: ReturnUnit) -> CapmResult<Self> {
        let column_returns = |name: &str, prices: &[f64]| -> CapmResult<ReturnSeries> {
            let values = daily_returns(prices, unit).map_err(|e| rename_series(e, name))?;
            Ok(ReturnSeries {
                name: name.to_string(),
                values,
            })
        };

        let market = column_returns(&table.market().name, &table.market().prices)?;
        let assets = table
            .assets()
            .iter()
            .map(|c| column_returns(&c.name, &c.prices))
            .collect::<CapmResult<Vec<_>>>()?;

        Ok(Self {
            dates: table.dates()[1..].to_vec(),
            unit,
            market,
            assets,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn market(&self) -> &ReturnSeries {
        &self.market
    }

    pub fn assets(&self) -> &[ReturnSeries] {
        &self.assets
    }

    pub fn asset(&self, name: &str) -> Option<&ReturnSeries> {
        self.assets.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::align;
    use approx::assert_relative_eq;
    use capm_core::PriceSeries;

    #[test]
    fn test_simple_returns() {
        let returns = daily_returns(&[100.0, 110.0, 99.0], ReturnUnit::Fraction).unwrap();
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_percent_unit() {
        let returns = daily_returns(&[100.0, 110.0, 99.0], ReturnUnit::Percent).unwrap();
        assert_relative_eq!(returns[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(returns[1], -10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reconstruct_round_trip() {
        let prices = [100.0, 110.0, 99.0, 101.5, 87.25];
        for unit in [ReturnUnit::Fraction, ReturnUnit::Percent] {
            let returns = daily_returns(&prices, unit).unwrap();
            let rebuilt = reconstruct_prices(prices[0], &returns, unit);
            assert_eq!(rebuilt.len(), prices.len());
            for (a, b) in rebuilt.iter().zip(prices.iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_price_is_invalid() {
        let err = daily_returns(&[100.0, 0.0, 50.0], ReturnUnit::Fraction).unwrap_err();
        assert_eq!(
            err,
            CapmError::InvalidPrice {
                series: String::new(),
                index: 1,
                price: 0.0
            }
        );
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            daily_returns(&[100.0], ReturnUnit::Fraction),
            Err(CapmError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_table_drops_first_row_and_names_bad_column() {
        let day = |d| chrono::NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let market = PriceSeries::from_pairs("market", [(day(1), 10.0), (day(2), 11.0), (day(3), 12.1)]).unwrap();
        let good = PriceSeries::from_pairs("GOOD", [(day(1), 5.0), (day(2), 5.5), (day(3), 5.5)]).unwrap();
        let table = align(&market, &[good]).unwrap();

        let returns = ReturnTable::from_aligned(&table, ReturnUnit::Fraction).unwrap();
        assert_eq!(returns.len(), 2);
        assert_eq!(returns.dates(), &[day(2), day(3)]);
        assert_relative_eq!(returns.market().values[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns.asset("GOOD").unwrap().values[1], 0.0);

        let bad = PriceSeries::from_pairs("BAD", [(day(1), 5.0), (day(2), 0.0), (day(3), 1.0)]).unwrap();
        let table = align(&market, &[bad]).unwrap();
        let err = ReturnTable::from_aligned(&table, ReturnUnit::Fraction).unwrap_err();
        assert!(matches!(err, CapmError::InvalidPrice { ref series, index: 1, .. } if series == "BAD"));
    }
}
