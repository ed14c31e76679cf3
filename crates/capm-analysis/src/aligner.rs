use capm_core::{CapmError, CapmResult, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::normalize::normalize;

/// One named price column of an aligned table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedColumn {
    pub name: String,
    pub prices: Vec<f64>,
}

/// A single date of an aligned table with the price of every series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedRow<'a> {
    pub date: NaiveDate,
    pub prices: BTreeMap<&'a str, f64>,
}

/// Benchmark and asset prices restricted to the dates every series shares.
///
/// Stored column-major: every column has exactly one price per entry of
/// `dates`, and `dates` is strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedTable {
    dates: Vec<NaiveDate>,
    market: AlignedColumn,
    assets: Vec<AlignedColumn>,
}

impl AlignedTable {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn market(&self) -> &AlignedColumn {
        &self.market
    }

    pub fn assets(&self) -> &[AlignedColumn] {
        &self.assets
    }

    pub fn asset_names(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|c| c.name.as_str())
    }

    /// Prices of the market or of an asset, by series name
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        std::iter::once(&self.market)
            .chain(self.assets.iter())
            .find(|c| c.name == name)
            .map(|c| c.prices.as_slice())
    }

    pub fn row(&self, index: usize) -> Option<AlignedRow<'_>> {
        let date = *self.dates.get(index)?;
        let prices = std::iter::once(&self.market)
            .chain(self.assets.iter())
            .map(|c| (c.name.as_str(), c.prices[index]))
            .collect();
        Some(AlignedRow { date, prices })
    }

    pub fn rows(&self) -> impl Iterator<Item = AlignedRow<'_>> {
        (0..self.len()).filter_map(move |i| self.row(i))
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Same table with every column rescaled to 1.0 at its first row
    pub fn normalized(&self) -> CapmResult<AlignedTable> {
        let rescale = |column: &AlignedColumn| -> CapmResult<AlignedColumn> {
            let prices = normalize(&column.prices).map_err(|e| rename_series(e, &column.name))?;
            Ok(AlignedColumn {
                name: column.name.clone(),
                prices,
            })
        };

        Ok(AlignedTable {
            dates: self.dates.clone(),
            market: rescale(&self.market)?,
            assets: self
                .assets
                .iter()
                .map(rescale)
                .collect::<CapmResult<Vec<_>>>()?,
        })
    }
}

/// Inner-join the benchmark and asset series on calendar date.
///
/// A date survives only when every series has a price for it. An empty asset
/// set yields a market-only table.
pub fn align(market: &PriceSeries, assets: &[PriceSeries]) -> CapmResult<AlignedTable> {
    let mut seen = HashSet::with_capacity(assets.len() + 1);
    seen.insert(market.name());
    for asset in assets {
        if !seen.insert(asset.name()) {
            return Err(CapmError::DuplicateSeries(asset.name().to_string()));
        }
    }

    let lookups: Vec<HashMap<NaiveDate, f64>> = assets
        .iter()
        .map(|s| s.points().iter().map(|p| (p.date, p.price)).collect())
        .collect();

    let mut dates = Vec::new();
    let mut market_prices = Vec::new();
    let mut asset_prices: Vec<Vec<f64>> = vec![Vec::new(); assets.len()];

    'rows: for point in market.points() {
        let mut row = Vec::with_capacity(lookups.len());
        for lookup in &lookups {
            match lookup.get(&point.date) {
                Some(&price) => row.push(price),
                None => continue 'rows,
            }
        }

        dates.push(point.date);
        market_prices.push(point.price);
        for (column, price) in asset_prices.iter_mut().zip(row) {
            column.push(price);
        }
    }

    if dates.is_empty() {
        return Err(CapmError::NoOverlappingData {
            series: std::iter::once(market)
                .chain(assets.iter())
                .map(|s| s.name().to_string())
                .collect(),
        });
    }

    tracing::debug!(
        market = market.name(),
        assets = assets.len(),
        rows = dates.len(),
        market_rows_dropped = market.len() - dates.len(),
        "Aligned price series"
    );

    Ok(AlignedTable {
        dates,
        market: AlignedColumn {
            name: market.name().to_string(),
            prices: market_prices,
        },
        assets: assets
            .iter()
            .zip(asset_prices)
            .map(|(s, prices)| AlignedColumn {
                name: s.name().to_string(),
                prices,
            })
            .collect(),
    })
}

/// Attach the column name to errors raised by name-agnostic helpers
pub(crate) fn rename_series(err: CapmError, name: &str) -> CapmError {
    match err {
        CapmError::InvalidPrice { index, price, .. } => CapmError::InvalidPrice {
            series: name.to_string(),
            index,
            price,
        },
        other => other,
    }
}
