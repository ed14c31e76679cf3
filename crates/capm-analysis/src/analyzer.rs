use capm_core::{
    Annualization, CapmConfig, CapmError, CapmEstimate, CapmResult, DateRange, PriceSeries,
    PriceSource, RegressionResult,
};
use rayon::prelude::*;
use serde::Serialize;

use crate::aligner::{align, AlignedTable};
use crate::estimator::CapmEstimator;
use crate::regression::fit;
use crate::returns::{ReturnSeries, ReturnTable};

/// Number of points sampled along each regression line for charting
pub const FITTED_LINE_POINTS: usize = 100;

/// Regression and CAPM estimate of one asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetAnalysis {
    pub regression: RegressionResult,
    pub estimate: CapmEstimate,
    /// (market return, fitted asset return) across the observed market range
    pub fitted_line: Vec<(f64, f64)>,
}

/// Everything one analysis run produces, in presentation-ready form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapmReport {
    pub prices: AlignedTable,
    pub normalized: AlignedTable,
    pub returns: ReturnTable,
    pub annualization: Annualization,
    pub annual_market_return: f64,
    pub assets: Vec<AssetAnalysis>,
}

impl CapmReport {
    pub fn estimate(&self, ticker: &str) -> Option<&CapmEstimate> {
        self.assets
            .iter()
            .map(|a| &a.estimate)
            .find(|e| e.ticker == ticker)
    }
}

/// Runs the full pipeline: align, normalize, compute returns, then regress
/// and estimate every asset against the benchmark.
pub struct CapmAnalyzer {
    config: CapmConfig,
    estimator: CapmEstimator,
}

impl CapmAnalyzer {
    pub fn new(config: CapmConfig) -> CapmResult<Self> {
        config.validate()?;
        let estimator = CapmEstimator::new(&config);
        Ok(Self { config, estimator })
    }

    pub fn config(&self) -> &CapmConfig {
        &self.config
    }

    pub fn analyze(&self, market: &PriceSeries, assets: &[PriceSeries]) -> CapmResult<CapmReport> {
        let prices = align(market, assets)?;
        let normalized = prices.normalized()?;
        let returns = ReturnTable::from_aligned(&prices, self.config.return_unit)?;

        let market_returns = returns.market().values.as_slice();
        let annual_market_return = self.estimator.annual_market_return(market_returns)?;

        let analyze_asset = |series: &ReturnSeries| -> CapmResult<AssetAnalysis> {
            let regression = fit(market_returns, &series.values)?;
            let estimate = self
                .estimator
                .estimate(&series.name, &regression, annual_market_return);
            tracing::debug!(
                ticker = %series.name,
                beta = regression.beta,
                alpha = regression.alpha,
                "Fitted market model"
            );
            Ok(AssetAnalysis {
                fitted_line: regression.fitted_line(market_returns, FITTED_LINE_POINTS),
                regression,
                estimate,
            })
        };

        // Assets are independent; collect keeps input order either way
        let asset_results = if self.config.parallel {
            returns
                .assets()
                .par_iter()
                .map(analyze_asset)
                .collect::<CapmResult<Vec<_>>>()?
        } else {
            returns
                .assets()
                .iter()
                .map(analyze_asset)
                .collect::<CapmResult<Vec<_>>>()?
        };

        tracing::info!(
            market = market.name(),
            assets = asset_results.len(),
            observations = returns.len(),
            annual_market_return,
            "CAPM analysis complete"
        );

        Ok(CapmReport {
            prices,
            normalized,
            returns,
            annualization: self.config.annualization,
            annual_market_return,
            assets: asset_results,
        })
    }

    /// Single-asset run using the same conventions as a batch
    pub fn analyze_single(&self, market: &PriceSeries, asset: &PriceSeries) -> CapmResult<AssetAnalysis> {
        self.analyze(market, std::slice::from_ref(asset))?
            .assets
            .into_iter()
            .next()
            .ok_or_else(|| CapmError::InsufficientData(format!("no result for {}", asset.name())))
    }

    /// Fetch the benchmark and every ticker from `source`, then analyze.
    ///
    /// The benchmark series is named after `benchmark_symbol` from the config.
    /// Records outside `range` are ignored.
    pub async fn analyze_from_source<S>(
        &self,
        source: &S,
        tickers: &[String],
        range: &DateRange,
    ) -> CapmResult<CapmReport>
    where
        S: PriceSource + ?Sized,
    {
        if tickers.is_empty() {
            return Err(CapmError::InsufficientData(
                "select at least one ticker".to_string(),
            ));
        }

        let benchmark = &self.config.benchmark_symbol;
        let market = self.load_series(source, benchmark, range).await?;

        let mut assets = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            assets.push(self.load_series(source, ticker, range).await?);
        }

        self.analyze(&market, &assets)
    }

    async fn load_series<S>(&self, source: &S, symbol: &str, range: &DateRange) -> CapmResult<PriceSeries>
    where
        S: PriceSource + ?Sized,
    {
        let records = source.fetch_prices(symbol, range).await?;
        tracing::debug!(symbol, records = records.len(), "Fetched price records");
        Ok(PriceSeries::from_records(symbol, &records)?.within(range))
    }
}

impl Default for CapmAnalyzer {
    fn default() -> Self {
        let config = CapmConfig::default();
        Self {
            estimator: CapmEstimator::new(&config),
            config,
        }
    }
}
