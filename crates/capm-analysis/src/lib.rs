//! Return-series analytics for the Capital Asset Pricing Model.
//!
//! Price series are inner-joined on date, turned into periodic returns and
//! regressed asset-on-market. The resulting beta is combined with an
//! annualized market return and a risk-free rate into a CAPM estimate.

pub mod aligner;
pub mod analyzer;
pub mod estimator;
pub mod normalize;
pub mod regression;
pub mod returns;

pub use aligner::{align, AlignedColumn, AlignedRow, AlignedTable};
pub use analyzer::{AssetAnalysis, CapmAnalyzer, CapmReport, FITTED_LINE_POINTS};
pub use estimator::{expected_return, CapmEstimator};
pub use normalize::normalize;
pub use regression::fit;
pub use returns::{daily_returns, reconstruct_prices, ReturnSeries, ReturnTable};
