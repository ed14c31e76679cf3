use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapmError {
    #[error("No overlapping dates across series: {}", .series.join(", "))]
    NoOverlappingData { series: Vec<String> },

    #[error("Invalid price {price} at index {index} in series '{series}'")]
    InvalidPrice {
        series: String,
        index: usize,
        price: f64,
    },

    #[error("Degenerate regression: {0}")]
    DegenerateRegression(String),

    #[error("Series '{series}' has neither an adjusted close nor a close price field")]
    MissingPriceField { series: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Length mismatch: {market} market returns vs {asset} asset returns")]
    LengthMismatch { market: usize, asset: usize },

    #[error("Series '{series}' is not strictly increasing in date at index {index}")]
    UnorderedSeries { series: String, index: usize },

    #[error("Duplicate series name: {0}")]
    DuplicateSeries(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Price source error: {0}")]
    Source(String),
}

pub type CapmResult<T> = Result<T, CapmError>;
