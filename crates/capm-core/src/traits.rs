use async_trait::async_trait;
use crate::{CapmError, DateRange, RawPriceRecord};

/// Trait for market-data sources that deliver daily price records
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(
        &self,
        symbol: &str,
        range: &DateRange,
    ) -> Result<Vec<RawPriceRecord>, CapmError>;
}
