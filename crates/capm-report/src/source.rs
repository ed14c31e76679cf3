use async_trait::async_trait;
use capm_core::{CapmError, DateRange, PriceSource, RawPriceRecord};
use std::path::PathBuf;

/// Reads `<dir>/<SYMBOL>.json`, each file a JSON array of daily records
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.json"))
    }
}

#[async_trait]
impl PriceSource for JsonFileSource {
    async fn fetch_prices(
        &self,
        symbol: &str,
        range: &DateRange,
    ) -> Result<Vec<RawPriceRecord>, CapmError> {
        let path = self.path_for(symbol);
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CapmError::Source(format!("{}: {}", path.display(), e)))?;

        let records: Vec<RawPriceRecord> = serde_json::from_str(&body)
            .map_err(|e| CapmError::Source(format!("{}: {}", path.display(), e)))?;

        let total = records.len();
        let records: Vec<RawPriceRecord> = records
            .into_iter()
            .filter(|r| range.contains(r.timestamp.date_naive()))
            .collect();

        tracing::debug!(symbol, total, in_range = records.len(), "Loaded price file");
        Ok(records)
    }
}
