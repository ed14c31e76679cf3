use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{CapmError, CapmResult};

/// One price observation for one trading day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Raw daily record as delivered by a market-data source.
///
/// Sources expose the price under one of two names. Either may be missing
/// or null on individual records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRecord {
    #[serde(alias = "Date", alias = "date", deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "Adj Close", alias = "adjClose")]
    pub adj_close: Option<f64>,
    #[serde(default, alias = "Close")]
    pub close: Option<f64>,
}

impl RawPriceRecord {
    pub fn value(&self, field: PriceField) -> Option<f64> {
        match field {
            PriceField::AdjClose => self.adj_close,
            PriceField::Close => self.close,
        }
    }
}

/// Parse a source timestamp: RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare
/// `YYYY-MM-DD` (midnight). Offsets are dropped so the calendar day as
/// written is the day the record lands on.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(Utc.from_utc_datetime(&ts.naive_local()));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("unrecognized timestamp '{raw}'")))
}

/// Which of the two source price fields a series was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceField {
    AdjClose,
    Close,
}

impl PriceField {
    pub fn to_label(&self) -> &'static str {
        match self {
            PriceField::AdjClose => "Adj Close",
            PriceField::Close => "Close",
        }
    }
}

/// Named, date-ordered price history of one instrument.
///
/// Dates are strictly increasing calendar days and every price is finite
/// and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    name: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(name: impl Into<String>, points: Vec<PricePoint>) -> CapmResult<Self> {
        let name = name.into();

        for (index, point) in points.iter().enumerate() {
            if !point.price.is_finite() || point.price < 0.0 {
                return Err(CapmError::InvalidPrice {
                    series: name,
                    index,
                    price: point.price,
                });
            }
        }

        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].date <= w[0].date)
        {
            return Err(CapmError::UnorderedSeries {
                series: name,
                index: index + 1,
            });
        }

        Ok(Self { name, points })
    }

    pub fn from_pairs<I>(name: impl Into<String>, pairs: I) -> CapmResult<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let points = pairs
            .into_iter()
            .map(|(date, price)| PricePoint::new(date, price))
            .collect();
        Self::new(name, points)
    }

    /// Build a series from raw source records.
    ///
    /// Prefers the adjusted close when any record carries it and falls back
    /// to the plain close. Null and NaN prices are dropped, timestamps are
    /// truncated to their UTC calendar day and a day reported twice keeps its
    /// last record. No records at all gives an empty series, which the
    /// aligner reports as missing overlap.
    pub fn from_records(name: impl Into<String>, records: &[RawPriceRecord]) -> CapmResult<Self> {
        let name = name.into();

        if records.is_empty() {
            tracing::debug!(series = %name, "No price records in window");
            return Self::new(name, Vec::new());
        }

        let field = if records.iter().any(|r| r.adj_close.is_some()) {
            PriceField::AdjClose
        } else if records.iter().any(|r| r.close.is_some()) {
            PriceField::Close
        } else {
            return Err(CapmError::MissingPriceField { series: name });
        };

        let mut points: Vec<PricePoint> = records
            .iter()
            .filter_map(|r| {
                r.value(field)
                    .filter(|p| !p.is_nan())
                    .map(|p| PricePoint::new(r.timestamp.date_naive(), p))
            })
            .collect();

        let dropped = records.len() - points.len();
        if dropped > 0 {
            tracing::debug!(series = %name, dropped, "Dropped records with missing prices");
        }

        // Stable sort keeps source order within a day, so dedup keeps the last record
        points.sort_by_key(|p| p.date);
        let before = points.len();
        points.reverse();
        points.dedup_by_key(|p| p.date);
        points.reverse();
        if points.len() < before {
            tracing::warn!(
                series = %name,
                duplicates = before - points.len(),
                "Collapsed multiple records on the same day"
            );
        }

        tracing::debug!(series = %name, field = field.to_label(), points = points.len(), "Built price series");
        Self::new(name, points)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Restrict the series to an inclusive date window
    pub fn within(&self, range: &DateRange) -> Self {
        Self {
            name: self.name.clone(),
            points: self
                .points
                .iter()
                .filter(|p| range.contains(p.date))
                .copied()
                .collect(),
        }
    }
}

/// Inclusive calendar-day window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> CapmResult<Self> {
        if start > end {
            return Err(CapmError::Config(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering the last `years` years up to and including `today`.
    /// A Feb 29 anchor maps to Feb 28 in a non-leap start year.
    pub fn trailing_years(years: u32, today: NaiveDate) -> CapmResult<Self> {
        let year = today.year() - years as i32;
        let start = today
            .with_year(year)
            .or_else(|| NaiveDate::from_ymd_opt(year, today.month(), 28))
            .ok_or_else(|| CapmError::Config(format!("cannot go back {years} years from {today}")))?;
        Self::new(start, today)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Unit in which periodic returns are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnUnit {
    #[default]
    Fraction,
    Percent,
}

impl ReturnUnit {
    /// Multiplier applied to a fractional return
    pub fn scale(&self) -> f64 {
        match self {
            ReturnUnit::Fraction => 1.0,
            ReturnUnit::Percent => 100.0,
        }
    }

    pub fn to_fraction(&self, value: f64) -> f64 {
        value / self.scale()
    }
}

/// How a mean daily return is turned into an annual one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Annualization {
    /// mean × periods
    Arithmetic,
    /// (1 + mean)^periods − 1
    #[default]
    Geometric,
}

impl Annualization {
    pub fn annualize(&self, mean_periodic_return: f64, periods_per_year: u32) -> f64 {
        match self {
            Annualization::Arithmetic => mean_periodic_return * periods_per_year as f64,
            Annualization::Geometric => {
                (1.0 + mean_periodic_return).powi(periods_per_year as i32) - 1.0
            }
        }
    }
}

/// Ordinary least-squares fit of asset return on market return
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub beta: f64,
    pub alpha: f64,
    /// None when the asset return is constant over the window
    pub r_squared: Option<f64>,
    pub observations: usize,
}

impl RegressionResult {
    pub fn predict(&self, market_return: f64) -> f64 {
        self.alpha + self.beta * market_return
    }

    /// Regression line sampled at `points` evenly spaced market returns
    /// between the smallest and largest observed value.
    pub fn fitted_line(&self, market_returns: &[f64], points: usize) -> Vec<(f64, f64)> {
        if market_returns.is_empty() || points == 0 {
            return Vec::new();
        }

        let lo = market_returns.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = market_returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if points == 1 {
            return vec![(lo, self.predict(lo))];
        }

        let step = (hi - lo) / (points - 1) as f64;
        (0..points)
            .map(|i| {
                let x = lo + step * i as f64;
                (x, self.predict(x))
            })
            .collect()
    }
}

/// Volatility of an asset relative to the market, read off its beta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityClass {
    MoreVolatile,
    LessVolatile,
    MarketNeutral,
}

impl VolatilityClass {
    pub fn classify(beta: f64, epsilon: f64) -> Self {
        if (beta - 1.0).abs() <= epsilon {
            VolatilityClass::MarketNeutral
        } else if beta > 1.0 {
            VolatilityClass::MoreVolatile
        } else {
            VolatilityClass::LessVolatile
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            VolatilityClass::MoreVolatile => "more volatile than market",
            VolatilityClass::LessVolatile => "less volatile than market",
            VolatilityClass::MarketNeutral => "market-neutral",
        }
    }
}

/// CAPM statistics for one analyzed asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapmEstimate {
    pub ticker: String,
    pub beta: f64,
    pub alpha: f64,
    pub r_squared: Option<f64>,
    pub annual_market_return: f64,
    pub risk_free_rate: f64,
    pub expected_annual_return: f64,
    pub volatility: VolatilityClass,
}
