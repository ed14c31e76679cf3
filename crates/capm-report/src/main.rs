//! capm-report: CAPM beta / expected-return report from local price files.
//!
//! Reads `<data-dir>/<SYMBOL>.json` for the benchmark and each symbol,
//! runs the analysis over the configured lookback window and prints the
//! report as JSON.
//!
//! Usage:
//!   cargo run -p capm-report -- --data-dir data --symbols AAPL MSFT
//!   cargo run -p capm-report -- --years 5 --end 2024-12-31 --pretty

mod source;

use anyhow::Context;
use capm_analysis::CapmAnalyzer;
use capm_core::{CapmConfig, DateRange};
use chrono::{NaiveDate, Utc};
use source::JsonFileSource;

const DEFAULT_SYMBOLS: &[&str] = &["AAPL", "MSFT", "GOOGL", "AMZN"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "capm_report=info,capm_analysis=info".into())
    };
    // Logs go to stderr so stdout carries only the report
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }

    let args: Vec<String> = std::env::args().collect();
    let pretty = args.iter().any(|a| a == "--pretty");

    let data_dir = arg_value(&args, "--data-dir")?
        .map(str::to_string)
        .or_else(|| std::env::var("CAPM_DATA_DIR").ok())
        .unwrap_or_else(|| "data".to_string());

    let mut config = CapmConfig::from_env().context("invalid CAPM configuration")?;
    if let Some(years) = arg_value(&args, "--years")? {
        config.lookback_years = years
            .parse()
            .with_context(|| format!("--years expects a whole number, got '{years}'"))?;
    }

    let end = match arg_value(&args, "--end")? {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("--end expects YYYY-MM-DD, got '{raw}'"))?,
        None => Utc::now().date_naive(),
    };

    let symbols: Vec<String> = match args.iter().position(|a| a == "--symbols") {
        Some(idx) => args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .map(|s| s.to_uppercase())
            .collect(),
        None => DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
    };

    let analyzer = CapmAnalyzer::new(config)?;
    let range = DateRange::trailing_years(analyzer.config().lookback_years, end)?;

    tracing::info!(
        "Analyzing {} against {} from {} to {} ({:?} annualization)",
        symbols.join(","),
        analyzer.config().benchmark_symbol,
        range.start,
        range.end,
        analyzer.config().annualization
    );

    let source = JsonFileSource::new(&data_dir);
    let report = analyzer
        .analyze_from_source(&source, &symbols, &range)
        .await
        .with_context(|| format!("CAPM analysis failed for data in '{data_dir}'"))?;

    for asset in &report.assets {
        let e = &asset.estimate;
        tracing::info!(
            "{}: beta {:.4}, expected annual return {:.2}%, {}",
            e.ticker,
            e.beta,
            e.expected_annual_return * 100.0,
            e.volatility.to_label()
        );
    }

    let output = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");

    Ok(())
}

/// Value following `flag`; a flag with nothing after it is an error.
fn arg_value<'a>(args: &'a [String], flag: &str) -> anyhow::Result<Option<&'a str>> {
    let Some(idx) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    match args.get(idx + 1) {
        Some(value) if !value.starts_with("--") => Ok(Some(value.as_str())),
        _ => anyhow::bail!("{flag} requires a value"),
    }
}
