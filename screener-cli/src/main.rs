//! Screener CLI: run strategy files over a directory of daily bars.
//!
//! Commands:
//! - `select`: run every active selector of a strategy file on one date
//! - `explain`: gate-by-gate account of one symbol under each active selector
//! - `indicators`: dump one symbol's chart indicator table as CSV

mod loader;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use screener_core::config::StrategyFile;
use screener_core::driver::SelectionDriver;
use screener_core::explain::Explanation;
use screener_core::frame::IndicatorFrame;

#[derive(Parser)]
#[command(
    name = "screener",
    about = "Screener CLI: daily-bar technical pattern selection"
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every active selector of a strategy file and print the picks.
    Select {
        /// Path to a TOML strategy file.
        #[arg(long)]
        config: PathBuf,

        /// Directory of <SYMBOL>.csv files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Selection date (YYYY-MM-DD). Defaults to the latest date in the data.
        #[arg(long)]
        date: Option<String>,

        /// Comma-separated symbols to load instead of the whole directory.
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,

        /// Print the gate-by-gate explanation of every pick.
        #[arg(long, default_value_t = false)]
        explain: bool,

        /// Emit JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Explain one symbol under every active selector.
    Explain {
        /// Path to a TOML strategy file.
        #[arg(long)]
        config: PathBuf,

        /// Directory of <SYMBOL>.csv files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long)]
        symbol: String,

        /// Date to explain (YYYY-MM-DD). Defaults to the symbol's last bar.
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the chart indicator table (BBI, MACD, KDJ, moving averages) as CSV.
    Indicators {
        /// Directory of <SYMBOL>.csv files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long)]
        symbol: String,

        /// Comma-separated moving-average windows.
        #[arg(long, value_delimiter = ',', default_values_t = [5, 10, 20, 60])]
        ma: Vec<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Select {
            config,
            data_dir,
            date,
            tickers,
            explain,
            json,
        } => run_select(&config, &data_dir, date.as_deref(), tickers, explain, json),
        Commands::Explain {
            config,
            data_dir,
            symbol,
            date,
        } => run_explain(&config, &data_dir, &symbol, date.as_deref()),
        Commands::Indicators {
            data_dir,
            symbol,
            ma,
        } => run_indicators(&data_dir, &symbol, &ma),
    }
}

/// Logs go to stderr so CSV and JSON on stdout stay clean.
fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn load_strategies(path: &Path) -> Result<StrategyFile> {
    let file = StrategyFile::from_file(path)?;
    if file.active().next().is_none() {
        bail!("no active selectors in {}", path.display());
    }
    Ok(file)
}

// ─── select ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SelectorPicks {
    selector: String,
    alias: String,
    picks: Vec<String>,
    skipped: usize,
    failures: Vec<FailureRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    explanations: Vec<Explanation>,
}

#[derive(Serialize)]
struct FailureRow {
    symbol: String,
    error: String,
}

#[derive(Serialize)]
struct SelectOutput {
    date: NaiveDate,
    symbols: usize,
    load_failures: Vec<FailureRow>,
    selectors: Vec<SelectorPicks>,
}

fn run_select(
    config_path: &Path,
    data_dir: &Path,
    date: Option<&str>,
    tickers: Vec<String>,
    explain: bool,
    json: bool,
) -> Result<()> {
    let strategies = load_strategies(config_path)?;
    let selectors = strategies.build_active()?;

    let tickers = (!tickers.is_empty()).then_some(tickers);
    let universe = loader::load_universe(data_dir, tickers.as_deref())?;
    let data = universe.data;
    let date = match date {
        Some(s) => parse_date(s)?,
        None => match loader::latest_date(&data) {
            Some(d) => d,
            None => bail!("no bars in {}", data_dir.display()),
        },
    };
    info!(symbols = data.len(), %date, selectors = selectors.len(), "Running selection");

    let mut output = SelectOutput {
        date,
        symbols: data.len(),
        load_failures: universe
            .failures
            .into_iter()
            .map(|f| FailureRow {
                symbol: f.symbol,
                error: f.error,
            })
            .collect(),
        selectors: Vec::with_capacity(selectors.len()),
    };
    for (alias, selector) in selectors {
        let driver = SelectionDriver::new(selector);
        let report = driver.scan(date, &data);

        let mut explanations = Vec::new();
        if explain {
            for symbol in &report.picks {
                explanations.push(driver.explain(symbol, date, &data[symbol])?);
            }
        }
        output.selectors.push(SelectorPicks {
            selector: driver.selector().name().to_string(),
            alias,
            picks: report.picks,
            skipped: report.skipped.len(),
            failures: report
                .failures
                .into_iter()
                .map(|f| FailureRow {
                    symbol: f.symbol,
                    error: f.error.to_string(),
                })
                .collect(),
            explanations,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_select(&output);
    }
    Ok(())
}

fn print_select(output: &SelectOutput) {
    println!();
    println!("=== Selection {} ({} symbols) ===", output.date, output.symbols);
    for failure in &output.load_failures {
        println!("WARNING: not loaded: {}: {}", failure.symbol, failure.error);
    }
    for sel in &output.selectors {
        println!();
        println!("--- {} ({}) ---", sel.alias, sel.selector);
        if sel.picks.is_empty() {
            println!("Picks:          (none)");
        } else {
            println!("Picks:          {}", sel.picks.join(", "));
        }
        println!("Skipped:        {}", sel.skipped);
        for failure in &sel.failures {
            println!("WARNING: {}: {}", failure.symbol, failure.error);
        }
        for explanation in &sel.explanations {
            println!("  {}: {}", explanation.symbol, explanation);
        }
    }
    println!();
}

// ─── explain ─────────────────────────────────────────────────────────

fn run_explain(
    config_path: &Path,
    data_dir: &Path,
    symbol: &str,
    date: Option<&str>,
) -> Result<()> {
    let strategies = load_strategies(config_path)?;
    let bars = loader::load_symbol(data_dir, symbol)?;
    let date = match (date, bars.last()) {
        (Some(s), _) => parse_date(s)?,
        (None, Some(last)) => last.date,
        (None, None) => bail!("{symbol} has no bars"),
    };

    println!("{symbol} on {date}");
    for (alias, selector) in strategies.build_active()? {
        let driver = SelectionDriver::new(selector);
        let explanation = driver
            .explain(symbol, date, &bars)
            .with_context(|| format!("{alias}: failed to evaluate {symbol}"))?;
        println!("  {alias}: {explanation}");
        for gate in &explanation.gates {
            let mark = if gate.passed { "pass" } else { "FAIL" };
            println!("    [{mark}] {gate}");
        }
    }
    Ok(())
}

// ─── indicators ──────────────────────────────────────────────────────

fn run_indicators(data_dir: &Path, symbol: &str, windows: &[usize]) -> Result<()> {
    let bars = loader::load_symbol(data_dir, symbol)?;
    if bars.is_empty() {
        bail!("{symbol} has no bars");
    }
    let frame = IndicatorFrame::new(&bars)
        .with_chart_indicators()
        .with_moving_averages(windows);
    let names = frame.column_names();

    let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
    let mut header = vec!["date".to_string()];
    header.extend(names.iter().cloned());
    writer.write_record(&header)?;

    let columns = names
        .iter()
        .map(|name| frame.column(name))
        .collect::<Result<Vec<_>, _>>()?;
    for (i, bar) in bars.iter().enumerate() {
        let mut row = vec![bar.date.to_string()];
        row.extend(columns.iter().map(|col| format_value(col[i])));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Empty cell for warm-up NaNs.
fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v:.4}")
    }
}
