//! Per-symbol CSV loading.
//!
//! Layout: one `<data-dir>/<SYMBOL>.csv` per symbol with header
//! `date,open,high,low,close,volume`. Rows are taken as written; ordering is
//! checked later by the driver, which reports a malformed series without
//! dropping the rest of the universe. A file that cannot be opened or parsed
//! is reported and skipped in the same way.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use screener_core::domain::Bar;

#[derive(Debug, Deserialize)]
struct BarRecord {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl BarRecord {
    fn into_bar(self, symbol: &str) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Parse one symbol's bars from any CSV source.
pub fn read_bars<R: Read>(symbol: &str, reader: R) -> Result<Vec<Bar>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();
    for (row, result) in csv_reader.deserialize::<BarRecord>().enumerate() {
        let record = result.with_context(|| format!("{symbol}: bad record at row {}", row + 1))?;
        bars.push(record.into_bar(symbol));
    }
    Ok(bars)
}

pub fn symbol_path(data_dir: &Path, symbol: &str) -> PathBuf {
    data_dir.join(format!("{symbol}.csv"))
}

pub fn load_symbol(data_dir: &Path, symbol: &str) -> Result<Vec<Bar>> {
    let path = symbol_path(data_dir, symbol);
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    read_bars(symbol, std::io::BufReader::new(file))
}

/// Symbols with a `.csv` file in `data_dir`, sorted.
pub fn list_symbols(data_dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory {}", data_dir.display()))?;
    let mut symbols = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            symbols.push(stem.to_string());
        }
    }
    symbols.sort();
    Ok(symbols)
}

/// A symbol whose file could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub symbol: String,
    pub error: String,
}

/// Symbols that loaded, plus the ones that did not.
#[derive(Debug, Default)]
pub struct Universe {
    pub data: BTreeMap<String, Vec<Bar>>,
    pub failures: Vec<LoadFailure>,
}

/// Load every symbol in `data_dir`, or only `tickers` when given.
///
/// Errors only when there is nothing to load; a bad file is logged, recorded
/// in [`Universe::failures`] and skipped.
pub fn load_universe(data_dir: &Path, tickers: Option<&[String]>) -> Result<Universe> {
    let symbols = match tickers {
        Some(list) => list.to_vec(),
        None => list_symbols(data_dir)?,
    };
    if symbols.is_empty() {
        bail!("no symbol files found in {}", data_dir.display());
    }

    let mut universe = Universe::default();
    for symbol in symbols {
        match load_symbol(data_dir, &symbol) {
            Ok(bars) => {
                debug!(symbol = %symbol, bars = bars.len(), "Loaded symbol");
                universe.data.insert(symbol, bars);
            }
            Err(error) => {
                let error = format!("{error:#}");
                warn!(symbol = %symbol, error = %error, "Failed to load symbol");
                universe.failures.push(LoadFailure { symbol, error });
            }
        }
    }
    Ok(universe)
}

/// Latest bar date across the universe.
pub fn latest_date(data: &BTreeMap<String, Vec<Bar>>) -> Option<NaiveDate> {
    data.values().filter_map(|bars| bars.last()).map(|b| b.date).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "date,open,high,low,close,volume\n\
        2024-01-02,10.0,10.5,9.8,10.2,1200\n\
        2024-01-03,10.2,10.9,10.1,10.8,1500.5\n";

    fn write_symbol(dir: &Path, symbol: &str, body: &str) {
        std::fs::write(symbol_path(dir, symbol), body).unwrap();
    }

    #[test]
    fn reads_records_in_file_order() {
        let bars = read_bars("AAA", SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].symbol, "AAA");
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].close, 10.8);
        assert_eq!(bars[1].volume, 1500.5);
    }

    #[test]
    fn bad_record_names_symbol_and_row() {
        let body = "date,open,high,low,close,volume\n2024-01-02,10,11,9,x,100\n";
        let err = read_bars("BAD", body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("BAD: bad record at row 1"));
    }

    #[test]
    fn header_only_is_empty_series() {
        let bars = read_bars("NIL", "date,open,high,low,close,volume\n".as_bytes()).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn universe_loads_csv_files_only() {
        let dir = tempfile::tempdir().unwrap();
        write_symbol(dir.path(), "BBB", SAMPLE);
        write_symbol(dir.path(), "AAA", SAMPLE);
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let universe = load_universe(dir.path(), None).unwrap();
        assert!(universe.failures.is_empty());
        let data = universe.data;
        assert_eq!(data.keys().cloned().collect::<Vec<_>>(), vec!["AAA", "BBB"]);
        assert_eq!(data["BBB"][0].symbol, "BBB");
        assert_eq!(
            latest_date(&data),
            Some(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
        );
    }

    #[test]
    fn bad_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_symbol(dir.path(), "AAA", SAMPLE);
        write_symbol(
            dir.path(),
            "BBB",
            "date,open,high,low,close,volume\n2024-01-02,10,11,9,,100\n",
        );

        let universe = load_universe(dir.path(), None).unwrap();
        assert_eq!(universe.data.keys().cloned().collect::<Vec<_>>(), vec!["AAA"]);
        assert_eq!(universe.data["AAA"].len(), 2);
        assert_eq!(universe.failures.len(), 1);
        assert_eq!(universe.failures[0].symbol, "BBB");
        assert!(universe.failures[0]
            .error
            .contains("BBB: bad record at row 1"));
    }

    #[test]
    fn ticker_filter_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        write_symbol(dir.path(), "AAA", SAMPLE);
        write_symbol(dir.path(), "BBB", SAMPLE);

        let only = vec!["BBB".to_string()];
        let universe = load_universe(dir.path(), Some(&only)).unwrap();
        assert_eq!(universe.data.len(), 1);
        assert!(universe.data.contains_key("BBB"));

        let tickers = vec!["AAA".to_string(), "ZZZ".to_string()];
        let universe = load_universe(dir.path(), Some(&tickers)).unwrap();
        assert!(universe.data.contains_key("AAA"));
        assert_eq!(universe.failures.len(), 1);
        assert_eq!(universe.failures[0].symbol, "ZZZ");
        assert!(universe.failures[0].error.contains("ZZZ.csv"));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_universe(dir.path(), None).is_err());
        assert_eq!(latest_date(&BTreeMap::new()), None);
    }
}
