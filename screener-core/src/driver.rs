//! Batch selection over a universe of symbols.
//!
//! For each symbol the driver truncates the series to the selection date,
//! keeps the selector's trailing history window and runs the selector. A
//! symbol that cannot be evaluated (malformed series, missing column) is
//! logged and reported; it never aborts the batch.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::{history_until, tail, validate_series, Bar};
use crate::error::SymbolError;
use crate::explain::{Evaluation, Explanation};
use crate::selectors::Selector;

/// Outcome of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    /// No bars, or fewer than the selector's minimum, on or before the date.
    Skipped,
    Evaluated(Evaluation),
}

/// One symbol the driver could not evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFailure {
    pub symbol: String,
    pub error: SymbolError,
}

/// Everything a scan produced, in input (symbol) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub picks: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn evaluated(&self, total: usize) -> usize {
        total - self.skipped.len() - self.failures.len()
    }
}

/// Runs one selector across symbols.
pub struct SelectionDriver {
    selector: Box<dyn Selector>,
    parallel: bool,
}

impl SelectionDriver {
    pub fn new(selector: Box<dyn Selector>) -> Self {
        Self {
            selector,
            parallel: true,
        }
    }

    /// Evaluate symbols on the rayon pool (default) or sequentially.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn selector(&self) -> &dyn Selector {
        self.selector.as_ref()
    }

    /// The slice the selector sees for `date`: history up to the date, cut to
    /// the selector's window.
    fn window<'a>(&self, bars: &'a [Bar], date: NaiveDate) -> &'a [Bar] {
        let hist = history_until(bars, date);
        match self.selector.history_len() {
            Some(n) => tail(hist, n),
            None => hist,
        }
    }

    /// Evaluate one symbol's series on `date`.
    pub fn evaluate_symbol(
        &self,
        date: NaiveDate,
        bars: &[Bar],
    ) -> Result<SymbolOutcome, SymbolError> {
        if bars.is_empty() {
            return Ok(SymbolOutcome::Skipped);
        }
        validate_series(bars)?;
        let hist = self.window(bars, date);
        if hist.is_empty() || hist.len() < self.selector.min_bars() {
            return Ok(SymbolOutcome::Skipped);
        }
        Ok(SymbolOutcome::Evaluated(self.selector.evaluate(hist)?))
    }

    /// Run the selector on every symbol and collect picks, skips and failures.
    pub fn scan(&self, date: NaiveDate, data: &BTreeMap<String, Vec<Bar>>) -> ScanReport {
        debug!(
            selector = self.selector.name(),
            %date,
            symbols = data.len(),
            parallel = self.parallel,
            "Starting scan"
        );
        let entries: Vec<(&String, &Vec<Bar>)> = data.iter().collect();
        let outcomes: Vec<(&String, Result<SymbolOutcome, SymbolError>)> = if self.parallel {
            entries
                .par_iter()
                .map(|(symbol, bars)| (*symbol, self.evaluate_symbol(date, bars)))
                .collect()
        } else {
            entries
                .iter()
                .map(|(symbol, bars)| (*symbol, self.evaluate_symbol(date, bars)))
                .collect()
        };

        let mut report = ScanReport::default();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(SymbolOutcome::Evaluated(eval)) if eval.passed => {
                    report.picks.push(symbol.clone())
                }
                Ok(SymbolOutcome::Evaluated(_)) => {}
                Ok(SymbolOutcome::Skipped) => report.skipped.push(symbol.clone()),
                Err(error) => {
                    warn!(symbol = %symbol, error = %error, "Failed to evaluate symbol");
                    report.failures.push(ScanFailure {
                        symbol: symbol.clone(),
                        error,
                    });
                }
            }
        }
        debug!(
            selector = self.selector.name(),
            %date,
            picks = report.picks.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "Scan complete"
        );
        report
    }

    /// Symbols passing the selector on `date`, in symbol order.
    pub fn select(&self, date: NaiveDate, data: &BTreeMap<String, Vec<Bar>>) -> Vec<String> {
        self.scan(date, data).picks
    }

    /// Gate-by-gate account of one symbol on `date`, on the same slice
    /// `select` evaluates. A series `scan` would report as a failure is an
    /// error here too.
    pub fn explain(
        &self,
        symbol: &str,
        date: NaiveDate,
        bars: &[Bar],
    ) -> Result<Explanation, SymbolError> {
        if !bars.is_empty() {
            validate_series(bars)?;
        }
        let hist = self.window(bars, date);
        let evaluation = if hist.is_empty() || hist.len() < self.selector.min_bars() {
            Evaluation::default()
        } else {
            self.selector.evaluate(hist)?
        };
        Ok(Explanation::new(
            symbol,
            date,
            self.selector.name(),
            evaluation,
        ))
    }
}
