//! Error types for the screening core.
//!
//! Three families: configuration problems (raised at construction), missing
//! frame columns (raised during evaluation) and malformed input series.
//! [`SymbolError`] wraps the last two for per-symbol batch reporting.

use chrono::NaiveDate;

/// Invalid selector configuration. Raised at construction, never during evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("{field} = {value} is not a valid window ({expected})")]
    InvalidWindow {
        field: &'static str,
        value: usize,
        expected: &'static str,
    },
    #[error("{selector} requires a nested `{field}` configuration")]
    MissingNested {
        selector: &'static str,
        field: &'static str,
    },
    #[error("Unknown selector class: {0}")]
    UnknownSelector(String),
    #[error("Invalid parameters for {class}: {message}")]
    Params { class: String, message: String },
    #[error("Failed to parse strategy file: {0}")]
    Parse(String),
    #[error("Failed to read strategy file {path}: {message}")]
    Io { path: String, message: String },
}

/// A column lookup on an [`IndicatorFrame`](crate::frame::IndicatorFrame) failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("missing column `{column}` (available: {})", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
}

/// A bar series handed to the driver is not usable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("empty bar series")]
    Empty,
    #[error("dates not strictly ascending at index {index}: {previous} then {current}")]
    Unordered {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
    #[error("bar {index} ({date}) has a NaN price or volume")]
    VoidBar { index: usize, date: NaiveDate },
    #[error("bar {index} ({date}) has inconsistent OHLCV values")]
    InconsistentBar { index: usize, date: NaiveDate },
}

/// Why one symbol of a batch could not be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymbolError {
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}
