//! Domain types for the screener.

pub mod bar;

pub use bar::{history_until, tail, validate_series, Bar};
