//! Screener Core: indicators, trend and peak detection, pattern selectors.
//!
//! This crate contains the screening engine:
//! - Domain types (daily bars, series helpers)
//! - Indicator library (MA, EMA, KDJ, BBI, RSV, DIF/MACD, percent change)
//! - Indicator frames: named columns computed over one symbol's history
//! - BBI uptrend detection and peak extraction
//! - Five pattern selectors with structured, gate-by-gate explanations
//! - TOML strategy files and a parallel selection driver

pub mod config;
pub mod domain;
pub mod driver;
pub mod error;
pub mod explain;
pub mod frame;
pub mod indicators;
pub mod peaks;
pub mod selectors;
pub mod stats;
pub mod trend;
