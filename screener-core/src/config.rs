//! Strategy files and the selector factory.
//!
//! A strategy file is TOML with one `[[selectors]]` table per strategy:
//!
//! ```toml
//! [[selectors]]
//! class = "BBIKDJSelector"
//! alias = "low J in uptrend"
//! activate = true
//!
//! [selectors.params]
//! j_threshold = -5
//! bbi_min_window = 90
//! ```
//!
//! Parameters absent from `params` take the selector's defaults; unknown
//! parameter names are rejected.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::selectors::{
    BbiKdjConfig, BbiKdjSelector, BbiShortLongConfig, BbiShortLongSelector,
    BreakoutVolumeKdjConfig, BreakoutVolumeKdjSelector, PeakKdjConfig, PeakKdjSelector,
    Selector, SuperB1Config, SuperB1Selector,
};

/// Class names accepted by [`build_selector`].
pub const SELECTOR_CLASSES: [&str; 5] = [
    "BBIKDJSelector",
    "SuperB1Selector",
    "PeakKDJSelector",
    "BBIShortLongSelector",
    "BreakoutVolumeKDJSelector",
];

/// One `[[selectors]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorEntry {
    pub class: String,
    /// Display name; falls back to the class name.
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "default_activate")]
    pub activate: bool,
    #[serde(default = "empty_params")]
    pub params: toml::Value,
}

fn default_activate() -> bool {
    true
}

fn empty_params() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

impl SelectorEntry {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            alias: None,
            activate: true,
            params: empty_params(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.class)
    }
}

/// A parsed strategy file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyFile {
    #[serde(default)]
    pub selectors: Vec<SelectorEntry>,
}

impl StrategyFile {
    /// Load a strategy file from disk.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a strategy file from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Entries with `activate = true`, in file order.
    pub fn active(&self) -> impl Iterator<Item = &SelectorEntry> {
        self.selectors.iter().filter(|e| e.activate)
    }

    /// Build every active selector, paired with its display name.
    pub fn build_active(&self) -> Result<Vec<(String, Box<dyn Selector>)>, ConfigError> {
        self.active()
            .map(|entry| Ok((entry.display_name().to_string(), build_selector(entry)?)))
            .collect()
    }
}

fn parse_params<T: DeserializeOwned>(entry: &SelectorEntry) -> Result<T, ConfigError> {
    entry
        .params
        .clone()
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Params {
            class: entry.class.clone(),
            message: e.to_string(),
        })
}

/// Construct the selector named by `entry.class` from its parameters.
pub fn build_selector(entry: &SelectorEntry) -> Result<Box<dyn Selector>, ConfigError> {
    let selector: Box<dyn Selector> = match entry.class.as_str() {
        "BBIKDJSelector" => Box::new(BbiKdjSelector::new(parse_params::<BbiKdjConfig>(entry)?)?),
        "SuperB1Selector" => {
            Box::new(SuperB1Selector::new(parse_params::<SuperB1Config>(entry)?)?)
        }
        "PeakKDJSelector" => {
            Box::new(PeakKdjSelector::new(parse_params::<PeakKdjConfig>(entry)?)?)
        }
        "BBIShortLongSelector" => Box::new(BbiShortLongSelector::new(parse_params::<
            BbiShortLongConfig,
        >(entry)?)?),
        "BreakoutVolumeKDJSelector" => Box::new(BreakoutVolumeKdjSelector::new(parse_params::<
            BreakoutVolumeKdjConfig,
        >(entry)?)?),
        other => return Err(ConfigError::UnknownSelector(other.to_string())),
    };
    Ok(selector)
}
