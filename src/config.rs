//! Conversion settings, passed by value to every call site.
//!
//! There is no process-wide default table or flag.  A [`Converter`] bundles a
//! mapping with its options and is immutable once built, so it can be shared
//! across threads behind an `Arc` without locking.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::bidi::reorder_visual_to_logical;
use crate::codec::{convert, CharMapping, MappingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Replace the legacy dash marker with `-` before decoding.
    pub dash_fix: bool,
    /// Reorder mixed-script output from visual to logical order.
    pub rtl:      bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { dash_fix: true, rtl: true }
    }
}

#[derive(Debug, Clone)]
pub struct Converter {
    mapping: CharMapping,
    options: ConvertOptions,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(CharMapping::iran_system(), ConvertOptions::default())
    }
}

impl Converter {
    pub fn new(mapping: CharMapping, options: ConvertOptions) -> Self {
        Self { mapping, options }
    }

    pub fn mapping(&self) -> &CharMapping { &self.mapping }
    pub fn options(&self) -> ConvertOptions { self.options }

    /// Decode raw field bytes, then reorder when `rtl` is set.
    pub fn convert_text(&self, bytes: &[u8]) -> String {
        let text = convert(bytes, &self.mapping, self.options.dash_fix);
        if self.options.rtl {
            reorder_visual_to_logical(&text)
        } else {
            text
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),
}

/// On-disk settings file (JSON).  Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mapping table path; the built-in Iran System table when unset.
    pub mapping:        Option<PathBuf>,
    #[serde(flatten)]
    pub options:        ConvertOptions,
    /// Field whose value keys exported records and snapshots.
    pub identity_field: Option<String>,
    /// Group numbered fields (`PART1`, `PART2`, ...) into arrays.
    pub group_slots:    bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mapping:        None,
            options:        ConvertOptions::default(),
            identity_field: None,
            group_slots:    true,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn converter(&self) -> Result<Converter, ConfigError> {
        let mapping = match &self.mapping {
            Some(path) => CharMapping::load(path)?,
            None => CharMapping::iran_system(),
        };
        Ok(Converter::new(mapping, self.options))
    }
}
