//! Byte → text tables.
//!
//! # File format
//! UTF-8, one `HEXBYTE<TAB>TEXT` entry per line.  Lines that are blank, have
//! no tab, or whose hex does not decode to exactly one byte are skipped so a
//! partly damaged table still loads.  A `*` inside TEXT marks an optional
//! joining break and is stored as [`JOIN_PLACEHOLDER`].

use log::{debug, trace};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Internal stand-in for `*`; rendered as a space by the converter cleanup.
pub const JOIN_PLACEHOLDER: &str = "\u{E000}";

const IRAN_SYSTEM_TSV: &str = include_str!("../../data/iran_system.tsv");

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Mapping table is not valid UTF-8")]
    NotUtf8,
}

/// Immutable byte → text table.  Unmapped bytes fall back to Latin-1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharMapping {
    entries: [Option<String>; 256],
}

impl Default for CharMapping {
    fn default() -> Self {
        Self::empty()
    }
}

impl CharMapping {
    /// A table with no entries: every byte passes through as Latin-1.
    pub fn empty() -> Self {
        Self { entries: std::array::from_fn(|_| None) }
    }

    /// The Iran System code page table compiled into the crate.
    pub fn iran_system() -> Self {
        Self::parse(IRAN_SYSTEM_TSV)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|_| MappingError::NotUtf8)?;
        let mapping = Self::parse(&text);
        debug!("loaded {} mapping entries from {}", mapping.len(), path.display());
        Ok(mapping)
    }

    /// Parse a table from text.  Never fails; bad lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut mapping = Self::empty();
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            let mut parts = line.split('\t');
            let (Some(hex_part), Some(value)) = (parts.next(), parts.next()) else {
                if !line.trim().is_empty() {
                    trace!("mapping line {}: no tab separator, skipped", lineno + 1);
                }
                continue;
            };
            match hex::decode(hex_part.trim()) {
                Ok(decoded) if decoded.len() == 1 => {
                    mapping.insert(decoded[0], value);
                }
                _ => trace!("mapping line {}: bad hex byte {:?}, skipped", lineno + 1, hex_part),
            }
        }
        mapping
    }

    /// Set the text for `byte`, rewriting `*` to the joining placeholder.
    pub fn insert(&mut self, byte: u8, text: &str) {
        self.entries[byte as usize] = Some(text.replace('*', JOIN_PLACEHOLDER));
    }

    pub fn with(mut self, byte: u8, text: &str) -> Self {
        self.insert(byte, text);
        self
    }

    pub fn get(&self, byte: u8) -> Option<&str> {
        self.entries[byte as usize].as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_malformed_lines() {
        let m = CharMapping::parse("\nC1\tX\nnotab\nZZ\tbad\n0102\ttwo\n41\n7\todd\nc2\ty\tignored\n");
        assert_eq!(m.get(0xC1), Some("X"));
        assert_eq!(m.get(0xC2), Some("y"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn star_becomes_placeholder() {
        let m = CharMapping::parse("92\tب*\n");
        assert_eq!(m.get(0x92), Some(format!("ب{JOIN_PLACEHOLDER}").as_str()));
    }

    #[test]
    fn builtin_table_covers_digits_and_letters() {
        let m = CharMapping::iran_system();
        assert_eq!(m.get(0x80), Some("۰"));
        assert_eq!(m.get(0x90), Some("ا"));
        assert_eq!(m.get(0x41), None);
    }

    #[test]
    fn loads_table_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tsv");
        fs::write(&path, "\u{feff}91\tب*\r\n\r\n93\tا\r\nbroken\r\n80\t۰\r\n").unwrap();

        let m = CharMapping::load(&path).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.get(0x91), Some(format!("ب{JOIN_PLACEHOLDER}").as_str()));
        assert_eq!(m.get(0x93), Some("ا"));
        assert_eq!(m.get(0x80), Some("۰"));
        assert_eq!(m.get(0x41), None);
    }

    #[test]
    fn non_utf8_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        fs::write(&path, b"A\t\xFF\xFE").unwrap();
        assert!(matches!(CharMapping::load(&path), Err(MappingError::NotUtf8)));
        assert!(matches!(CharMapping::load(dir.path().join("missing.tsv")), Err(MappingError::Io(_))));
    }
}
