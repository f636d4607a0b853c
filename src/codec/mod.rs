//! Iran System byte strings → Unicode text.
//!
//! # Storage convention
//! The legacy terminal stored Persian letter glyphs in visual order: every
//! run of letter bytes is mirrored, and so is the sequence of those runs.
//! Latin text, punctuation, spaces and digits were stored in reading order
//! and stay where they are.
//!
//! # Pipeline
//! 1. Optional dash fix: [`DASH_MARKER`] becomes `-`.
//! 2. Split into [`Segment`]s of [`ByteClass::Legacy`] / [`ByteClass::Other`].
//! 3. Reverse each legacy run and the order of the legacy runs; other runs
//!    keep their positions ([`unmirror`]).
//! 4. Map each byte through the [`CharMapping`], Latin-1 for unmapped bytes.
//! 5. Joining placeholder → space, whitespace collapsed, ends trimmed.
//!
//! Conversion is total: it cannot fail on any input.

pub mod mapping;

pub use mapping::{CharMapping, MappingError, JOIN_PLACEHOLDER};

use std::ops::{Range, RangeInclusive};

/// Persian digits.  Stored in reading order; never reversed.
pub const DIGIT_RANGE:  RangeInclusive<u8> = 0x80..=0x89;
/// Letter glyphs and Persian punctuation.  Stored mirrored.
pub const LETTER_RANGE: RangeInclusive<u8> = 0x8A..=0xFE;
/// Byte some producers wrote for a hyphen.
pub const DASH_MARKER:  u8 = 0x99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    Legacy,
    Other,
}

impl ByteClass {
    #[inline]
    pub fn of(byte: u8) -> Self {
        if LETTER_RANGE.contains(&byte) { ByteClass::Legacy } else { ByteClass::Other }
    }
}

/// Maximal run of bytes sharing one [`ByteClass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub class: ByteClass,
    pub range: Range<usize>,
}

pub fn segments(bytes: &[u8]) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        let class = ByteClass::of(b);
        match out.last_mut() {
            Some(seg) if seg.class == class => seg.range.end = i + 1,
            _ => out.push(Segment { class, range: i..i + 1 }),
        }
    }
    out
}

/// Plain byte reversal.
pub fn reverse_bytes(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Undo the mirrored storage of legacy letter runs.
///
/// Identity on input without [`LETTER_RANGE`] bytes.
pub fn unmirror(bytes: &[u8]) -> Vec<u8> {
    let segs = segments(bytes);
    let mut legacy: Vec<&[u8]> = segs
        .iter()
        .filter(|s| s.class == ByteClass::Legacy)
        .map(|s| &bytes[s.range.clone()])
        .collect();

    let mut out = Vec::with_capacity(bytes.len());
    for seg in &segs {
        match seg.class {
            ByteClass::Other => out.extend_from_slice(&bytes[seg.range.clone()]),
            ByteClass::Legacy => {
                if let Some(run) = legacy.pop() {
                    out.extend(run.iter().rev());
                }
            }
        }
    }
    out
}

/// Convert raw legacy bytes to clean Unicode text.
pub fn convert(bytes: &[u8], mapping: &CharMapping, dash_fix: bool) -> String {
    let mut raw = bytes.to_vec();
    if dash_fix {
        for b in raw.iter_mut().filter(|b| **b == DASH_MARKER) {
            *b = b'-';
        }
    }

    let ordered = unmirror(&raw);
    let mut text = String::with_capacity(ordered.len() * 2);
    for &b in &ordered {
        match mapping.get(b) {
            Some(s) => text.push_str(s),
            None => text.push(char::from(b)),
        }
    }
    cleanup(&text)
}

/// Placeholder → space, whitespace runs → one space, ends trimmed.
pub fn cleanup(text: &str) -> String {
    text.replace(JOIN_PLACEHOLDER, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
