//! Fixed-size table header.
//!
//! # Layout (little-endian)
//! ```text
//! 0x000  u16  row byte width
//! 0x002  u16  header size in KiB (data region starts at size * 1024)
//! 0x004  u8   file type
//! 0x006  u32  row count
//! 0x021  u16  field count
//! 0x078  u8[] one type code per field, in field order
//! 0x220  ...  NUL-terminated ASCII field names, concatenated in field order
//! ```
//! The header is always read as one [`HEADER_SIZE`] block.  A file shorter
//! than that fails with an `UnexpectedEof` I/O error before any parsing.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Seek, SeekFrom};
use thiserror::Error;

pub const HEADER_SIZE: usize = 2048;

pub const OFFSET_ROW_WIDTH:   u64   = 0x000;
pub const OFFSET_HEADER_KIB:  u64   = 0x002;
pub const OFFSET_FILE_TYPE:   u64   = 0x004;
pub const OFFSET_ROW_COUNT:   u64   = 0x006;
pub const OFFSET_FIELD_COUNT: u64   = 0x021;
pub const OFFSET_TYPE_CODES:  usize = 0x078;
pub const OFFSET_FIELD_NAMES: usize = 0x220;

/// Most type codes that fit between the type table and the name table.
pub const MAX_FIELDS: usize = OFFSET_FIELD_NAMES - OFFSET_TYPE_CODES;

/// Structural problems found after the header bytes were read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Row byte width is zero")]
    RowWidthZero,
    #[error("Field count {count} exceeds the header's type table ({max} entries)")]
    TooManyFields { count: usize, max: usize },
    #[error("Field name table overruns the header at field {field}")]
    FieldNamesOverrun { field: usize },
    #[error("Fixed-width fields need {fixed} bytes but rows are only {row_width} bytes")]
    FixedWidthOverflow { fixed: usize, row_width: usize },
    #[error("Field widths sum to {fields} bytes but rows are {row_width} bytes")]
    WidthMismatch { fields: usize, row_width: usize },
    #[error("Data offset {offset} lies inside the {header}-byte header")]
    DataOffsetInsideHeader { offset: u64, header: usize },
}

/// Raw header values, before any type inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub row_width:   u16,
    pub header_kib:  u16,
    pub file_type:   u8,
    pub row_count:   u32,
    pub type_codes:  Vec<u8>,
    pub field_names: Vec<String>,
}

impl Header {
    /// Parse a header from an in-memory block.  `buf` must hold at least
    /// [`HEADER_SIZE`] bytes; anything after that is ignored.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderReadError> {
        if buf.len() < HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("header needs {HEADER_SIZE} bytes, got {}", buf.len()),
            )
            .into());
        }
        let block = &buf[..HEADER_SIZE];
        let mut cur = Cursor::new(block);

        cur.seek(SeekFrom::Start(OFFSET_ROW_WIDTH))?;
        let row_width = cur.read_u16::<LittleEndian>()?;
        cur.seek(SeekFrom::Start(OFFSET_HEADER_KIB))?;
        let header_kib = cur.read_u16::<LittleEndian>()?;
        cur.seek(SeekFrom::Start(OFFSET_FILE_TYPE))?;
        let file_type = cur.read_u8()?;
        cur.seek(SeekFrom::Start(OFFSET_ROW_COUNT))?;
        let row_count = cur.read_u32::<LittleEndian>()?;
        cur.seek(SeekFrom::Start(OFFSET_FIELD_COUNT))?;
        let field_count = cur.read_u16::<LittleEndian>()? as usize;

        if field_count > MAX_FIELDS {
            return Err(FormatError::TooManyFields { count: field_count, max: MAX_FIELDS }.into());
        }

        let type_codes = block[OFFSET_TYPE_CODES..OFFSET_TYPE_CODES + field_count].to_vec();
        let field_names = read_names(&block[OFFSET_FIELD_NAMES..], field_count)?;

        Ok(Self { row_width, header_kib, file_type, row_count, type_codes, field_names })
    }

    pub fn field_count(&self) -> usize {
        self.type_codes.len()
    }

    /// Absolute byte offset of the first row.
    pub fn data_offset(&self) -> u64 {
        self.header_kib as u64 * 1024
    }
}

/// Consume `count` NUL-terminated names from `table`.  Non-ASCII bytes are
/// kept as their Latin-1 code points so a damaged name never aborts the open.
fn read_names(table: &[u8], count: usize) -> Result<Vec<String>, FormatError> {
    let mut names = Vec::with_capacity(count);
    let mut pos = 0usize;
    for field in 0..count {
        let rest = table.get(pos..).ok_or(FormatError::FieldNamesOverrun { field })?;
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(FormatError::FieldNamesOverrun { field })?;
        names.push(rest[..len].iter().map(|&b| b as char).collect());
        pos += len + 1;
    }
    Ok(names)
}

/// Either half of a failed header read.
#[derive(Error, Debug)]
pub enum HeaderReadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&14u16.to_le_bytes());
        buf[2..4].copy_from_slice(&2u16.to_le_bytes());
        buf[4] = 0x02;
        buf[6..10].copy_from_slice(&3u32.to_le_bytes());
        buf[0x21..0x23].copy_from_slice(&2u16.to_le_bytes());
        buf[0x78] = 0x01;
        buf[0x79] = 0x04;
        buf[0x220..0x220 + 9].copy_from_slice(b"NAME\0QTY\0");
        buf
    }

    #[test]
    fn parses_fixed_offsets() {
        let h = Header::parse(&sample()).unwrap();
        assert_eq!(h.row_width, 14);
        assert_eq!(h.file_type, 2);
        assert_eq!(h.row_count, 3);
        assert_eq!(h.type_codes, vec![0x01, 0x04]);
        assert_eq!(h.field_names, vec!["NAME", "QTY"]);
        assert_eq!(h.data_offset(), 2048);
    }

    #[test]
    fn short_header_is_io_error() {
        let err = Header::parse(&sample()[..100]).unwrap_err();
        match err {
            HeaderReadError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_name_is_format_error() {
        let mut buf = sample();
        for b in &mut buf[0x220..] {
            *b = b'X';
        }
        let err = Header::parse(&buf).unwrap_err();
        assert!(matches!(
            err,
            HeaderReadError::Format(FormatError::FieldNamesOverrun { field: 0 })
        ));
    }

    #[test]
    fn field_count_past_type_table_is_format_error() {
        let mut buf = sample();
        buf[0x21..0x23].copy_from_slice(&0x1A9u16.to_le_bytes());
        let err = Header::parse(&buf).unwrap_err();
        assert!(matches!(
            err,
            HeaderReadError::Format(FormatError::TooManyFields { count: 0x1A9, max: 0x1A8 })
        ));
    }
}
