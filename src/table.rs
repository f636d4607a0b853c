//! High-level [`Table`] API, the primary embedding surface.
//!
//! ```no_run
//! use pxconv::{Converter, Table};
//!
//! let table = Table::open("PARTS.DB")?;
//! let conv = Converter::default();
//! for record in table.records()? {
//!     if let Some(name) = record.get("NAME").and_then(|v| v.as_bytes()) {
//!         println!("{}", conv.convert_text(name));
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::header::{FormatError, Header, HeaderReadError};
use crate::record::{complete_rows, decode_records, decode_row, row_range, Record, TruncatedRecord};
use crate::schema::{Field, Schema};

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    #[error(transparent)]
    TruncatedRecord(#[from] TruncatedRecord),
}

impl From<HeaderReadError> for TableError {
    fn from(e: HeaderReadError) -> Self {
        match e {
            HeaderReadError::Io(e)     => TableError::Io(e),
            HeaderReadError::Format(e) => TableError::Format(e),
        }
    }
}

/// An open legacy table: the cached schema plus an owned image of the file.
#[derive(Debug, Clone)]
pub struct Table {
    path:   Option<PathBuf>,
    header: Header,
    schema: Schema,
    image:  Vec<u8>,
}

impl Table {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let image = fs::read(path)?;
        debug!("opened {} ({} bytes)", path.display(), image.len());
        let mut table = Self::from_bytes(image)?;
        table.path = Some(path.to_owned());
        Ok(table)
    }

    /// Open a table already held in memory.
    pub fn from_bytes(image: Vec<u8>) -> Result<Self, TableError> {
        let header = Header::parse(&image)?;
        debug!(
            "header: row width {}, {} rows, {} fields, file type {:#04x}",
            header.row_width,
            header.row_count,
            header.field_count(),
            header.file_type
        );
        let schema = Schema::from_header(&header)?;
        Ok(Self { path: None, header, schema, image })
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }
    pub fn header(&self) -> &Header { &self.header }
    pub fn schema(&self) -> &Schema { &self.schema }

    /// Row count declared in the header.
    pub fn num_records(&self) -> usize { self.schema.row_count as usize }
    pub fn num_fields(&self) -> usize { self.schema.fields.len() }
    pub fn fields(&self) -> &[Field] { &self.schema.fields }

    /// Decode every row.  All or nothing: a truncated row fails the call.
    pub fn records(&self) -> Result<Vec<Record>, TableError> {
        Ok(decode_records(&self.schema, &self.image)?)
    }

    /// Decode row `index` alone.  `Ok(None)` past the last complete row.
    pub fn record(&self, index: usize) -> Result<Option<Record>, TableError> {
        if index >= self.num_records() {
            return Ok(None);
        }
        let range = row_range(&self.schema, index);
        match self.image.get(range.clone()) {
            Some(row) => Ok(Some(decode_row(&self.schema, row))),
            None if range.start >= self.image.len() => Ok(None),
            None => Err(TruncatedRecord {
                row:      index,
                expected: self.schema.row_width,
                found:    self.image.len() - range.start,
            }
            .into()),
        }
    }

    /// Rows actually present, which may be fewer than declared.
    pub fn available_records(&self) -> Result<usize, TableError> {
        Ok(complete_rows(&self.schema, &self.image)?)
    }
}
