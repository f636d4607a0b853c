//! Typed schema built from a [`Header`].
//!
//! Alpha widths are not stored in the header region this reader uses.  They
//! are estimated: the row width minus every fixed-width field, split evenly
//! across the Alpha fields.  Bytes left over by the integer division go to
//! the last Alpha field so the widths always add up to the row width; that
//! case is logged because the estimate is then known to be uneven.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::header::{FormatError, Header, HEADER_SIZE};

/// Semantic column type, from the one-byte header type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Alpha,
    Short,
    Long,
    Number,
    Logical,
    Unknown(u8),
}

impl FieldType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => FieldType::Alpha,
            0x03 => FieldType::Short,
            0x04 => FieldType::Long,
            0x06 => FieldType::Number,
            0x09 => FieldType::Logical,
            other => FieldType::Unknown(other),
        }
    }

    /// Width on disk, `None` for Alpha (estimated later).
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            FieldType::Alpha      => None,
            FieldType::Short      => Some(2),
            FieldType::Long       => Some(4),
            FieldType::Number     => Some(8),
            FieldType::Logical    => Some(1),
            FieldType::Unknown(_) => Some(0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Alpha      => "alpha",
            FieldType::Short      => "short",
            FieldType::Long       => "long",
            FieldType::Number     => "number",
            FieldType::Logical    => "logical",
            FieldType::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name:       String,
    pub field_type: FieldType,
    pub width:      usize,
    /// Byte offset of this field inside a row.
    pub offset:     usize,
}

impl Field {
    pub fn is_estimated(&self) -> bool {
        self.field_type == FieldType::Alpha
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields:      Vec<Field>,
    pub row_width:   usize,
    pub row_count:   u32,
    pub data_offset: u64,
    pub file_type:   u8,
}

impl Schema {
    pub fn from_header(header: &Header) -> Result<Self, FormatError> {
        let row_width = header.row_width as usize;
        if row_width == 0 {
            return Err(FormatError::RowWidthZero);
        }
        let data_offset = header.data_offset();
        if data_offset < HEADER_SIZE as u64 {
            return Err(FormatError::DataOffsetInsideHeader { offset: data_offset, header: HEADER_SIZE });
        }

        let types: Vec<FieldType> = header.type_codes.iter().map(|&c| FieldType::from_code(c)).collect();
        let fixed: usize = types.iter().filter_map(|t| t.fixed_width()).sum();
        let alpha_count = types.iter().filter(|t| **t == FieldType::Alpha).count();

        if fixed > row_width {
            return Err(FormatError::FixedWidthOverflow { fixed, row_width });
        }
        let remainder = row_width - fixed;

        let (alpha_width, slack) = if alpha_count == 0 {
            if remainder != 0 {
                return Err(FormatError::WidthMismatch { fields: fixed, row_width });
            }
            (0, 0)
        } else {
            (remainder / alpha_count, remainder % alpha_count)
        };
        if slack != 0 {
            warn!(
                "alpha width estimate is uneven: {remainder} bytes over {alpha_count} fields, \
                 {slack} byte(s) assigned to the last alpha field"
            );
        }

        let last_alpha = types.iter().rposition(|t| *t == FieldType::Alpha);
        let mut offset = 0usize;
        let mut fields = Vec::with_capacity(types.len());
        for (i, (field_type, name)) in types.iter().zip(&header.field_names).enumerate() {
            let width = match field_type.fixed_width() {
                Some(w) => w,
                None if Some(i) == last_alpha => alpha_width + slack,
                None => alpha_width,
            };
            fields.push(Field { name: name.clone(), field_type: *field_type, width, offset });
            offset += width;
        }

        debug!(
            "schema: {} fields, row width {row_width}, {} rows, data at {:#x}",
            fields.len(),
            header.row_count,
            data_offset
        );

        Ok(Self {
            fields,
            row_width,
            row_count: header.row_count,
            data_offset,
            file_type: header.file_type,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
