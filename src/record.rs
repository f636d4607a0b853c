//! Fixed-width row decoding.
//!
//! Rows are decoded from an owned image of the whole file by offset
//! arithmetic: row `i` lives at `data_offset + i * row_width`.  There is no
//! shared cursor, so any row can be decoded independently of the others.
//!
//! # Sparsity
//! A value equal to its type's zero (empty text, `0`, `0.0`, `false`) is left
//! out of the [`Record`] entirely.  Consumers rely on "absent" and "present
//! but falsy" being different things, so never insert zero values.

use byteorder::{ByteOrder, LittleEndian};
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::schema::{Field, FieldType, Schema};

/// Decoded field value.  Text stays raw until a converter interprets it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(Vec<u8>),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Text(b)    => b.is_empty(),
            Value::Integer(i) => *i == 0,
            Value::Float(f)   => *f == 0.0,
            Value::Bool(b)    => !*b,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Text(b) => Some(b),
            _ => None,
        }
    }
}

/// One row: field name to value, in schema order, zero values omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` unless it is a zero value.  A repeated name replaces
    /// the earlier entry.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        if value.is_zero() {
            return;
        }
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A row was cut short before the declared row count was reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Row {row} is truncated: expected {expected} bytes, found {found}")]
pub struct TruncatedRecord {
    pub row:      usize,
    pub expected: usize,
    pub found:    usize,
}

/// Decode one field from its slice of a row.  `None` means "omit".
pub fn decode_field(field: &Field, raw: &[u8]) -> Option<Value> {
    let value = match field.field_type {
        FieldType::Alpha => {
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            Value::Text(raw[..end].to_vec())
        }
        FieldType::Short   => Value::Integer(LittleEndian::read_i16(raw) as i64),
        FieldType::Long    => Value::Integer(LittleEndian::read_i32(raw) as i64),
        FieldType::Number  => Value::Float(LittleEndian::read_f64(raw)),
        FieldType::Logical => Value::Bool(raw[0] != 0),
        FieldType::Unknown(_) => return None,
    };
    (!value.is_zero()).then_some(value)
}

/// Decode a single row.  `row` must be exactly `schema.row_width` bytes.
pub fn decode_row(schema: &Schema, row: &[u8]) -> Record {
    debug_assert_eq!(row.len(), schema.row_width);
    let mut record = Record::new();
    for field in &schema.fields {
        let raw = &row[field.offset..field.offset + field.width];
        if let Some(value) = decode_field(field, raw) {
            record.insert(field.name.clone(), value);
        }
    }
    record
}

/// Number of complete rows available in `image`, or the truncation error
/// if the data ends partway through a row the header still promises.
pub fn complete_rows(schema: &Schema, image: &[u8]) -> Result<usize, TruncatedRecord> {
    let start = usize::try_from(schema.data_offset).unwrap_or(usize::MAX);
    let available = image.len().saturating_sub(start);
    let full = available / schema.row_width;
    let partial = available % schema.row_width;
    let declared = schema.row_count as usize;

    if full < declared && partial != 0 {
        return Err(TruncatedRecord { row: full, expected: schema.row_width, found: partial });
    }
    Ok(full.min(declared))
}

/// Byte range of row `index` inside the file image.
pub fn row_range(schema: &Schema, index: usize) -> std::ops::Range<usize> {
    let start = schema.data_offset as usize + index * schema.row_width;
    start..start + schema.row_width
}

/// Decode every row of `image` (the whole file, header included).
///
/// Data ending exactly on a row boundary before `row_count` rows is a normal
/// end of data.  A partial row is an error and nothing is returned.
pub fn decode_records(schema: &Schema, image: &[u8]) -> Result<Vec<Record>, TruncatedRecord> {
    let rows = complete_rows(schema, image)?;

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        return Ok((0..rows)
            .into_par_iter()
            .map(|i| decode_row(schema, &image[row_range(schema, i)]))
            .collect());
    }

    #[cfg(not(feature = "parallel"))]
    {
        Ok((0..rows).map(|i| decode_row(schema, &image[row_range(schema, i)])).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, field_type: FieldType, width: usize, offset: usize) -> Field {
        Field { name: name.into(), field_type, width, offset }
    }

    fn schema(row_count: u32) -> Schema {
        Schema {
            fields: vec![
                field("NAME", FieldType::Alpha, 6, 0),
                field("QTY", FieldType::Short, 2, 6),
                field("ID", FieldType::Long, 4, 8),
                field("PRICE", FieldType::Number, 8, 12),
                field("OK", FieldType::Logical, 1, 20),
            ],
            row_width: 21,
            row_count,
            data_offset: 4,
            file_type: 0,
        }
    }

    fn row(name: &[u8], qty: i16, id: i32, price: f64, ok: u8) -> Vec<u8> {
        let mut r = vec![0u8; 21];
        r[..name.len()].copy_from_slice(name);
        r[6..8].copy_from_slice(&qty.to_le_bytes());
        r[8..12].copy_from_slice(&id.to_le_bytes());
        r[12..20].copy_from_slice(&price.to_le_bytes());
        r[20] = ok;
        r
    }

    #[test]
    fn decodes_every_type() {
        let s = schema(1);
        let rec = decode_row(&s, &row(b"ab\0zz", -3, 70000, 2.5, 7));
        assert_eq!(rec.get("NAME"), Some(&Value::Text(b"ab".to_vec())));
        assert_eq!(rec.get("QTY"), Some(&Value::Integer(-3)));
        assert_eq!(rec.get("ID"), Some(&Value::Integer(70000)));
        assert_eq!(rec.get("PRICE"), Some(&Value::Float(2.5)));
        assert_eq!(rec.get("OK"), Some(&Value::Bool(true)));
    }

    #[test]
    fn alpha_without_nul_uses_full_width() {
        let s = schema(1);
        let rec = decode_row(&s, &row(b"abcdef", 1, 0, 0.0, 0));
        assert_eq!(rec.get("NAME"), Some(&Value::Text(b"abcdef".to_vec())));
    }

    #[test]
    fn zero_values_are_omitted() {
        let s = schema(1);
        let rec = decode_row(&s, &row(b"", 0, 0, 0.0, 0));
        assert!(rec.is_empty());
        let rec = decode_row(&s, &row(b"", 0, 5, -0.0, 0));
        assert_eq!(rec.len(), 1);
        assert!(!rec.contains("PRICE"));
    }

    #[test]
    fn eof_on_row_boundary_is_not_an_error() {
        let s = schema(5);
        let mut image = vec![0u8; 4];
        image.extend(row(b"a", 1, 1, 1.0, 1));
        image.extend(row(b"b", 2, 2, 2.0, 0));
        let recs = decode_records(&s, &image).unwrap();
        assert_eq!(recs.len(), 2);
    }

    #[test]
    fn partial_row_aborts_the_whole_decode() {
        let s = schema(3);
        let mut image = vec![0u8; 4];
        image.extend(row(b"a", 1, 1, 1.0, 1));
        image.extend(&row(b"b", 2, 2, 2.0, 0)[..10]);
        let err = decode_records(&s, &image).unwrap_err();
        assert_eq!(err, TruncatedRecord { row: 1, expected: 21, found: 10 });
    }

    #[test]
    fn trailing_bytes_past_row_count_are_ignored() {
        let s = schema(1);
        let mut image = vec![0u8; 4];
        image.extend(row(b"a", 1, 1, 1.0, 1));
        image.extend(&[0xAA; 5]);
        assert_eq!(decode_records(&s, &image).unwrap().len(), 1);
    }

    #[test]
    fn record_serializes_as_ordered_map() {
        let mut rec = Record::new();
        rec.insert("B", Value::Integer(2));
        rec.insert("A", Value::Bool(true));
        rec.insert("C", Value::Integer(0));
        assert_eq!(serde_json::to_string(&rec).unwrap(), r#"{"B":2,"A":true}"#);
    }
}
