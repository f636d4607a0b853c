//! JSON shaping for decoded records.
//!
//! Text values go through the [`Converter`]; numbers and flags are emitted
//! as JSON numbers and booleans.  Numbered "slot" columns (`PART1`, `PART2`,
//! ...) are folded into one array per stem unless grouping is turned off.  Absent values stay absent:
//! a missing slot is skipped rather than written as `null`.

use log::{info, warn};
use serde_json::{Map, Number, Value as Json};
use std::collections::{BTreeMap, HashMap};

use crate::config::Converter;
use crate::record::{Record, Value};
use crate::schema::Field;
use crate::table::{Table, TableError};

/// Field name → (stem, slot number), for stems used by two or more fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotLayout {
    slots: HashMap<String, (String, u32)>,
}

impl SlotLayout {
    pub fn from_fields(fields: &[Field]) -> Self {
        let mut by_stem: HashMap<String, Vec<(String, u32)>> = HashMap::new();
        for f in fields {
            if let Some((stem, n)) = split_slot(&f.name) {
                by_stem.entry(stem.to_owned()).or_default().push((f.name.clone(), n));
            }
        }
        let slots = by_stem
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .flat_map(|(stem, members)| {
                members.into_iter().map(move |(name, n)| (name, (stem.clone(), n)))
            })
            .collect();
        Self { slots }
    }

    pub fn slot(&self, name: &str) -> Option<(&str, u32)> {
        self.slots.get(name).map(|(stem, n)| (stem.as_str(), *n))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// `"PART12"` → `("PART", 12)`.  The stem must be non-empty.
fn split_slot(name: &str) -> Option<(&str, u32)> {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if stem.is_empty() || stem.len() == name.len() {
        return None;
    }
    name[stem.len()..].parse().ok().map(|n| (stem, n))
}

#[derive(Debug, Clone)]
pub struct Exporter {
    converter:      Converter,
    identity_field: Option<String>,
    group_slots:    bool,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(Converter::default())
    }
}

impl Exporter {
    /// Slot grouping on, no identity field.
    pub fn new(converter: Converter) -> Self {
        Self { converter, identity_field: None, group_slots: true }
    }

    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }

    pub fn group_slots(mut self, on: bool) -> Self {
        self.group_slots = on;
        self
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity_field.as_deref()
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn value(&self, value: &Value) -> Json {
        match value {
            Value::Text(b)    => Json::String(self.converter.convert_text(b)),
            Value::Integer(i) => Json::from(*i),
            Value::Float(f)   => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
            Value::Bool(b)    => Json::Bool(*b),
        }
    }

    /// Identity value of `record` rendered as a string key.
    pub fn key_of(&self, record: &Record) -> Option<String> {
        let field = self.identity_field.as_deref()?;
        record.get(field).map(|v| match self.value(v) {
            Json::String(s) => s,
            other => other.to_string(),
        })
    }

    pub fn shape(&self, layout: &SlotLayout, record: &Record) -> Map<String, Json> {
        let mut out = Map::new();
        let mut grouped: BTreeMap<&str, BTreeMap<u32, Json>> = BTreeMap::new();
        for (name, value) in record.iter() {
            match layout.slot(name).filter(|_| self.group_slots) {
                Some((stem, n)) => {
                    grouped.entry(stem).or_default().insert(n, self.value(value));
                }
                None => {
                    out.insert(name.to_owned(), self.value(value));
                }
            }
        }
        for (stem, slots) in grouped {
            out.insert(stem.to_owned(), Json::Array(slots.into_values().collect()));
        }
        out
    }

    /// Keyed rows as `(key, shaped)`; rows without an identity are skipped.
    pub fn keyed(&self, layout: &SlotLayout, records: &[Record]) -> Vec<(String, Map<String, Json>)> {
        let mut out = Vec::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            match self.key_of(record) {
                Some(key) => out.push((key, self.shape(layout, record))),
                None => warn!(
                    "row {row}: no value for identity field {:?}, skipped",
                    self.identity_field.as_deref().unwrap_or_default()
                ),
            }
        }
        out
    }

    /// Whole table as JSON: an object keyed by identity when configured,
    /// otherwise an array in row order.
    pub fn export_table(&self, table: &Table) -> Result<Json, TableError> {
        let records = table.records()?;
        let layout = SlotLayout::from_fields(table.fields());
        let json = if self.identity_field.is_some() {
            let mut obj = Map::new();
            for (key, shaped) in self.keyed(&layout, &records) {
                if obj.insert(key.clone(), Json::Object(shaped)).is_some() {
                    warn!("duplicate identity {key:?}, later row wins");
                }
            }
            Json::Object(obj)
        } else {
            Json::Array(records.iter().map(|r| Json::Object(self.shape(&layout, r))).collect())
        };
        info!("exported {} of {} rows", json_len(&json), records.len());
        Ok(json)
    }
}

fn json_len(json: &Json) -> usize {
    match json {
        Json::Array(a)  => a.len(),
        Json::Object(o) => o.len(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CharMapping;
    use crate::config::ConvertOptions;
    use crate::schema::FieldType;

    fn fields(names: &[&str]) -> Vec<Field> {
        names
            .iter()
            .map(|n| Field { name: n.to_string(), field_type: FieldType::Long, width: 4, offset: 0 })
            .collect()
    }

    fn exporter() -> Exporter {
        Exporter::new(Converter::new(CharMapping::iran_system(), ConvertOptions::default()))
    }

    #[test]
    fn slot_stems_need_two_members() {
        let layout = SlotLayout::from_fields(&fields(&["PART1", "PART2", "CODE", "X9", "10"]));
        assert_eq!(layout.slot("PART2"), Some(("PART", 2)));
        assert_eq!(layout.slot("X9"), None);
        assert_eq!(layout.slot("10"), None);
        assert_eq!(layout.slot("CODE"), None);
    }

    #[test]
    fn grouped_slots_skip_absent_values() {
        let layout = SlotLayout::from_fields(&fields(&["P1", "P2", "P3", "CODE"]));
        let mut rec = Record::new();
        rec.insert("CODE", Value::Integer(7));
        rec.insert("P3", Value::Integer(30));
        rec.insert("P1", Value::Integer(10));
        let shaped = exporter().shape(&layout, &rec);
        assert_eq!(Json::Object(shaped), serde_json::json!({"CODE": 7, "P": [10, 30]}));

        let flat = exporter().group_slots(false).shape(&layout, &rec);
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn default_exporter_groups_slots() {
        let layout = SlotLayout::from_fields(&fields(&["P1", "P2"]));
        let mut rec = Record::new();
        rec.insert("P1", Value::Integer(1));
        rec.insert("P2", Value::Integer(2));
        let shaped = Exporter::default().shape(&layout, &rec);
        assert_eq!(Json::Object(shaped), serde_json::json!({"P": [1, 2]}));
    }

    #[test]
    fn text_is_converted_and_keys_rendered() {
        let mut rec = Record::new();
        rec.insert("NAME", Value::Text(b"ARDUINO \x91\x93".to_vec()));
        rec.insert("ID", Value::Integer(42));
        let ex = exporter().identity_field("ID");
        assert_eq!(ex.key_of(&rec).as_deref(), Some("42"));
        let shaped = ex.shape(&SlotLayout::default(), &rec);
        assert_eq!(shaped["NAME"], Json::String("با ARDUINO".into()));
    }

    #[test]
    fn nan_becomes_null() {
        assert_eq!(exporter().value(&Value::Float(f64::NAN)), Json::Null);
    }
}
