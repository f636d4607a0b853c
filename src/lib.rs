pub mod header;
pub mod schema;
pub mod record;
pub mod table;
pub mod codec;
pub mod bidi;
pub mod config;
pub mod export;
pub mod diff;

pub use header::{Header, FormatError, HEADER_SIZE};
pub use schema::{Field, FieldType, Schema};
pub use record::{Record, Value, TruncatedRecord};
pub use table::{Table, TableError};
pub use codec::{convert, reverse_bytes, unmirror, CharMapping, MappingError};
pub use bidi::reorder_visual_to_logical;
pub use config::{Config, ConfigError, ConvertOptions, Converter};
pub use export::{Exporter, SlotLayout};
pub use diff::{ChangeSet, Snapshot};
