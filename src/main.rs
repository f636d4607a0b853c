use clap::{Args, Parser, Subcommand};
use log::info;
use pxconv::config::{Config, ConvertOptions};
use pxconv::export::{Exporter, SlotLayout};
use pxconv::{Converter, Snapshot, Table};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pxconv", about = "Legacy table reader with Iran System text recovery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ConvertArgs {
    /// JSON settings file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Tab-separated byte mapping table (default: built-in Iran System)
    #[arg(short, long)]
    mapping: Option<PathBuf>,
    /// Keep the legacy dash marker byte as-is
    #[arg(long)]
    no_dash_fix: bool,
    /// Skip visual-to-logical reordering
    #[arg(long)]
    no_rtl: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header and schema summary
    Info {
        input: PathBuf,
    },
    /// List fields with type, width and row offset
    Fields {
        input: PathBuf,
    },
    /// Export all records as JSON
    Export {
        input: PathBuf,
        #[command(flatten)]
        convert: ConvertArgs,
        /// Key records by this field instead of emitting an array
        #[arg(short, long)]
        identity: Option<String>,
        /// Keep numbered fields (PART1, PART2, ...) flat instead of arrays
        #[arg(long)]
        no_slots: bool,
        #[arg(short, long)]
        pretty: bool,
    },
    /// Convert one hex-encoded byte string
    Convert {
        hex: String,
        #[command(flatten)]
        convert: ConvertArgs,
    },
    /// Compare two versions of a table by identity field
    Diff {
        old: PathBuf,
        new: PathBuf,
        #[arg(short, long)]
        identity: Option<String>,
        /// Keep numbered fields flat when fingerprinting
        #[arg(long)]
        no_slots: bool,
        #[command(flatten)]
        convert: ConvertArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let table = Table::open(&input)?;
            let h = table.header();
            println!("── Legacy table ─────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  File type      {:#04x}", h.file_type);
            println!("  Row width      {} B", h.row_width);
            println!("  Data offset    {} B", h.data_offset());
            println!("  Rows declared  {}", table.num_records());
            println!("  Rows present   {}", table.available_records()?);
            println!("  Fields         {}", table.num_fields());
        }

        // ── Fields ───────────────────────────────────────────────────────────
        Commands::Fields { input } => {
            let table = Table::open(&input)?;
            println!("{:<24} {:<8} {:>6} {:>6}", "Name", "Type", "Width", "Offset");
            for f in table.fields() {
                let width = if f.is_estimated() { format!("~{}", f.width) } else { f.width.to_string() };
                println!("{:<24} {:<8} {:>6} {:>6}", f.name, f.field_type.name(), width, f.offset);
            }
        }

        // ── Export ───────────────────────────────────────────────────────────
        Commands::Export { input, convert, identity, no_slots, pretty } => {
            let config = load_config(&convert)?;
            let exporter = exporter(&config, identity, no_slots)?;
            let json = exporter.export_table(&Table::open(&input)?)?;
            if pretty {
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("{}", serde_json::to_string(&json)?);
            }
        }

        // ── Convert ──────────────────────────────────────────────────────────
        Commands::Convert { hex, convert } => {
            let config = load_config(&convert)?;
            let bytes = hex::decode(hex.trim())?;
            println!("{}", converter(&config)?.convert_text(&bytes));
        }

        // ── Diff ─────────────────────────────────────────────────────────────
        Commands::Diff { old, new, identity, no_slots, convert } => {
            let config = load_config(&convert)?;
            let exporter = exporter(&config, identity, no_slots)?;
            if exporter.identity().is_none() {
                return Err("diff needs --identity or identity_field in the config".into());
            }
            let before = snapshot(&exporter, &old)?;
            let after = snapshot(&exporter, &new)?;
            let changes = after.diff(&before);
            println!("{}", serde_json::to_string_pretty(&changes)?);
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn load_config(args: &ConvertArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(mapping) = &args.mapping {
        config.mapping = Some(mapping.clone());
    }
    config.options = ConvertOptions {
        dash_fix: config.options.dash_fix && !args.no_dash_fix,
        rtl:      config.options.rtl && !args.no_rtl,
    };
    Ok(config)
}

fn converter(config: &Config) -> Result<Converter, Box<dyn std::error::Error>> {
    let conv = config.converter()?;
    info!("converter: {} mapping entries, {:?}", conv.mapping().len(), conv.options());
    Ok(conv)
}

fn exporter(
    config:   &Config,
    identity: Option<String>,
    no_slots: bool,
) -> Result<Exporter, Box<dyn std::error::Error>> {
    let mut ex = Exporter::new(converter(config)?).group_slots(config.group_slots && !no_slots);
    if let Some(field) = identity.or_else(|| config.identity_field.clone()) {
        ex = ex.identity_field(field);
    }
    Ok(ex)
}

fn snapshot(exporter: &Exporter, path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let table = Table::open(path)?;
    let layout = SlotLayout::from_fields(table.fields());
    Ok(Snapshot::build(exporter, &layout, &table.records()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pxconv::{Field, FieldType, Record, Value};

    fn slot_record() -> (SlotLayout, Record) {
        let fields: Vec<Field> = ["P1", "P2"]
            .iter()
            .map(|n| Field { name: n.to_string(), field_type: FieldType::Long, width: 4, offset: 0 })
            .collect();
        let mut rec = Record::new();
        rec.insert("P1", Value::Integer(1));
        rec.insert("P2", Value::Integer(2));
        (SlotLayout::from_fields(&fields), rec)
    }

    #[test]
    fn slot_flag_and_config_combine() {
        let (layout, rec) = slot_record();
        let grouped = exporter(&Config::default(), None, false).unwrap().shape(&layout, &rec);
        assert_eq!(grouped.len(), 1);

        let flat = exporter(&Config::default(), None, true).unwrap().shape(&layout, &rec);
        assert_eq!(flat.len(), 2);

        let off = Config { group_slots: false, ..Config::default() };
        let flat = exporter(&off, None, false).unwrap().shape(&layout, &rec);
        assert_eq!(flat.len(), 2);
    }
}
