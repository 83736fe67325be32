use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Error, ErrorKind};
use std::path::{Path, PathBuf};
use strtable::{Limits, StringTableBuilder, StringTableFile};
use tracing_subscriber::EnvFilter;

fn main() -> strtable::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info(args) => run_info(args),
        Command::Get(args) => run_get(args),
        Command::Convert(args) => run_convert(args),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "utility for inspecting and creating string table files",
    subcommand_required = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect a string table file and print basic information
    Info(InfoArgs),
    /// Look one key up in a table and print its value
    Get(GetArgs),
    /// Convert a JSON document of tables into a string table file
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
struct InfoArgs {
    /// Path to the binary file; the sidecar is read from FILE.info
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Print every entry of this table
    #[arg(long, value_name = "TABLE")]
    dump: Option<String>,
}

#[derive(clap::Args)]
struct GetArgs {
    /// Path to the binary file; the sidecar is read from FILE.info
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Table to look the key up in
    #[arg(value_name = "TABLE")]
    table: String,

    /// Key to look up
    #[arg(value_name = "KEY")]
    key: String,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Path to the source JSON file, shaped as {"table": {"key": "value"}}
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Path to the binary file to produce
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Optional override for the displacement search cap
    #[arg(long, value_name = "COUNT", default_value_t = Limits::default().max_hash_iterations)]
    max_hash_iterations: u32,

    /// Optional override for the inline table size cap
    #[arg(long, value_name = "BYTES", default_value_t = Limits::default().max_inline_bytes)]
    max_inline_bytes: usize,

    /// Optional override for writer buffer size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 16 << 20)]
    buffer_size: usize,
}

fn run_info(args: InfoArgs) -> strtable::Result<()> {
    let file = StringTableFile::open(&args.input)?;

    let json = serde_json::to_string_pretty(&file.info())?;
    println!("{}", json);

    if let Some(name) = args.dump {
        for entry in file.get(&name)?.iter() {
            let (key, value) = entry?;
            println!(
                "{}\t{}",
                String::from_utf8_lossy(key),
                String::from_utf8_lossy(value)
            );
        }
    }

    Ok(())
}

fn run_get(args: GetArgs) -> strtable::Result<()> {
    let file = StringTableFile::open(&args.input)?;
    let table = file.get(&args.table)?;
    let value = table.get(&args.key)?;
    println!("{}", String::from_utf8_lossy(value));
    Ok(())
}

fn run_convert(args: ConvertArgs) -> strtable::Result<()> {
    let tables = load_tables_from_json(&args.input)?;

    let info = StringTableBuilder::default()
        .with_max_hash_iterations(args.max_hash_iterations)
        .with_max_inline_bytes(args.max_inline_bytes)
        .with_writer_buffer_size(args.buffer_size)
        .build(&args.output, tables)?;

    let json = serde_json::to_string_pretty(&info)?;
    println!("{}", json);

    Ok(())
}

fn load_tables_from_json(path: &Path) -> strtable::Result<Vec<(String, BTreeMap<String, String>)>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let value: Value = serde_json::from_reader(reader)?;
    extract_tables(value)
}

fn extract_tables(value: Value) -> strtable::Result<Vec<(String, BTreeMap<String, String>)>> {
    let tables = match value {
        Value::Object(tables) => tables,
        other => {
            return Err(invalid_json(format!(
                "unsupported JSON top-level type: {other}"
            )));
        }
    };
    let mut result = Vec::with_capacity(tables.len());
    for (name, table) in tables {
        let entries = match table {
            Value::Object(entries) => entries,
            other => {
                return Err(invalid_json(format!(
                    "table {name} must be an object, found {other}"
                )));
            }
        };
        let mut dct = BTreeMap::new();
        for (key, value) in entries {
            match value {
                Value::String(s) => {
                    dct.insert(key, s);
                }
                other => {
                    return Err(invalid_json(format!(
                        "table {name}: key {key} expects string value, found {other}"
                    )));
                }
            }
        }
        result.push((name, dct));
    }
    Ok(result)
}

fn invalid_json(message: String) -> strtable::Error {
    Error::new(ErrorKind::InvalidData, message).into()
}
