//! Write-once, read-optimized string tables persisted to a binary file plus a
//! JSON sidecar.
//!
//! The `strtable` crate stores named key→string dictionaries so that they can
//! be memory-mapped and queried in constant time without deserializing
//! anything. Each table is encoded with a minimal perfect hash (a displacement
//! array and a slot array) next to deduplicated, null-terminated key and value
//! blobs. Tables whose hash cannot be built within the iteration budget are
//! kept inline in the sidecar instead.
//!
//! Typical usage writes a set of tables with [`StringTableBuilder`] (or
//! [`write`]) and opens the result with [`StringTableFile`] (or [`open`]).
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! # fn main() -> strtable::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("fruits.bin");
//! let fruits = BTreeMap::from([("apple", "red"), ("banana", "yellow")]);
//! strtable::write(&path, [("fruits", fruits)])?;
//!
//! let file = strtable::open(&path)?;
//! let table = file.get("fruits")?;
//! assert_eq!(table.get_str("banana")?, "yellow");
//! assert!(matches!(table.get("cherry"), Err(strtable::Error::NotFound)));
//! # Ok(())
//! # }
//! ```
use std::path::Path;

pub mod config;
pub use config::Limits;

mod error;
pub use error::{Error, Result};

pub mod hasher;

mod meta;
pub use meta::{
    sidecar_path, FileMeta, HashTableMeta, InlineTableMeta, SectionMeta, StringSectionMeta,
    StringTableInfo, TableInfo, TableKind, TableMeta,
};

pub mod perfect_hash;

mod reader;
pub use reader::MappedFile;

mod writer;
pub use writer::{SectionSink, StringTableWriter};

pub mod section;

pub mod table;
pub use table::{HashTable, InlineTable, Table, TableIter};

mod string_table;
pub use string_table::StringTableFile;

mod builder;
pub use builder::StringTableBuilder;

/// Writes `tables` to `path` and its `.info` sidecar with the current limits.
///
/// Shorthand for `StringTableBuilder::default().build(path, tables)`.
pub fn write<P, I, N, T, K, V>(path: P, tables: I) -> Result<StringTableInfo>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (N, T)>,
    N: Into<String>,
    T: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    StringTableBuilder::default().build(path, tables)
}

/// Opens the string table file at `path`; see [`StringTableFile::open`].
pub fn open(path: impl AsRef<Path>) -> Result<StringTableFile> {
    StringTableFile::open(path)
}
