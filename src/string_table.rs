use std::path::Path;

use crate::{sidecar_path, Error, FileMeta, MappedFile, Result, StringTableInfo, Table};

/// Open handle on a string table file.
///
/// A `StringTableFile` owns the bytes of the binary file (normally a
/// read-only [`MappedFile`]) together with the parsed sidecar. Tables are
/// views borrowing from the handle, so lookups never copy or deserialize;
/// dropping the handle unmaps the file and closes its descriptor.
///
/// # Type Parameters
/// - `R`: owner of the binary file's bytes; anything that is `AsRef<[u8]>`.
#[derive(Debug)]
pub struct StringTableFile<R: AsRef<[u8]> = MappedFile> {
    meta: FileMeta,
    source: R,
}

impl StringTableFile<MappedFile> {
    /// Parses `path.info`, then memory-maps `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when either file cannot be read or mapped, the
    /// sidecar is malformed, or a section lies outside the binary file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let sidecar = std::fs::read(sidecar_path(path))?;
        let meta: FileMeta = serde_json::from_slice(&sidecar)?;
        let source = MappedFile::open(path)?;
        tracing::debug!(
            path = %path.display(),
            tables = meta.len(),
            mapped_bytes = source.len(),
            "string table file opened"
        );
        Self::load(source, meta)
    }
}

impl<R: AsRef<[u8]>> StringTableFile<R> {
    /// Wraps already loaded bytes and layout.
    ///
    /// Every table view is constructed once here so that layout errors
    /// surface at open time rather than on first lookup.
    pub fn load(source: R, meta: FileMeta) -> Result<Self> {
        for table in meta.values() {
            Table::new(source.as_ref(), table)?;
        }
        Ok(Self { meta, source })
    }

    /// Returns the table called `name`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTable`] when no such table was written.
    pub fn get(&self, name: &str) -> Result<Table<'_>> {
        let meta = self
            .meta
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
        Table::new(self.source.as_ref(), meta)
    }

    /// Table names in write order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.meta.keys().map(String::as_str)
    }

    /// Iterates over all tables in write order.
    pub fn tables(&self) -> impl Iterator<Item = Result<(&str, Table<'_>)>> {
        self.meta.iter().map(|(name, meta)| {
            Table::new(self.source.as_ref(), meta).map(|table| (name.as_str(), table))
        })
    }

    /// The parsed sidecar.
    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    /// Summary of the file's tables.
    pub fn info(&self) -> StringTableInfo {
        StringTableInfo::new(&self.meta, self.source.as_ref().len() as u64)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }
}
