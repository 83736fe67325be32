use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use crate::table::write_table;
use crate::{
    sidecar_path, Error, FileMeta, Limits, Result, SectionSink, StringTableInfo,
    StringTableWriter,
};

/// Builder type for emitting string table files.
///
/// The builder owns the construction limits and IO buffering. Use
/// [`build`](Self::build) to write a binary file plus its `.info` sidecar, or
/// [`write_tables`](Self::write_tables) to stream only the binary part into
/// any [`StringTableWriter`].
#[derive(Debug, Clone)]
pub struct StringTableBuilder {
    limits: Limits,
    writer_buffer_size: usize,
}

impl Default for StringTableBuilder {
    /// Starts from [`Limits::current`], so scoped overrides apply.
    fn default() -> Self {
        Self {
            limits: Limits::current(),
            writer_buffer_size: 16 << 20, // 16 MiB
        }
    }
}

impl StringTableBuilder {
    /// Replaces all construction limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Caps the displacement search of perfect hash construction.
    ///
    /// Tables whose construction exceeds the cap fall back to inline storage.
    pub fn with_max_hash_iterations(mut self, iterations: u32) -> Self {
        self.limits.max_hash_iterations = iterations;
        self
    }

    /// Caps the JSON size of a table stored inline in the sidecar.
    pub fn with_max_inline_bytes(mut self, bytes: usize) -> Self {
        self.limits.max_inline_bytes = bytes;
        self
    }

    /// Adjusts the capacity of the buffered writer used while streaming data.
    pub fn with_writer_buffer_size(mut self, size: usize) -> Self {
        self.writer_buffer_size = size;
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Writes `tables` to `path` and the layout to `path.info`.
    ///
    /// Tables are written in iteration order. Any existing sidecar is removed
    /// first, so a write that fails leaves no openable pair behind. The binary
    /// file and the sidecar are still written one after the other, not
    /// atomically; callers that need atomic replacement should build into a
    /// temporary path and rename both files.
    ///
    /// # Errors
    ///
    /// Returns an error if any table cannot be stored (see
    /// [`write_table`](crate::table::write_table)), a table name repeats, or
    /// an IO operation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use strtable::{StringTableBuilder, StringTableFile};
    ///
    /// # fn main() -> strtable::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let path = dir.path().join("colors.bin");
    /// let colors = BTreeMap::from([("red", "#f00"), ("green", "#0f0")]);
    /// let info = StringTableBuilder::default().build(&path, [("colors", colors)])?;
    /// assert_eq!(info.tables["colors"].entry_count, 2);
    ///
    /// let file = StringTableFile::open(&path)?;
    /// assert_eq!(file.get("colors")?.get("red")?, b"#f00");
    /// # Ok(())
    /// # }
    /// ```
    pub fn build<P, I, N, T, K, V>(&self, path: P, tables: I) -> Result<StringTableInfo>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let path = path.as_ref();
        let sidecar = sidecar_path(path);
        // a stale sidecar must not describe a half-written binary
        match std::fs::remove_file(&sidecar) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let (meta, file_length) = {
            let file = File::create(path)?;
            self.write_tables(&file, tables)?
        };

        std::fs::write(&sidecar, serde_json::to_vec_pretty(&meta)?)?;

        tracing::debug!(
            path = %path.display(),
            tables = meta.len(),
            file_length,
            "string table file written"
        );
        Ok(StringTableInfo::new(&meta, file_length))
    }

    /// Streams the binary sections of `tables` into `writer` from offset zero.
    ///
    /// Returns the layout to be stored in the sidecar and the number of bytes
    /// written. Duplicate keys within a table keep the last value.
    pub fn write_tables<W, I, N, T, K, V>(&self, writer: &W, tables: I) -> Result<(FileMeta, u64)>
    where
        W: StringTableWriter,
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut sink = SectionSink::new(writer, self.writer_buffer_size);
        let mut meta = FileMeta::new();

        for (name, entries) in tables {
            let name = name.into();
            if meta.contains_key(&name) {
                return Err(Error::DuplicateTable(name));
            }
            let entries: BTreeMap<Vec<u8>, Vec<u8>> = entries
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_vec(), v.as_ref().to_vec()))
                .collect();
            let table = write_table(&mut sink, &name, &entries, &self.limits)?;
            meta.insert(name, table);
        }

        let length = sink.finish()?;
        Ok((meta, length))
    }
}
