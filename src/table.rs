use std::collections::{btree_map, BTreeMap};
use std::iter::Peekable;

use crate::perfect_hash::{lookup, PerfectHash};
use crate::section::{write_array, write_strings, ArrayView, StringView};
use crate::{
    Error, HashTableMeta, InlineTableMeta, Limits, Result, SectionSink, StringTableWriter,
    TableKind, TableMeta,
};

/// Perfect-hash table viewed in place over the mapped file.
///
/// Entries are stored sorted by key; `vs` maps each hash slot to the entry
/// index in the `keys` and `values` string sections.
#[derive(Debug, Clone, Copy)]
pub struct HashTable<'a> {
    gs: ArrayView<'a, i32>,
    vs: ArrayView<'a, i32>,
    keys: StringView<'a>,
    values: StringView<'a>,
}

impl<'a> HashTable<'a> {
    /// Builds views for `meta` over `base`, checking every section is in range
    /// and all four have the same cardinality.
    pub fn new(base: &'a [u8], meta: &HashTableMeta) -> Result<Self> {
        let table = Self {
            gs: ArrayView::new(base, meta.gs)?,
            vs: ArrayView::new(base, meta.vs)?,
            keys: StringView::new(base, meta.keys)?,
            values: StringView::new(base, meta.values)?,
        };
        let n = table.gs.len();
        if n == 0 || table.vs.len() != n || table.keys.len() != n || table.values.len() != n {
            return Err(Error::OutOfBounds(format!(
                "inconsistent hash table sections: gs={} vs={} keys={} values={}",
                n,
                table.vs.len(),
                table.keys.len(),
                table.values.len()
            )));
        }
        Ok(table)
    }

    /// Looks `key` up in constant time.
    ///
    /// The stored key at the resolved slot is compared with `key`, so keys
    /// that were never inserted report [`Error::NotFound`] even when they hash
    /// onto an occupied slot.
    pub fn get(&self, key: &[u8]) -> Result<&'a [u8]> {
        let index = lookup(&self.gs, &self.vs, key)?.ok_or(Error::NotFound)?;
        let index = usize::try_from(index)
            .map_err(|_| Error::OutOfBounds(format!("negative entry index {}", index)))?;
        if self.keys.get(index)? != key {
            return Err(Error::NotFound);
        }
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Table stored directly in the sidecar.
#[derive(Debug, Clone, Copy)]
pub struct InlineTable<'a> {
    dct: &'a BTreeMap<String, String>,
    raw: &'a [(Vec<u8>, Vec<u8>)],
}

impl<'a> InlineTable<'a> {
    /// Checks that the binary entries are strictly sorted by key.
    pub fn new(meta: &'a InlineTableMeta) -> Result<Self> {
        if meta.raw.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(Error::InvalidStringContent(
                "inline binary entries are not sorted by key".to_string(),
            ));
        }
        Ok(Self {
            dct: &meta.dct,
            raw: &meta.raw,
        })
    }

    pub fn get(&self, key: &[u8]) -> Result<&'a [u8]> {
        let raw = self.raw;
        std::str::from_utf8(key)
            .ok()
            .and_then(|key| self.dct.get(key))
            .map(|value| value.as_bytes())
            .or_else(|| {
                raw.binary_search_by(|(k, _)| k.as_slice().cmp(key))
                    .ok()
                    .map(|i| raw[i].1.as_slice())
            })
            .ok_or(Error::NotFound)
    }

    pub fn len(&self) -> usize {
        self.dct.len() + self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named table of a [`StringTableFile`](crate::StringTableFile).
///
/// Values borrow from the open file; nothing is copied on lookup.
#[derive(Debug, Clone, Copy)]
pub enum Table<'a> {
    Hash(HashTable<'a>),
    Inline(InlineTable<'a>),
}

impl<'a> Table<'a> {
    /// Selects the decode path from the sidecar discriminant.
    pub fn new(base: &'a [u8], meta: &'a TableMeta) -> Result<Self> {
        Ok(match meta {
            TableMeta::Hash(meta) => Table::Hash(HashTable::new(base, meta)?),
            TableMeta::Inline(meta) => Table::Inline(InlineTable::new(meta)?),
        })
    }

    /// Returns the value stored for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the key is absent, or
    /// [`Error::OutOfBounds`] if the file is corrupt.
    pub fn get<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Result<&'a [u8]> {
        match self {
            Table::Hash(table) => table.get(key.as_ref()),
            Table::Inline(table) => table.get(key.as_ref()),
        }
    }

    /// Like [`get`](Self::get) but decodes the value as UTF-8.
    pub fn get_str<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Result<&'a str> {
        let value = self.get(key)?;
        std::str::from_utf8(value)
            .map_err(|e| Error::InvalidStringContent(format!("value is not UTF-8: {}", e)))
    }

    pub fn contains_key<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn kind(&self) -> TableKind {
        match self {
            Table::Hash(_) => TableKind::Hash,
            Table::Inline(_) => TableKind::Inline,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Table::Hash(table) => table.len(),
            Table::Inline(table) => table.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> TableIter<'a> {
        match *self {
            Table::Hash(table) => TableIter::Hash { table, index: 0 },
            Table::Inline(table) => TableIter::Inline {
                dct: table.dct.iter().peekable(),
                raw: table.raw.iter().peekable(),
            },
        }
    }
}

/// Iterator over the entries of a [`Table`].
pub enum TableIter<'a> {
    Hash { table: HashTable<'a>, index: usize },
    Inline {
        dct: Peekable<btree_map::Iter<'a, String, String>>,
        raw: Peekable<std::slice::Iter<'a, (Vec<u8>, Vec<u8>)>>,
    },
}

impl<'a> Iterator for TableIter<'a> {
    type Item = Result<(&'a [u8], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            TableIter::Hash { table, index } => {
                if *index >= table.len() {
                    return None;
                }
                let i = *index;
                *index += 1;
                Some(
                    table
                        .keys
                        .get(i)
                        .and_then(|key| Ok((key, table.values.get(i)?))),
                )
            }
            TableIter::Inline { dct, raw } => {
                // merge the two key-sorted halves
                let text_first = match (dct.peek(), raw.peek()) {
                    (Some((key, _)), Some((raw_key, _))) => key.as_bytes() < raw_key.as_slice(),
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                let entry = if text_first {
                    dct.next().map(|(key, value)| (key.as_bytes(), value.as_bytes()))
                } else {
                    raw.next().map(|(key, value)| (key.as_slice(), value.as_slice()))
                };
                entry.map(Ok)
            }
        }
    }
}

/// Writes one table and returns its sidecar entry.
///
/// Non-empty tables are stored as perfect-hash sections appended to `sink`.
/// When construction exhausts `limits.max_hash_iterations`, the table is kept
/// inline in the sidecar instead, provided its JSON encoding stays below
/// `limits.max_inline_bytes`. Empty tables are always inline.
///
/// # Errors
///
/// [`Error::InvalidStringContent`] for keys or values containing NUL,
/// [`Error::TableTooLarge`] when the inline fallback is too big, and any I/O
/// error from `sink`.
pub fn write_table<W: StringTableWriter>(
    sink: &mut SectionSink<'_, W>,
    name: &str,
    entries: &BTreeMap<Vec<u8>, Vec<u8>>,
    limits: &Limits,
) -> Result<TableMeta> {
    for (key, value) in entries {
        for s in [key, value] {
            if s.contains(&0) {
                return Err(Error::InvalidStringContent(format!(
                    "table {:?}: embedded NUL in {:?}",
                    name,
                    String::from_utf8_lossy(s)
                )));
            }
        }
    }

    if entries.is_empty() {
        return Ok(TableMeta::Inline(InlineTableMeta::default()));
    }

    let keys: Vec<&[u8]> = entries.keys().map(Vec::as_slice).collect();
    match PerfectHash::build(&keys, limits.max_hash_iterations) {
        Ok(hash) => {
            let start = sink.position();
            let meta = HashTableMeta {
                gs: write_array(sink, &hash.gs)?,
                vs: write_array(sink, &hash.vs)?,
                keys: write_strings(sink, entries.keys())?,
                values: write_strings(sink, entries.values())?,
            };
            tracing::debug!(
                table = name,
                entries = entries.len(),
                bytes = sink.position() - start,
                "hash table written"
            );
            Ok(TableMeta::Hash(meta))
        }
        Err(Error::ConstructionFailed { iterations }) => {
            let meta = inline_meta(entries);
            let size = serde_json::to_vec(&meta)?.len();
            if size >= limits.max_inline_bytes {
                return Err(Error::TableTooLarge {
                    table: name.to_string(),
                    size,
                    limit: limits.max_inline_bytes,
                });
            }
            tracing::warn!(
                table = name,
                entries = entries.len(),
                iterations,
                inline_bytes = size,
                "perfect hash construction failed, storing table inline"
            );
            Ok(TableMeta::Inline(meta))
        }
        Err(e) => Err(e),
    }
}

fn inline_meta(entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> InlineTableMeta {
    let mut meta = InlineTableMeta::default();
    for (key, value) in entries {
        match (std::str::from_utf8(key), std::str::from_utf8(value)) {
            (Ok(key), Ok(value)) => {
                meta.dct.insert(key.to_string(), value.to_string());
            }
            _ => meta.raw.push((key.clone(), value.clone())),
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::MemoryWriter;

    fn entries(pairs: &[(&str, &str)]) -> BTreeMap<Vec<u8>, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
            .collect()
    }

    fn write(entries: &BTreeMap<Vec<u8>, Vec<u8>>, limits: Limits) -> Result<(Vec<u8>, TableMeta)> {
        let writer = MemoryWriter::default();
        let mut sink = SectionSink::new(&writer, 1024);
        let meta = write_table(&mut sink, "test", entries, &limits)?;
        sink.finish()?;
        Ok((writer.into_inner(), meta))
    }

    #[test]
    fn test_hash_table() {
        let entries = entries(&[("abc", "def"), ("ghi", "jkl"), ("mno", "pqr"), ("stu", "pqr")]);
        let (data, meta) = write(&entries, Limits::default()).unwrap();
        assert_eq!(meta.kind(), TableKind::Hash);

        let table = Table::new(&data, &meta).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("abc").unwrap(), b"def");
        assert_eq!(table.get_str("stu").unwrap(), "pqr");
        assert!(matches!(table.get("xyz"), Err(Error::NotFound)));
        assert!(!table.contains_key("").unwrap());

        let collected = table.iter().collect::<Result<Vec<_>>>().unwrap();
        let expected: Vec<(&[u8], &[u8])> = entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
            .collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn test_empty_table_is_inline() {
        let (data, meta) = write(&BTreeMap::new(), Limits::default()).unwrap();
        assert!(data.is_empty());
        let table = Table::new(&data, &meta).unwrap();
        assert_eq!(table.kind(), TableKind::Inline);
        assert!(table.is_empty());
        assert!(matches!(table.get("a"), Err(Error::NotFound)));
    }

    #[test]
    fn test_inline_fallback() {
        let pairs: Vec<(String, String)> = (0..50)
            .map(|i| (format!("k{}", i), format!("v{}", i % 7)))
            .collect();
        let entries: BTreeMap<Vec<u8>, Vec<u8>> = pairs
            .iter()
            .map(|(k, v)| (k.clone().into_bytes(), v.clone().into_bytes()))
            .collect();
        let limits = Limits {
            max_hash_iterations: 0,
            ..Limits::default()
        };

        let (data, meta) = write(&entries, limits).unwrap();
        assert!(data.is_empty());
        let table = Table::new(&data, &meta).unwrap();
        assert_eq!(table.kind(), TableKind::Inline);
        for (k, v) in &pairs {
            assert_eq!(table.get_str(k).unwrap(), v);
        }
        assert!(matches!(table.get("k50"), Err(Error::NotFound)));
        assert!(matches!(table.get(&[0xffu8][..]), Err(Error::NotFound)));

        let limits = Limits {
            max_hash_iterations: 0,
            max_inline_bytes: 64,
        };
        assert!(matches!(
            write(&entries, limits),
            Err(Error::TableTooLarge { limit: 64, .. })
        ));
    }

    #[test]
    fn test_inline_fallback_keeps_binary() {
        // 0x80 and 0x82 agree in the low bit, so no displacement separates them
        let entries = BTreeMap::from([(vec![0x80], vec![0x01]), (vec![0x82], vec![0x02])]);
        let (data, meta) = write(&entries, Limits::default()).unwrap();
        assert!(data.is_empty());
        let table = Table::new(&data, &meta).unwrap();
        assert_eq!(table.kind(), TableKind::Inline);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&[0x80u8][..]).unwrap(), [0x01]);
        assert_eq!(table.get(&[0x82u8][..]).unwrap(), [0x02]);
        assert!(matches!(table.get(&[0x81u8][..]), Err(Error::NotFound)));

        // text and binary entries side by side, iterated in key order
        let mut entries = entries;
        entries.insert(b"a".to_vec(), b"text".to_vec());
        entries.insert(b"z".to_vec(), vec![0xff]);
        entries.insert(vec![0xc3, 0xa9], b"e".to_vec());
        let limits = Limits {
            max_hash_iterations: 0,
            ..Limits::default()
        };
        let (data, meta) = write(&entries, limits).unwrap();
        let TableMeta::Inline(inline) = &meta else {
            panic!("expected inline table");
        };
        assert_eq!(inline.dct.len(), 2);
        assert_eq!(inline.raw.len(), 3);

        let table = Table::new(&data, &meta).unwrap();
        assert_eq!(table.get_str("a").unwrap(), "text");
        assert_eq!(table.get("z").unwrap(), [0xff]);
        assert_eq!(table.get_str("\u{e9}").unwrap(), "e");
        let collected = table.iter().collect::<Result<Vec<_>>>().unwrap();
        let expected: Vec<(&[u8], &[u8])> = entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
            .collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn test_unsorted_inline_rejected() {
        let meta = TableMeta::Inline(InlineTableMeta {
            dct: BTreeMap::new(),
            raw: vec![(vec![0x82], vec![2]), (vec![0x80], vec![1])],
        });
        assert!(matches!(
            Table::new(&[], &meta),
            Err(Error::InvalidStringContent(_))
        ));
    }

    #[test]
    fn test_rejects_nul() {
        let entries = entries(&[("a", "b\0c")]);
        assert!(matches!(
            write(&entries, Limits::default()),
            Err(Error::InvalidStringContent(_))
        ));
        let entries = BTreeMap::from([(b"a\0".to_vec(), b"b".to_vec())]);
        assert!(matches!(
            write(&entries, Limits::default()),
            Err(Error::InvalidStringContent(_))
        ));
    }

    #[test]
    fn test_inconsistent_sections() {
        let entries = entries(&[("abc", "def"), ("ghi", "jkl")]);
        let (data, meta) = write(&entries, Limits::default()).unwrap();
        let TableMeta::Hash(mut hash) = meta else {
            panic!("expected hash table");
        };
        hash.vs.length -= 4;
        assert!(matches!(
            HashTable::new(&data, &hash),
            Err(Error::OutOfBounds(_))
        ));
    }
}
