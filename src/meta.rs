use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Byte range of one section inside the binary file.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SectionMeta {
    /// Absolute offset of the first byte.
    pub offset: u64,
    /// Length in bytes.
    pub length: u64,
}

impl SectionMeta {
    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// Descriptor of a deduplicated string section: the null-terminated blob and
/// the offset array that indexes into it.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StringSectionMeta {
    pub offsets: SectionMeta,
    pub bytes: SectionMeta,
}

/// Sections of a perfect-hash table.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HashTableMeta {
    /// Displacement array, little-endian `i32`.
    pub gs: SectionMeta,
    /// Slot to entry index array, little-endian `i32`.
    pub vs: SectionMeta,
    pub keys: StringSectionMeta,
    pub values: StringSectionMeta,
}

/// A table small or awkward enough to live directly in the sidecar.
///
/// Entries that are valid UTF-8 on both sides go to `dct`; the rest are kept
/// in `raw` as byte arrays, sorted by key.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct InlineTableMeta {
    pub dct: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw: Vec<(Vec<u8>, Vec<u8>)>,
}

/// Sidecar entry for one table; the variant name is the discriminant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TableMeta {
    Hash(HashTableMeta),
    Inline(InlineTableMeta),
}

impl TableMeta {
    pub fn kind(&self) -> TableKind {
        match self {
            TableMeta::Hash(_) => TableKind::Hash,
            TableMeta::Inline(_) => TableKind::Inline,
        }
    }

    /// Number of entries, as recorded by the layout.
    pub fn entry_count(&self) -> usize {
        match self {
            TableMeta::Hash(meta) => (meta.gs.length / 4) as usize,
            TableMeta::Inline(meta) => meta.dct.len() + meta.raw.len(),
        }
    }

    /// Bytes the table occupies in the binary file.
    pub fn binary_length(&self) -> u64 {
        match self {
            TableMeta::Hash(meta) => [
                meta.gs,
                meta.vs,
                meta.keys.offsets,
                meta.keys.bytes,
                meta.values.offsets,
                meta.values.bytes,
            ]
            .iter()
            .map(|section| section.length)
            .sum(),
            TableMeta::Inline(_) => 0,
        }
    }
}

/// Storage variant of a table.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Hash,
    Inline,
}

/// Contents of the `.info` sidecar: table name to layout, in write order.
pub type FileMeta = IndexMap<String, TableMeta>;

/// Path of the sidecar describing the binary file at `path`.
pub fn sidecar_path(path: impl AsRef<Path>) -> PathBuf {
    let mut sidecar = path.as_ref().as_os_str().to_owned();
    sidecar.push(".info");
    PathBuf::from(sidecar)
}

/// Per-table line of a [`StringTableInfo`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub kind: TableKind,
    /// Number of entries stored.
    pub entry_count: usize,
    /// Bytes this table occupies in the binary file.
    pub binary_length: u64,
}

/// Summary returned by [`StringTableBuilder::build`](crate::StringTableBuilder::build).
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct StringTableInfo {
    /// Final size of the binary file in bytes.
    pub file_length: u64,
    pub tables: IndexMap<String, TableInfo>,
}

impl StringTableInfo {
    pub fn new(meta: &FileMeta, file_length: u64) -> Self {
        let tables = meta
            .iter()
            .map(|(name, table)| {
                let info = TableInfo {
                    kind: table.kind(),
                    entry_count: table.entry_count(),
                    binary_length: table.binary_length(),
                };
                (name.clone(), info)
            })
            .collect();
        Self {
            file_length,
            tables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_shape() {
        let mut meta = FileMeta::new();
        meta.insert(
            "small".to_string(),
            TableMeta::Inline(InlineTableMeta {
                dct: BTreeMap::from([("a".to_string(), "b".to_string())]),
                raw: vec![(vec![0x80], vec![1, 2])],
            }),
        );
        meta.insert(
            "big".to_string(),
            TableMeta::Hash(HashTableMeta {
                gs: SectionMeta {
                    offset: 0,
                    length: 8,
                },
                ..Default::default()
            }),
        );

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["small"]["inline"]["dct"]["a"], "b");
        assert_eq!(json["small"]["inline"]["raw"][0][0][0], 0x80);
        assert_eq!(json["small"]["inline"]["raw"][0][1], serde_json::json!([1, 2]));
        assert_eq!(json["big"]["hash"]["gs"]["length"], 8);
        assert_eq!(json["big"]["hash"]["keys"]["offsets"]["offset"], 0);
        assert_eq!(json["big"]["hash"]["values"]["bytes"]["length"], 0);

        // write order survives a round trip
        let text = serde_json::to_string(&meta).unwrap();
        let parsed: FileMeta = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, meta);
        assert_eq!(
            parsed.keys().collect::<Vec<_>>(),
            vec!["small", "big"]
        );
        assert_eq!(parsed["big"].kind(), TableKind::Hash);
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path("/tmp/words.bin"),
            PathBuf::from("/tmp/words.bin.info")
        );
        assert_eq!(sidecar_path("words"), PathBuf::from("words.info"));
    }

    #[test]
    fn test_info_from_meta() {
        let hash = HashTableMeta {
            gs: SectionMeta {
                offset: 0,
                length: 12,
            },
            vs: SectionMeta {
                offset: 12,
                length: 12,
            },
            keys: StringSectionMeta {
                bytes: SectionMeta {
                    offset: 24,
                    length: 9,
                },
                offsets: SectionMeta {
                    offset: 33,
                    length: 12,
                },
            },
            values: StringSectionMeta {
                bytes: SectionMeta {
                    offset: 45,
                    length: 5,
                },
                offsets: SectionMeta {
                    offset: 50,
                    length: 12,
                },
            },
        };
        let mut meta = FileMeta::new();
        meta.insert("h".to_string(), TableMeta::Hash(hash));
        meta.insert(
            "i".to_string(),
            TableMeta::Inline(InlineTableMeta::default()),
        );

        let info = StringTableInfo::new(&meta, 62);
        assert_eq!(info.file_length, 62);
        assert_eq!(
            info.tables["h"],
            TableInfo {
                kind: TableKind::Hash,
                entry_count: 3,
                binary_length: 62,
            }
        );
        assert_eq!(info.tables["i"].kind, TableKind::Inline);
        assert!(serde_json::to_value(&meta["i"]).unwrap()["inline"]
            .get("raw")
            .is_none());
        assert_eq!(info.tables["i"].entry_count, 0);
        assert_eq!(info.tables["i"].binary_length, 0);
    }

    #[test]
    fn test_inline_without_raw() {
        let text = r#"{"t": {"inline": {"dct": {"a": "b"}}}}"#;
        let meta: FileMeta = serde_json::from_str(text).unwrap();
        assert_eq!(meta["t"].entry_count(), 1);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let text = r#"{"t": {"btree": {}}}"#;
        serde_json::from_str::<FileMeta>(text).unwrap_err();
    }
}
