//! Section codec.
//!
//! Two kinds of sections make up a hash table:
//!
//! ```text
//! array:   [elem: 4B little-endian] x count
//! strings: bytes   = s0 0x00 s1 0x00 ...   (each distinct string once)
//!          offsets = [u32 little-endian] x item count, relative to `bytes`
//! ```
//!
//! Readers are views over the mapped file; every access is bounds checked
//! and reports [`Error::OutOfBounds`] instead of reading past a section.

use std::collections::HashMap;
use std::marker::PhantomData;

use foldhash::fast::FixedState;

use crate::perfect_hash::IndexArray;
use crate::{Error, Result, SectionMeta, SectionSink, StringSectionMeta, StringTableWriter};

/// Fixed-width little-endian integer stored in array sections.
pub trait Element: Copy {
    /// Stride in bytes.
    const SIZE: usize;

    /// Decodes from exactly `SIZE` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    fn append_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }

                fn append_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_element!(i32, u32);

/// Appends `values` as a packed array section.
pub fn write_array<T, W>(sink: &mut SectionSink<'_, W>, values: &[T]) -> Result<SectionMeta>
where
    T: Element,
    W: StringTableWriter,
{
    let offset = sink.position();
    let mut buf = Vec::with_capacity(values.len() * T::SIZE);
    for &value in values {
        value.append_le(&mut buf);
    }
    sink.write_all(&buf)?;
    Ok(SectionMeta {
        offset,
        length: buf.len() as u64,
    })
}

/// Appends a deduplicated string section: the blob first, then one offset
/// per input item in input order.
///
/// Identical strings share a single null-terminated copy in the blob.
///
/// # Errors
///
/// [`Error::InvalidStringContent`] if a string contains a NUL byte.
pub fn write_strings<W, S>(
    sink: &mut SectionSink<'_, W>,
    strings: impl IntoIterator<Item = S>,
) -> Result<StringSectionMeta>
where
    W: StringTableWriter,
    S: AsRef<[u8]>,
{
    let bytes_offset = sink.position();
    let mut seen: HashMap<Vec<u8>, u32, FixedState> =
        HashMap::with_hasher(FixedState::with_seed(0));
    let mut offsets = Vec::new();
    let mut length: u64 = 0;

    for s in strings {
        let s = s.as_ref();
        if let Some(&offset) = seen.get(s) {
            offsets.push(offset);
            continue;
        }
        if s.contains(&0) {
            return Err(Error::InvalidStringContent(format!(
                "embedded NUL in {:?}",
                String::from_utf8_lossy(s)
            )));
        }
        let offset = u32::try_from(length).map_err(|_| {
            Error::OutOfBounds(format!("string blob exceeds {} bytes", u32::MAX))
        })?;
        seen.insert(s.to_vec(), offset);
        offsets.push(offset);
        sink.write_all(s)?;
        sink.write_all(&[0])?;
        length += s.len() as u64 + 1;
    }

    let bytes = SectionMeta {
        offset: bytes_offset,
        length,
    };
    let offsets = write_array(sink, &offsets)?;
    Ok(StringSectionMeta { offsets, bytes })
}

/// Returns the bytes of `section` within `base`.
pub fn section_bytes(base: &[u8], section: SectionMeta) -> Result<&[u8]> {
    let range = section.offset.checked_add(section.length).and_then(|end| {
        Some(usize::try_from(section.offset).ok()?..usize::try_from(end).ok()?)
    });
    range.and_then(|range| base.get(range)).ok_or_else(|| {
        Error::OutOfBounds(format!(
            "section {}..{} outside {} mapped bytes",
            section.offset,
            section.end(),
            base.len()
        ))
    })
}

/// Typed view over an array section.
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a, T> {
    data: &'a [u8],
    phantom: PhantomData<T>,
}

impl<'a, T: Element> ArrayView<'a, T> {
    pub fn new(base: &'a [u8], section: SectionMeta) -> Result<Self> {
        let data = section_bytes(base, section)?;
        if data.len() % T::SIZE != 0 {
            return Err(Error::OutOfBounds(format!(
                "section length {} is not a multiple of {}",
                data.len(),
                T::SIZE
            )));
        }
        Ok(Self {
            data,
            phantom: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len() / T::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<T> {
        index
            .checked_mul(T::SIZE)
            .and_then(|start| self.data.get(start..start.checked_add(T::SIZE)?))
            .map(T::from_le_slice)
            .ok_or_else(|| Error::OutOfBounds(format!("index {} >= length {}", index, self.len())))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a
    where
        T: 'a,
    {
        self.data.chunks_exact(T::SIZE).map(T::from_le_slice)
    }
}

impl IndexArray for ArrayView<'_, i32> {
    fn len(&self) -> usize {
        ArrayView::len(self)
    }

    fn at(&self, index: usize) -> Result<i32> {
        self.get(index)
    }
}

/// View over a string section; item `i` is the null-terminated run starting
/// at `offsets[i]`.
#[derive(Debug, Clone, Copy)]
pub struct StringView<'a> {
    offsets: ArrayView<'a, u32>,
    bytes: &'a [u8],
}

impl<'a> StringView<'a> {
    pub fn new(base: &'a [u8], section: StringSectionMeta) -> Result<Self> {
        Ok(Self {
            offsets: ArrayView::new(base, section.offsets)?,
            bytes: section_bytes(base, section.bytes)?,
        })
    }

    /// Number of items, counting duplicates.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Returns item `index` without its terminator.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        let offset = self.offsets.get(index)? as usize;
        let tail = self.bytes.get(offset..).ok_or_else(|| {
            Error::OutOfBounds(format!(
                "string offset {} >= blob length {}",
                offset,
                self.bytes.len()
            ))
        })?;
        let end = tail.iter().position(|&b| b == 0).ok_or_else(|| {
            Error::OutOfBounds(format!("unterminated string at offset {}", offset))
        })?;
        Ok(&tail[..end])
    }
}
