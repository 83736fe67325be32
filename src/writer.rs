use std::io::{BufWriter, Result, Write};

/// Trait representing positional writers suitable for string table files.
///
/// Satisfied by `FileExt` handles on both Unix and Windows; tests implement it
/// over in-memory buffers.
pub trait StringTableWriter {
    /// Writes all of `data` at the given absolute `offset`.
    fn write_all_at(&self, data: &[u8], offset: u64) -> Result<()>;
}

#[cfg(unix)]
impl<T: std::os::unix::fs::FileExt> StringTableWriter for T {
    fn write_all_at(&self, data: &[u8], offset: u64) -> Result<()> {
        std::os::unix::fs::FileExt::write_all_at(self, data, offset)
    }
}

#[cfg(windows)]
impl<T: std::os::windows::fs::FileExt> StringTableWriter for T {
    fn write_all_at(&self, mut data: &[u8], mut offset: u64) -> Result<()> {
        while !data.is_empty() {
            let n = self.seek_write(data, offset)?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ));
            }
            data = &data[n..];
            offset += n as u64;
        }
        Ok(())
    }
}

/// Adapter implementing [`std::io::Write`] in terms of [`StringTableWriter`],
/// appending each write at consecutive offsets.
struct OffsetWriter<'a, W: StringTableWriter> {
    inner: &'a W,
    offset: u64,
}

impl<W: StringTableWriter> Write for OffsetWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.inner.write_all_at(buf, self.offset)?;
        self.offset += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Buffered append-only sink that knows its absolute write position.
///
/// Sections are laid out back to back; [`position`](Self::position) gives the
/// offset the next byte will land at, which is what section descriptors record.
pub struct SectionSink<'a, W: StringTableWriter> {
    buf: BufWriter<OffsetWriter<'a, W>>,
}

impl<'a, W: StringTableWriter> SectionSink<'a, W> {
    /// Creates a sink writing to `writer` from offset zero.
    pub fn new(writer: &'a W, buffer_size: usize) -> Self {
        Self {
            buf: BufWriter::with_capacity(
                buffer_size,
                OffsetWriter {
                    inner: writer,
                    offset: 0,
                },
            ),
        }
    }

    /// Absolute offset of the next byte written.
    pub fn position(&self) -> u64 {
        self.buf.get_ref().offset + self.buf.buffer().len() as u64
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.buf.write_all(data)
    }

    /// Flushes buffered bytes and returns the total length written.
    pub fn finish(mut self) -> Result<u64> {
        self.buf.flush()?;
        Ok(self.position())
    }
}

/// In-memory positional writer for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryWriter {
    data: std::cell::RefCell<Vec<u8>>,
}

#[cfg(test)]
impl MemoryWriter {
    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

#[cfg(test)]
impl StringTableWriter for MemoryWriter {
    fn write_all_at(&self, data: &[u8], offset: u64) -> Result<()> {
        let mut buf = self.data.borrow_mut();
        let end = offset as usize + data.len();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[offset as usize..end].copy_from_slice(data);
        Ok(())
    }
}
