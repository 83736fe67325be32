use std::fs::File;
use std::io::Result;
use std::path::Path;

use memmap2::Mmap;

/// Read-only memory mapping of a whole string table file.
///
/// Owns both the descriptor and the mapping; dropping the value unmaps the
/// bytes and closes the file, whichever way the owner goes out of scope.
/// The mapping is never written through, so any number of readers and
/// processes may map the same file concurrently.
#[derive(Debug)]
pub struct MappedFile {
    // Declared first so the mapping is released before the descriptor.
    mmap: Option<Mmap>,
    _file: File,
}

impl MappedFile {
    /// Opens `path` read-only and maps it fully into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        // Zero-length mappings are rejected by some platforms.
        let mmap = if length == 0 {
            None
        } else {
            // SAFETY: string table files are immutable once written.
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(Self { mmap, _file: file })
    }

    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AsRef<[u8]> for MappedFile {
    fn as_ref(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}
