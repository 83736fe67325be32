//! Minimal perfect hashing by bucket displacement.
//!
//! Keys are first spread over `n` buckets with `fnv_32(0, key)`. Buckets
//! holding several keys get a displacement `d > 0` such that `fnv_32(d, key)`
//! lands every key of the bucket in a distinct free slot; single-key buckets
//! are then placed directly into the remaining free slots and record the slot
//! as `-(slot + 1)`. The value array maps each slot back to the key's index.

use crate::hasher::fnv_32;
use crate::{Error, Result};

/// Read access to an array of signed 32-bit integers.
///
/// Lets lookups run both over freshly built vectors and over views of a
/// mapped file.
pub trait IndexArray {
    /// Number of elements.
    fn len(&self) -> usize;

    /// Returns element `index`, or an error when it is out of range.
    fn at(&self, index: usize) -> Result<i32>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexArray for [i32] {
    fn len(&self) -> usize {
        <[i32]>::len(self)
    }

    fn at(&self, index: usize) -> Result<i32> {
        self.get(index).copied().ok_or_else(|| {
            Error::OutOfBounds(format!("index {} >= length {}", index, <[i32]>::len(self)))
        })
    }
}

impl IndexArray for Vec<i32> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn at(&self, index: usize) -> Result<i32> {
        self.as_slice().at(index)
    }
}

/// Displacement (`gs`) and value (`vs`) arrays of a minimal perfect hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfectHash {
    /// Per-bucket displacement, or `-(slot + 1)` for directly placed keys.
    pub gs: Vec<i32>,
    /// Per-slot index of the key stored there.
    pub vs: Vec<i32>,
}

impl PerfectHash {
    /// Builds a perfect hash over `keys`, which must be distinct.
    ///
    /// `vs[slot]` holds the position in `keys` of the key assigned to `slot`.
    /// The displacement search for each bucket gives up once `d` exceeds
    /// `max_iterations`, so construction always terminates.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`] when `keys` is empty,
    /// [`Error::ConstructionFailed`] when the iteration budget is exhausted,
    /// and [`Error::ConstructionIntegrity`] if the verification pass fails.
    pub fn build<K: AsRef<[u8]>>(keys: &[K], max_iterations: u32) -> Result<Self> {
        let n = keys.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if i32::try_from(n).is_err() {
            return Err(Error::OutOfBounds(format!("{} keys exceed slot range", n)));
        }
        let size = n as u32;
        let max_iterations = max_iterations.min(i32::MAX as u32);

        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (index, key) in keys.iter().enumerate() {
            buckets[(fnv_32(0, key.as_ref()) % size) as usize].push(index);
        }

        // Largest buckets first; stable sort keeps ties in bucket order.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| buckets[b].len().cmp(&buckets[a].len()));

        let mut gs = vec![0i32; n];
        let mut vs = vec![0i32; n];
        let mut occupied = vec![false; n];
        let mut slots: Vec<usize> = Vec::new();

        let mut processed = 0;
        for &bucket_index in &order {
            let bucket = &buckets[bucket_index];
            if bucket.len() <= 1 {
                break;
            }

            let mut d: u32 = 1;
            'search: loop {
                if d > max_iterations {
                    return Err(Error::ConstructionFailed {
                        iterations: max_iterations,
                    });
                }
                slots.clear();
                for &item in bucket {
                    let slot = (fnv_32(d, keys[item].as_ref()) % size) as usize;
                    if occupied[slot] || slots.contains(&slot) {
                        d += 1;
                        continue 'search;
                    }
                    slots.push(slot);
                }
                break;
            }

            for (&item, &slot) in bucket.iter().zip(&slots) {
                occupied[slot] = true;
                vs[slot] = item as i32;
            }
            gs[bucket_index] = d as i32;
            processed += 1;
        }

        // Exactly one free slot remains per single-key bucket, taken in ascending order.
        let free = (0..n).filter(|&slot| !occupied[slot]);
        let singles = order[processed..]
            .iter()
            .take_while(|&&bucket_index| !buckets[bucket_index].is_empty());
        for (&bucket_index, slot) in singles.zip(free) {
            gs[bucket_index] = -(slot as i32) - 1;
            vs[slot] = buckets[bucket_index][0] as i32;
        }

        let hash = PerfectHash { gs, vs };
        hash.verify(keys)?;
        Ok(hash)
    }

    /// Checks that every key resolves to its own index.
    pub fn verify<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<()> {
        for (index, key) in keys.iter().enumerate() {
            let key = key.as_ref();
            if lookup(&self.gs, &self.vs, key)? != Some(index as i32) {
                return Err(Error::ConstructionIntegrity {
                    key: String::from_utf8_lossy(key).into_owned(),
                });
            }
        }
        Ok(())
    }

    /// Number of keys encoded.
    pub fn len(&self) -> usize {
        self.gs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gs.is_empty()
    }
}

/// Resolves `key` to the value stored in its slot.
///
/// Only keys from the construction set are guaranteed to resolve to their
/// own slot; callers must compare the stored key before trusting the value.
/// Returns `None` when the key's bucket is empty.
pub fn lookup<G, V>(gs: &G, vs: &V, key: &[u8]) -> Result<Option<i32>>
where
    G: IndexArray + ?Sized,
    V: IndexArray + ?Sized,
{
    let n = gs.len() as u32;
    if n == 0 {
        return Ok(None);
    }
    let d = gs.at((fnv_32(0, key) % n) as usize)?;
    let slot = match d {
        0 => return Ok(None),
        d if d < 0 => (-(d as i64) - 1) as usize,
        d => (fnv_32(d as u32, key) % n) as usize,
    };
    vs.at(slot).map(Some)
}
