use std::cell::Cell;

/// Default cap on the displacement search for a single bucket.
pub const DEFAULT_MAX_HASH_ITERATIONS: u32 = 1 << 20;

/// Default cap on the JSON size of a table stored inline in the sidecar.
pub const DEFAULT_MAX_INLINE_BYTES: usize = 1 << 20;

/// Tunables consulted while writing tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest displacement tried before giving up on perfect hashing.
    pub max_hash_iterations: u32,
    /// Inline fallbacks whose encoded size reaches this many bytes are rejected.
    pub max_inline_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_hash_iterations: DEFAULT_MAX_HASH_ITERATIONS,
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
        }
    }
}

thread_local! {
    static OVERRIDE: Cell<Option<Limits>> = const { Cell::new(None) };
}

impl Limits {
    /// Returns the limits in effect on this thread.
    ///
    /// These are the defaults unless a [`with_limits`] scope is active.
    pub fn current() -> Self {
        OVERRIDE.with(|o| o.get()).unwrap_or_default()
    }
}

struct RestoreGuard(Option<Limits>);

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        OVERRIDE.with(|o| o.set(self.0));
    }
}

/// Runs `f` with `limits` installed as the current limits of this thread.
///
/// The previous value is restored when `f` returns or unwinds. Scopes nest.
///
/// ```
/// use strtable::config::{with_limits, Limits};
///
/// let small = Limits { max_hash_iterations: 4, ..Limits::default() };
/// with_limits(small, || assert_eq!(Limits::current().max_hash_iterations, 4));
/// assert_eq!(Limits::current(), Limits::default());
/// ```
pub fn with_limits<R>(limits: Limits, f: impl FnOnce() -> R) -> R {
    let previous = OVERRIDE.with(|o| o.replace(Some(limits)));
    let _guard = RestoreGuard(previous);
    f()
}
