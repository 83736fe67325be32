/// Multiplier of the 32-bit FNV hash.
///
/// Seed zero is replaced by this value, so `fnv_32(0, ..)` is a distinct
/// member of the family rather than a degenerate one.
pub const FNV_32_PRIME: u32 = 0x0100_0193;

/// Seeded 32-bit FNV hash; every seed yields a different hash function.
///
/// Lookups re-run this function against the stored displacement array, so
/// the exact bit pattern is part of the on-disk format.
#[inline]
pub fn fnv_32(seed: u32, bytes: &[u8]) -> u32 {
    let mut d = if seed == 0 { FNV_32_PRIME } else { seed };
    for &b in bytes {
        d = d.wrapping_mul(FNV_32_PRIME) ^ b as u32;
    }
    d
}
