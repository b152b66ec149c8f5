//! Per-block bloom filters over doc ids, stored as plain `u32` words inside
//! the block record.

const SEED_1: u32 = 0x9747_b28c;
const SEED_2: u32 = 0x85eb_ca6b;

#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[inline]
fn probes(filter_words: usize, nb_hash: u32, value: u32) -> impl Iterator<Item = usize> {
    let bits = (filter_words * 32) as u64;
    let h1 = fmix32(value ^ SEED_1) as u64;
    // odd, so successive probes never collapse onto one bit
    let h2 = (fmix32(value.wrapping_add(SEED_2)) | 1) as u64;
    (0..nb_hash as u64).map(move |i| ((h1 + i * h2) % bits) as usize)
}

/// Filter words needed for `num_elements` values.
pub fn compute_length(num_elements: usize, bits_per_element: u32) -> usize {
    (num_elements * bits_per_element as usize).div_ceil(32).max(1)
}

pub fn insert(filter: &mut [u32], nb_hash: u32, value: u32) {
    for bit in probes(filter.len(), nb_hash, value) {
        filter[bit / 32] |= 1 << (bit % 32);
    }
}

pub fn contains(filter: &[u32], nb_hash: u32, value: u32) -> bool {
    probes(filter.len(), nb_hash, value).all(|bit| filter[bit / 32] & (1 << (bit % 32)) != 0)
}
