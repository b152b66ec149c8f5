use std::ops::{BitAndAssign, BitOrAssign, BitXorAssign};

/// Excludes documents from retrieval: a doc id for which `test` returns true
/// is never part of a result.
pub trait DocFilter {
    fn test(&self, docid: u32) -> bool;
}

impl<F: Fn(u32) -> bool> DocFilter for F {
    fn test(&self, docid: u32) -> bool {
        self(docid)
    }
}

/// Fixed-size bit set over doc ids. Bits past `len` read as unset and ignore
/// writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
}

impl BitVector {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn set(&mut self, bit: usize) {
        if bit < self.len {
            self.words[bit / 64] |= 1 << (bit % 64);
        }
    }

    pub fn clear(&mut self, bit: usize) {
        if bit < self.len {
            self.words[bit / 64] &= !(1 << (bit % 64));
        }
    }

    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    pub fn set_all(&mut self) {
        self.words.fill(u64::MAX);
    }

    pub fn get(&self, bit: usize) -> bool {
        bit < self.len && self.words[bit / 64] & (1 << (bit % 64)) != 0
    }

    pub fn toggle(&mut self) {
        for word in &mut self.words {
            *word = !*word;
        }
    }

    /// Number of set bits below `len`.
    pub fn count_ones(&self) -> usize {
        (0..self.len).filter(|&bit| self.get(bit)).count()
    }
}

impl DocFilter for BitVector {
    fn test(&self, docid: u32) -> bool {
        self.get(docid as usize)
    }
}

impl BitAndAssign<&BitVector> for BitVector {
    fn bitand_assign(&mut self, rhs: &BitVector) {
        for (a, b) in self.words.iter_mut().zip(&rhs.words) {
            *a &= b;
        }
    }
}

impl BitOrAssign<&BitVector> for BitVector {
    fn bitor_assign(&mut self, rhs: &BitVector) {
        for (a, b) in self.words.iter_mut().zip(&rhs.words) {
            *a |= b;
        }
    }
}

impl BitXorAssign<&BitVector> for BitVector {
    fn bitxor_assign(&mut self, rhs: &BitVector) {
        for (a, b) in self.words.iter_mut().zip(&rhs.words) {
            *a ^= b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_vector() {
        let mut bits = BitVector::new(100);
        bits.set(3);
        bits.set(64);
        bits.set(100);
        assert!(bits.test(3) && bits.test(64));
        assert!(!bits.test(4) && !bits.test(100));
        bits.clear(3);
        assert!(!bits.test(3));
        assert_eq!(bits.count_ones(), 1);

        bits.toggle();
        assert_eq!(bits.count_ones(), 99);
        bits.set_all();
        assert_eq!(bits.count_ones(), 100);
        bits.clear_all();
        assert_eq!(bits.count_ones(), 0);
    }

    #[test]
    fn test_bit_ops() {
        let mut a = BitVector::new(10);
        let mut b = BitVector::new(10);
        a.set(1);
        a.set(2);
        b.set(2);
        b.set(3);
        let mut and = a.clone();
        and &= &b;
        assert_eq!(and.count_ones(), 1);
        let mut or = a.clone();
        or |= &b;
        assert_eq!(or.count_ones(), 3);
        a ^= &b;
        assert!(a.test(1) && !a.test(2) && a.test(3));
    }

    #[test]
    fn test_closure_filter() {
        let even = |docid: u32| docid % 2 == 0;
        let filter: &dyn DocFilter = &even;
        assert!(filter.test(4));
        assert!(!filter.test(5));
    }
}
