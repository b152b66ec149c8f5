mod pool;
mod reader;
mod writer;

pub use pool::SegmentPool;
pub use reader::BlockReader;
pub use writer::BlockWriter;

use crate::{options::DocOrder, pointer::Pointer};

pub const COMPRESSION_BLOCK_SIZE: usize =
    <bitpacking::BitPacker4x as bitpacking::BitPacker>::BLOCK_LEN;

pub const NO_NEXT_SEGMENT: u32 = u32::MAX;

// block record header, in words
const LEN: usize = 0;
const NEXT_SEGMENT: usize = 1;
const NEXT_OFFSET: usize = 2;
const BOUNDARY: usize = 3;
const FLAGS: usize = 4;
const BLOOM_OFFSET: usize = 5;
const DOC_COUNT: usize = 6;
const DOCID_LEN: usize = 7;
pub const HEADER_LEN: usize = 8;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u32 {
        const TF = 1 << 0;
        const POSITIONS = 1 << 1;
        const BLOOM = 1 << 2;
    }
}

/// Read-only view of one block record.
///
/// Every section is located from the header alone: the doc id words follow the
/// header, then the optional tf, position and bloom sections in that order.
#[derive(Clone, Copy)]
pub struct BlockRecord<'a> {
    words: &'a [u32],
}

impl<'a> BlockRecord<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        let len = words[LEN] as usize;
        assert!(
            len >= HEADER_LEN && len <= words.len(),
            "corrupt block record length {}",
            len
        );
        let record = Self {
            words: &words[..len],
        };
        assert!(
            record.doc_count() <= COMPRESSION_BLOCK_SIZE,
            "block holds {} documents",
            record.doc_count()
        );
        record
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn next(&self) -> Pointer {
        match self.words[NEXT_SEGMENT] {
            NO_NEXT_SEGMENT => Pointer::UNDEFINED,
            segment => Pointer::new(segment, self.words[NEXT_OFFSET]),
        }
    }

    pub fn boundary(&self) -> u32 {
        self.words[BOUNDARY]
    }

    pub fn flags(&self) -> BlockFlags {
        BlockFlags::from_bits_retain(self.words[FLAGS])
    }

    pub fn doc_count(&self) -> usize {
        self.words[DOC_COUNT] as usize
    }

    pub fn docids(&self) -> &'a [u32] {
        let len = self.words[DOCID_LEN] as usize;
        &self.words[HEADER_LEN..HEADER_LEN + len]
    }

    fn tf_start(&self) -> usize {
        HEADER_LEN + self.words[DOCID_LEN] as usize
    }

    pub fn tfs(&self) -> Option<&'a [u32]> {
        if !self.flags().contains(BlockFlags::TF) {
            return None;
        }
        let start = self.tf_start();
        let len = self.words[start] as usize;
        Some(&self.words[start + 1..start + 1 + len])
    }

    fn positions_start(&self) -> usize {
        match self.tfs() {
            Some(tfs) => self.tf_start() + 1 + tfs.len(),
            None => self.tf_start(),
        }
    }

    /// Total number of positions in the block.
    pub fn position_count(&self) -> Option<usize> {
        if !self.flags().contains(BlockFlags::POSITIONS) {
            return None;
        }
        Some(self.words[self.positions_start()] as usize)
    }

    /// Compressed position sub-blocks, each covering up to
    /// `COMPRESSION_BLOCK_SIZE` positions.
    pub fn position_blocks(&self) -> impl Iterator<Item = &'a [u32]> {
        let (mut cursor, count) = if self.flags().contains(BlockFlags::POSITIONS) {
            let start = self.positions_start();
            (start + 2, self.words[start + 1] as usize)
        } else {
            (0, 0)
        };
        let words = self.words;
        (0..count).map(move |_| {
            let len = words[cursor] as usize;
            let block = &words[cursor + 1..cursor + 1 + len];
            cursor += 1 + len;
            block
        })
    }

    pub fn bloom(&self) -> Option<&'a [u32]> {
        if !self.flags().contains(BlockFlags::BLOOM) {
            return None;
        }
        let start = self.words[BLOOM_OFFSET] as usize;
        let len = self.words[start] as usize;
        Some(&self.words[start + 1..start + 1 + len])
    }
}

/// Turns doc ids listed in traversal order into the stored gaps.
///
/// Forward blocks keep the first id absolute and store gaps to the previous
/// id. Reverse blocks store gaps to the next id and keep the last one
/// absolute.
pub fn encode_docid_gaps(order: DocOrder, docids: &[u32], output: &mut Vec<u32>) {
    output.clear();
    match order {
        DocOrder::Forward => {
            let mut last = 0;
            for &docid in docids {
                output.push(docid - last);
                last = docid;
            }
        }
        DocOrder::Reverse => {
            output.extend(docids.windows(2).map(|w| w[0] - w[1]));
            output.extend(docids.last());
        }
    }
}

/// Inverse of [`encode_docid_gaps`], in place.
pub fn decode_docid_gaps(order: DocOrder, values: &mut [u32]) {
    match order {
        DocOrder::Forward => {
            for i in 1..values.len() {
                values[i] += values[i - 1];
            }
        }
        DocOrder::Reverse => {
            for i in (0..values.len().saturating_sub(1)).rev() {
                values[i] += values[i + 1];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docid_gaps() {
        let mut gaps = Vec::new();
        encode_docid_gaps(DocOrder::Forward, &[3, 4, 10], &mut gaps);
        assert_eq!(gaps, [3, 1, 6]);
        decode_docid_gaps(DocOrder::Forward, &mut gaps);
        assert_eq!(gaps, [3, 4, 10]);

        encode_docid_gaps(DocOrder::Reverse, &[10, 4, 3], &mut gaps);
        assert_eq!(gaps, [6, 1, 3]);
        decode_docid_gaps(DocOrder::Reverse, &mut gaps);
        assert_eq!(gaps, [10, 4, 3]);

        encode_docid_gaps(DocOrder::Reverse, &[], &mut gaps);
        assert!(gaps.is_empty());
        decode_docid_gaps(DocOrder::Reverse, &mut gaps);
    }
}
