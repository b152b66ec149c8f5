use super::block_encode::Block;
use crate::{
    pointer::Pointer,
    segment::{BlockReader, COMPRESSION_BLOCK_SIZE},
};

/// Position inside one term's chain: the decoded current block plus an index
/// into it. An undefined pointer means the chain is exhausted.
pub struct BlockCursor {
    pointer: Pointer,
    docids: Block,
    tfs: Block,
    count: usize,
    index: usize,
    with_tf: bool,
}

impl BlockCursor {
    pub fn new(reader: &mut BlockReader, head: Pointer, with_tf: bool) -> Self {
        let mut cursor = Self {
            pointer: head,
            docids: [0; COMPRESSION_BLOCK_SIZE],
            tfs: [0; COMPRESSION_BLOCK_SIZE],
            count: 0,
            index: 0,
            with_tf,
        };
        cursor.load(reader);
        cursor
    }

    fn load(&mut self, reader: &mut BlockReader) {
        self.index = 0;
        self.count = 0;
        if self.pointer.is_defined() {
            self.count = reader.decode_docids(self.pointer, &mut self.docids);
            if self.with_tf {
                reader.decode_tfs(self.pointer, &mut self.tfs);
            }
            assert!(self.count > 0, "empty block in postings chain");
        }
    }

    pub fn is_exhausted(&self) -> bool {
        !self.pointer.is_defined()
    }

    pub fn doc(&self) -> u32 {
        debug_assert!(!self.is_exhausted());
        self.docids[self.index]
    }

    /// Term frequency (or stored attribute score) of the current document.
    pub fn tf(&self) -> u32 {
        debug_assert!(self.with_tf);
        self.tfs[self.index]
    }

    pub fn advance(&mut self, reader: &mut BlockReader) {
        debug_assert!(!self.is_exhausted());
        self.index += 1;
        if self.index == self.count {
            self.pointer = reader.next_pointer(self.pointer);
            self.load(reader);
        }
    }

    /// Moves to the first document not before `target`, skipping whole blocks
    /// through their boundaries, then probing exponentially and finishing
    /// with a binary search inside the block.
    pub fn gallop_to(&mut self, reader: &mut BlockReader, target: u32) {
        if self.is_exhausted() {
            return;
        }
        let order = reader.order();
        if !order.less(self.doc(), target) {
            return;
        }
        if order.less(self.docids[self.count - 1], target) {
            self.pointer = reader.next_pointer_to(reader.next_pointer(self.pointer), target);
            self.load(reader);
            if self.is_exhausted() || !order.less(self.doc(), target) {
                return;
            }
        }

        let docs = &self.docids[..self.count];
        let mut lo = self.index;
        let mut hop = 1;
        let mut hi = lo + hop;
        while hi < self.count && order.less(docs[hi], target) {
            lo = hi;
            hop *= 2;
            hi = lo + hop;
        }
        let hi = hi.min(self.count - 1);
        self.index = lo + docs[lo..=hi].partition_point(|&d| order.less(d, target));
    }
}
