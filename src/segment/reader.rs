use super::{decode_docid_gaps, BlockRecord, SegmentPool, COMPRESSION_BLOCK_SIZE};
use crate::{
    algorithm::{
        bloom,
        block_encode::{Block, BlockDecode, BlockDecodeTrait},
    },
    options::DocOrder,
    pointer::Pointer,
};

/// Decoding front end over a pool. Each reader owns its codec scratch, so
/// readers on different threads share nothing mutable.
///
/// A reader may also see a query's short-list pool. Pointers tagged with
/// `SHORT_LIST_SEGMENT` resolve there; every chain in it is a single block.
pub struct BlockReader<'a> {
    pool: &'a SegmentPool,
    short_lists: Option<&'a SegmentPool>,
    decoder: BlockDecode,
    nb_hash: u32,
    scratch: Block,
    positions: Vec<u32>,
    cache: Vec<DecodedBlock>,
    evict: usize,
}

/// Blocks decoded by `contains_docid`, one slot per chain being probed.
const CACHED_BLOCKS: usize = 16;

struct DecodedBlock {
    pointer: Pointer,
    docids: Block,
    count: usize,
}

impl<'a> BlockReader<'a> {
    pub fn new(pool: &'a SegmentPool, nb_hash: u32) -> Self {
        Self {
            pool,
            short_lists: None,
            decoder: BlockDecode::new(pool.encode()),
            nb_hash,
            scratch: [0; COMPRESSION_BLOCK_SIZE],
            positions: Vec::new(),
            cache: Vec::new(),
            evict: 0,
        }
    }

    pub fn with_short_lists(mut self, short_lists: &'a SegmentPool) -> Self {
        debug_assert_eq!(short_lists.order(), self.pool.order());
        self.short_lists = Some(short_lists);
        self
    }

    pub fn order(&self) -> DocOrder {
        self.pool.order()
    }

    fn resolve(&self, pointer: Pointer) -> (&'a SegmentPool, Pointer) {
        match self.short_lists {
            Some(short_lists) if pointer.is_short_list() => {
                (short_lists, pointer.from_short_list())
            }
            _ => (self.pool, pointer),
        }
    }

    fn record(&self, pointer: Pointer) -> BlockRecord<'a> {
        let (pool, pointer) = self.resolve(pointer);
        pool.record(pointer)
    }

    pub fn boundary(&self, pointer: Pointer) -> u32 {
        self.record(pointer).boundary()
    }

    pub fn next_pointer(&self, pointer: Pointer) -> Pointer {
        if pointer.is_short_list() {
            let (pool, local) = self.resolve(pointer);
            return pool.next_pointer(local).to_short_list();
        }
        self.pool.next_pointer(pointer)
    }

    /// First block from `pointer` on whose boundary is not before `target`,
    /// or `UNDEFINED` when the chain ends first.
    pub fn next_pointer_to(&self, pointer: Pointer, target: u32) -> Pointer {
        if pointer.is_short_list() {
            let (pool, local) = self.resolve(pointer);
            return pool.next_pointer_to(local, target).to_short_list();
        }
        self.pool.next_pointer_to(pointer, target)
    }

    /// Fills `output` with the block's doc ids in traversal order and returns
    /// the document count.
    pub fn decode_docids(&mut self, pointer: Pointer, output: &mut Block) -> usize {
        let record = self.record(pointer);
        self.decoder.decode(record.docids(), output);
        let count = record.doc_count();
        decode_docid_gaps(self.order(), &mut output[..count]);
        count
    }

    /// Fills `output` with the per-document payload (term frequencies or
    /// attribute scores). Returns 0 when the block carries none.
    pub fn decode_tfs(&mut self, pointer: Pointer, output: &mut Block) -> usize {
        let record = self.record(pointer);
        match record.tfs() {
            Some(words) => {
                self.decoder.decode(words, output);
                record.doc_count()
            }
            None => 0,
        }
    }

    /// Fills `output` with every position gap of the block and returns their
    /// count. Returns 0 when the block carries no positions.
    pub fn decode_positions(&mut self, pointer: Pointer, output: &mut Vec<u32>) -> usize {
        output.clear();
        let record = self.record(pointer);
        let Some(count) = record.position_count() else {
            return 0;
        };
        for words in record.position_blocks() {
            self.decoder.decode(words, &mut self.scratch);
            let take = (count - output.len()).min(COMPRESSION_BLOCK_SIZE);
            output.extend_from_slice(&self.scratch[..take]);
        }
        assert_eq!(output.len(), count, "corrupt position section");
        count
    }

    /// Absolute positions of the `index`-th document of the block.
    pub fn positions_for(&mut self, pointer: Pointer, index: usize, output: &mut Vec<u32>) -> usize {
        output.clear();
        let mut tfs = [0; COMPRESSION_BLOCK_SIZE];
        let count = self.decode_tfs(pointer, &mut tfs);
        if index >= count {
            return 0;
        }
        let mut positions = std::mem::take(&mut self.positions);
        if self.decode_positions(pointer, &mut positions) > 0 {
            let start = tfs[..index].iter().map(|&tf| tf as usize).sum::<usize>();
            let end = start + tfs[index] as usize;
            let mut position = 0;
            output.extend(positions[start..end].iter().map(|&gap| {
                position += gap;
                position
            }));
        }
        self.positions = positions;
        output.len()
    }

    /// Whether the chain starting at `pointer` holds `docid`.
    ///
    /// `pointer` is moved to the block that would hold `docid`, so successive
    /// calls with ids in traversal order walk the chain once. The bloom filter
    /// rejects most misses; its positives are confirmed against the decoded
    /// block, kept in a small per-reader cache.
    pub fn contains_docid(&mut self, docid: u32, pointer: &mut Pointer) -> bool {
        *pointer = self.next_pointer_to(*pointer, docid);
        if !pointer.is_defined() {
            return false;
        }
        if let Some(filter) = self.record(*pointer).bloom() {
            if !bloom::contains(filter, self.nb_hash, docid) {
                return false;
            }
        }
        let slot = self.decoded_slot(*pointer);
        let block = &self.cache[slot];
        let order = self.order();
        block.docids[..block.count]
            .binary_search_by(|&d| order.cmp(d, docid))
            .is_ok()
    }

    /// Index of the cache slot holding the decoded doc ids of `pointer`.
    /// Once every slot is taken, misses evict round robin.
    fn decoded_slot(&mut self, pointer: Pointer) -> usize {
        if let Some(slot) = self.cache.iter().position(|block| block.pointer == pointer) {
            return slot;
        }
        let mut docids = [0; COMPRESSION_BLOCK_SIZE];
        let count = self.decode_docids(pointer, &mut docids);
        let block = DecodedBlock {
            pointer,
            docids,
            count,
        };
        if self.cache.len() < CACHED_BLOCKS {
            self.cache.push(block);
            return self.cache.len() - 1;
        }
        let slot = self.evict;
        self.evict = (self.evict + 1) % CACHED_BLOCKS;
        self.cache[slot] = block;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        options::{BloomOption, DocOrder, EncodeOption},
        segment::BlockWriter,
    };

    fn build_chain(order: DocOrder, blocks: &[&[u32]]) -> (SegmentPool, Pointer) {
        let mut pool = SegmentPool::new(4096, 4, order, EncodeOption::OptPfor);
        let mut writer = BlockWriter::new(EncodeOption::OptPfor, order, BloomOption::default());
        let mut head = Pointer::UNDEFINED;
        let mut tail = Pointer::UNDEFINED;
        for docids in blocks {
            let record = writer.build(docids, None, None);
            let boundary = *docids.last().unwrap();
            match order {
                DocOrder::Forward => {
                    tail = pool
                        .append_block(record, boundary, tail, Pointer::UNDEFINED)
                        .unwrap();
                    if !head.is_defined() {
                        head = tail;
                    }
                }
                DocOrder::Reverse => {
                    head = pool
                        .append_block(record, boundary, Pointer::UNDEFINED, head)
                        .unwrap();
                }
            }
        }
        (pool, head)
    }

    #[test]
    fn test_contains_docid_forward() {
        let (pool, head) = build_chain(DocOrder::Forward, &[&[1, 5, 9], &[12, 40, 41]]);
        let mut reader = BlockReader::new(&pool, BloomOption::default().nb_hash);
        let mut cursor = head;
        assert!(reader.contains_docid(5, &mut cursor));
        assert_eq!(cursor, head);
        assert!(!reader.contains_docid(10, &mut cursor));
        assert!(reader.contains_docid(41, &mut cursor));
        assert_ne!(cursor, head);
        assert!(!reader.contains_docid(42, &mut cursor));
        assert!(!cursor.is_defined());
    }

    #[test]
    fn test_contains_docid_reverse() {
        // newest block first: appended [9, 5, 1] then [41, 40, 12]
        let (pool, head) = build_chain(DocOrder::Reverse, &[&[9, 5, 1], &[41, 40, 12]]);
        let mut reader = BlockReader::new(&pool, BloomOption::default().nb_hash);
        let mut output = [0; COMPRESSION_BLOCK_SIZE];
        assert_eq!(reader.decode_docids(head, &mut output), 3);
        assert_eq!(&output[..3], &[41, 40, 12]);
        let mut cursor = head;
        assert!(reader.contains_docid(40, &mut cursor));
        assert!(reader.contains_docid(5, &mut cursor));
        assert!(!reader.contains_docid(0, &mut cursor));
    }

    #[test]
    fn test_contains_docid_reuses_decoded_block() {
        let first: Vec<u32> = (0..128).map(|i| i * 2).collect();
        let second: Vec<u32> = (0..128).map(|i| 1000 + i * 2).collect();
        let (pool, head) = build_chain(DocOrder::Forward, &[&first, &second]);
        let mut reader = BlockReader::new(&pool, BloomOption::default().nb_hash);
        let mut cursor = head;
        for docid in 0..255 {
            assert_eq!(reader.contains_docid(docid, &mut cursor), docid % 2 == 0, "{}", docid);
        }
        assert_eq!(reader.cache.len(), 1);
        assert_eq!(reader.cache[0].pointer, head);

        assert!(reader.contains_docid(1000, &mut cursor));
        assert_ne!(cursor, head);
        assert!(!reader.contains_docid(1001, &mut cursor));
        assert!(reader.contains_docid(1254, &mut cursor));
        assert_eq!(reader.cache.len(), 2);

        // a second walk over the same chain decodes nothing new
        let mut cursor = head;
        assert!(reader.contains_docid(254, &mut cursor));
        assert!(!reader.contains_docid(253, &mut cursor));
        assert!(reader.contains_docid(1002, &mut cursor));
        assert_eq!(reader.cache.len(), 2);
    }

    #[test]
    fn test_contains_docid_cache_eviction() {
        let blocks: Vec<Vec<u32>> = (0..CACHED_BLOCKS as u32 + 4)
            .map(|b| (0..4).map(|i| b * 100 + i * 3).collect())
            .collect();
        let blocks: Vec<&[u32]> = blocks.iter().map(Vec::as_slice).collect();
        let (pool, head) = build_chain(DocOrder::Forward, &blocks);
        let mut reader = BlockReader::new(&pool, BloomOption::default().nb_hash);
        for _ in 0..2 {
            let mut cursor = head;
            for b in 0..blocks.len() as u32 {
                assert!(reader.contains_docid(b * 100 + 6, &mut cursor));
                assert!(!reader.contains_docid(b * 100 + 7, &mut cursor));
            }
        }
        assert_eq!(reader.cache.len(), CACHED_BLOCKS);
    }

    #[test]
    fn test_short_list_pointers_resolve_to_their_pool() {
        let (pool, head) = build_chain(DocOrder::Forward, &[&[1, 5, 9], &[12, 40, 41]]);
        let (short_lists, short_head) = build_chain(DocOrder::Forward, &[&[2, 5, 30]]);
        let short_head = short_head.to_short_list();
        let mut reader = BlockReader::new(&pool, BloomOption::default().nb_hash)
            .with_short_lists(&short_lists);

        let mut output = [0; COMPRESSION_BLOCK_SIZE];
        assert_eq!(reader.decode_docids(short_head, &mut output), 3);
        assert_eq!(&output[..3], &[2, 5, 30]);
        assert_eq!(reader.boundary(short_head), 30);
        assert!(!reader.next_pointer(short_head).is_defined());
        assert_eq!(reader.next_pointer_to(short_head, 30), short_head);
        assert!(!reader.next_pointer_to(short_head, 31).is_defined());

        // both chains start at segment 0, offset 0 of their own pool
        let mut short = short_head;
        let mut long = head;
        assert!(reader.contains_docid(5, &mut short));
        assert!(reader.contains_docid(5, &mut long));
        assert!(!reader.contains_docid(9, &mut short));
        assert!(reader.contains_docid(9, &mut long));
        assert!(reader.contains_docid(30, &mut short));
        assert!(!reader.contains_docid(30, &mut long));
        assert!(!reader.contains_docid(41, &mut short));
        assert!(!short.is_defined());
    }

    #[test]
    fn test_positions_for() {
        let mut pool = SegmentPool::new(4096, 1, DocOrder::Forward, EncodeOption::Bitpack);
        let mut writer =
            BlockWriter::new(EncodeOption::Bitpack, DocOrder::Forward, BloomOption::disabled());
        let record = writer.build(&[3, 8], Some(&[2, 3]), Some(&[1, 4, 2, 1, 7]));
        let p = pool
            .append_block(record, 8, Pointer::UNDEFINED, Pointer::UNDEFINED)
            .unwrap();
        let mut reader = BlockReader::new(&pool, 0);
        let mut positions = Vec::new();
        assert_eq!(reader.positions_for(p, 0, &mut positions), 2);
        assert_eq!(positions, [1, 5]);
        assert_eq!(reader.positions_for(p, 1, &mut positions), 3);
        assert_eq!(positions, [2, 3, 10]);
        assert_eq!(reader.decode_positions(p, &mut positions), 5);
        assert_eq!(reader.positions_for(p, 2, &mut positions), 0);
    }
}
