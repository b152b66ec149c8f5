use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{
    BlockRecord, BOUNDARY, COMPRESSION_BLOCK_SIZE, DOC_COUNT, HEADER_LEN, LEN, NEXT_OFFSET,
    NEXT_SEGMENT, NO_NEXT_SEGMENT,
};
use crate::{
    error::{invalid_data, Result, ZambeziError},
    options::{DocOrder, EncodeOption},
    pointer::Pointer,
};

/// Arena of fixed-size word segments holding every compressed block.
///
/// Segments only grow at the end. A written block never moves and never
/// changes, except for its link words, which are patched when the next block
/// of its chain is appended.
pub struct SegmentPool {
    segment_size: u32,
    max_segments: u32,
    order: DocOrder,
    encode: EncodeOption,
    segments: Vec<Vec<u32>>,
}

fn set_link(block: &mut [u32], next: Pointer) {
    if next.is_defined() {
        block[NEXT_SEGMENT] = next.segment();
        block[NEXT_OFFSET] = next.offset();
    } else {
        block[NEXT_SEGMENT] = NO_NEXT_SEGMENT;
        block[NEXT_OFFSET] = 0;
    }
}

impl SegmentPool {
    pub fn new(segment_size: u32, max_segments: u32, order: DocOrder, encode: EncodeOption) -> Self {
        Self {
            segment_size,
            max_segments,
            order,
            encode,
            segments: Vec::new(),
        }
    }

    pub fn order(&self) -> DocOrder {
        self.order
    }

    pub fn encode(&self) -> EncodeOption {
        self.encode
    }

    pub fn segment_size(&self) -> u32 {
        self.segment_size
    }

    pub fn max_segments(&self) -> u32 {
        self.max_segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Words written across all segments.
    pub fn size_in_words(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Copies `record` into the pool and links it into its chain.
    ///
    /// The new block points at `successor`; a defined `predecessor` is patched
    /// to point at the new block.
    pub fn append_block(
        &mut self,
        record: &[u32],
        boundary: u32,
        predecessor: Pointer,
        successor: Pointer,
    ) -> Result<Pointer> {
        let segment_size = self.segment_size as usize;
        if record.len() > segment_size {
            return Err(ZambeziError::BlockTooLarge {
                len: record.len(),
                segment_size: self.segment_size,
            });
        }
        let fits = self
            .segments
            .last()
            .is_some_and(|segment| segment.len() + record.len() <= segment_size);
        if !fits {
            if self.segments.len() >= self.max_segments as usize {
                return Err(ZambeziError::PoolExhausted {
                    max_segments: self.max_segments,
                    segment_size: self.segment_size,
                });
            }
            log::debug!(
                "allocating segment {} of {} words",
                self.segments.len(),
                segment_size
            );
            self.segments.push(Vec::with_capacity(segment_size));
        }

        let segment = self.segments.len() - 1;
        let words = &mut self.segments[segment];
        let offset = words.len();
        words.extend_from_slice(record);
        let block = &mut words[offset..];
        block[BOUNDARY] = boundary;
        set_link(block, successor);

        let pointer = Pointer::new(segment as u32, offset as u32);
        if predecessor.is_defined() {
            let block = &mut self.segments[predecessor.segment() as usize]
                [predecessor.offset() as usize..];
            set_link(block, pointer);
        }
        Ok(pointer)
    }

    pub fn record(&self, pointer: Pointer) -> BlockRecord<'_> {
        assert!(pointer.is_defined(), "dereferencing an undefined pointer");
        BlockRecord::new(&self.segments[pointer.segment() as usize][pointer.offset() as usize..])
    }

    pub fn next_pointer(&self, pointer: Pointer) -> Pointer {
        self.record(pointer).next()
    }

    pub fn boundary(&self, pointer: Pointer) -> u32 {
        self.record(pointer).boundary()
    }

    /// First block from `pointer` on whose boundary is not before `target`,
    /// or `UNDEFINED` when the chain ends first.
    pub fn next_pointer_to(&self, mut pointer: Pointer, target: u32) -> Pointer {
        while pointer.is_defined() {
            let record = self.record(pointer);
            if !self.order.less(record.boundary(), target) {
                break;
            }
            pointer = record.next();
        }
        pointer
    }

    /// Whether `pointer` names a block whose header and length fit inside its
    /// segment and whose document count is within a block.
    pub fn is_valid_block(&self, pointer: Pointer) -> bool {
        let Some(words) = self.segments.get(pointer.segment() as usize) else {
            return false;
        };
        let offset = pointer.offset() as usize;
        if offset + HEADER_LEN > words.len() {
            return false;
        }
        let len = words[offset + LEN] as usize;
        let doc_count = words[offset + DOC_COUNT] as usize;
        len >= HEADER_LEN
            && offset + len <= words.len()
            && (1..=COMPRESSION_BLOCK_SIZE).contains(&doc_count)
    }

    /// Walks the chain from `head`, checking every block. Returns the number
    /// of documents and the last block, or `None` for a chain that leaves the
    /// pool or never ends.
    pub fn check_chain(&self, head: Pointer) -> Option<(usize, Pointer)> {
        let mut remaining = self.size_in_words() / HEADER_LEN;
        let mut docs = 0;
        let mut last = Pointer::UNDEFINED;
        let mut pointer = head;
        while pointer.is_defined() {
            if remaining == 0 || !self.is_valid_block(pointer) {
                return None;
            }
            remaining -= 1;
            let record = self.record(pointer);
            docs += record.doc_count();
            last = pointer;
            pointer = record.next();
        }
        Some((docs, last))
    }

    pub fn save(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.segment_size)?;
        writer.write_u32::<LittleEndian>(self.max_segments)?;
        writer.write_u32::<LittleEndian>(self.order.is_reverse() as u32)?;
        writer.write_u32::<LittleEndian>(self.encode.to_u32())?;
        writer.write_u32::<LittleEndian>(self.segments.len() as u32)?;
        let offset = self.segments.last().map_or(0, Vec::len);
        writer.write_u32::<LittleEndian>(offset as u32)?;
        for segment in &self.segments {
            writer.write_u32::<LittleEndian>(segment.len() as u32)?;
            writer.write_all(bytemuck::cast_slice(segment))?;
        }
        Ok(())
    }

    pub fn load(reader: &mut impl Read) -> std::io::Result<Self> {
        let segment_size = reader.read_u32::<LittleEndian>()?;
        let max_segments = reader.read_u32::<LittleEndian>()?;
        let order = match reader.read_u32::<LittleEndian>()? {
            0 => DocOrder::Forward,
            1 => DocOrder::Reverse,
            v => return Err(invalid_data(format!("invalid doc order {}", v))),
        };
        let encode = EncodeOption::from_u32(reader.read_u32::<LittleEndian>()?)
            .ok_or_else(|| invalid_data("invalid codec"))?;
        let segment_count = reader.read_u32::<LittleEndian>()?;
        let offset = reader.read_u32::<LittleEndian>()?;
        if (segment_size as usize) < HEADER_LEN || segment_count > max_segments {
            return Err(invalid_data(format!(
                "{} segments of {} words with a budget of {}",
                segment_count, segment_size, max_segments
            )));
        }

        let mut segments = Vec::with_capacity(segment_count as usize);
        for _ in 0..segment_count {
            let len = reader.read_u32::<LittleEndian>()?;
            if len > segment_size {
                return Err(invalid_data(format!(
                    "segment of {} words exceeds segment size {}",
                    len, segment_size
                )));
            }
            let mut words = vec![0; len as usize];
            reader.read_u32_into::<LittleEndian>(&mut words)?;
            segments.push(words);
        }
        if segments.last().map_or(0, Vec::len) != offset as usize {
            return Err(invalid_data("segment offset does not match the last segment"));
        }

        Ok(Self {
            segment_size,
            max_segments,
            order,
            encode,
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{options::BloomOption, segment::BlockWriter};

    fn pool(max_segments: u32, order: DocOrder) -> SegmentPool {
        SegmentPool::new(1024, max_segments, order, EncodeOption::OptPfor)
    }

    fn writer(order: DocOrder) -> BlockWriter {
        BlockWriter::new(EncodeOption::OptPfor, order, BloomOption::disabled())
    }

    #[test]
    fn test_forward_chain() {
        let mut pool = pool(4, DocOrder::Forward);
        let mut writer = writer(DocOrder::Forward);
        let first = pool
            .append_block(writer.build(&[1, 2, 3], None, None), 3, Pointer::UNDEFINED, Pointer::UNDEFINED)
            .unwrap();
        let second = pool
            .append_block(writer.build(&[7, 9], None, None), 9, first, Pointer::UNDEFINED)
            .unwrap();
        assert_eq!(pool.next_pointer(first), second);
        assert!(!pool.next_pointer(second).is_defined());
        assert_eq!(pool.boundary(first), 3);
        assert_eq!(pool.next_pointer_to(first, 3), first);
        assert_eq!(pool.next_pointer_to(first, 4), second);
        assert!(!pool.next_pointer_to(first, 10).is_defined());
    }

    #[test]
    fn test_reverse_chain() {
        let mut pool = pool(4, DocOrder::Reverse);
        let mut writer = writer(DocOrder::Reverse);
        let older = pool
            .append_block(writer.build(&[3, 2, 1], None, None), 1, Pointer::UNDEFINED, Pointer::UNDEFINED)
            .unwrap();
        let head = pool
            .append_block(writer.build(&[9, 7], None, None), 7, Pointer::UNDEFINED, older)
            .unwrap();
        assert_eq!(pool.next_pointer(head), older);
        assert_eq!(pool.next_pointer_to(head, 5), older);
        assert_eq!(pool.next_pointer_to(head, 8), head);
    }

    #[test]
    fn test_segment_rollover_and_exhaustion() {
        let mut pool = pool(2, DocOrder::Forward);
        let mut record = vec![0u32; 600];
        record[0] = 600;
        let a = pool
            .append_block(&record, 0, Pointer::UNDEFINED, Pointer::UNDEFINED)
            .unwrap();
        let b = pool.append_block(&record, 0, a, Pointer::UNDEFINED).unwrap();
        assert_eq!(b.segment(), 1);
        assert_eq!(b.offset(), 0);
        assert_eq!(pool.next_pointer(a), b);
        assert!(matches!(
            pool.append_block(&record, 0, b, Pointer::UNDEFINED),
            Err(ZambeziError::PoolExhausted { .. })
        ));
        assert!(matches!(
            pool.append_block(&vec![0; 2000], 0, b, Pointer::UNDEFINED),
            Err(ZambeziError::BlockTooLarge { .. })
        ));
    }

    #[test]
    fn test_check_chain() {
        let mut chain = pool(4, DocOrder::Forward);
        let mut writer = writer(DocOrder::Forward);
        let first = chain
            .append_block(writer.build(&[1, 2, 3], None, None), 3, Pointer::UNDEFINED, Pointer::UNDEFINED)
            .unwrap();
        let second = chain
            .append_block(writer.build(&[7, 9], None, None), 9, first, Pointer::UNDEFINED)
            .unwrap();
        assert_eq!(chain.check_chain(first), Some((5, second)));
        assert_eq!(chain.check_chain(Pointer::UNDEFINED), Some((0, Pointer::UNDEFINED)));
        assert!(chain.is_valid_block(second));
        assert!(!chain.is_valid_block(Pointer::new(3, 0)));
        assert!(!chain.is_valid_block(Pointer::new(0, 5000)));
        // lands on the link word of the first block
        assert!(!chain.is_valid_block(Pointer::new(0, 1)));
        assert_eq!(chain.check_chain(Pointer::new(1, 0)), None);

        // a block linked to itself
        let mut cyclic = pool(4, DocOrder::Forward);
        let p = cyclic
            .append_block(writer.build(&[4], None, None), 4, Pointer::UNDEFINED, Pointer::UNDEFINED)
            .unwrap();
        let segment = &mut cyclic.segments[0];
        segment[p.offset() as usize + NEXT_SEGMENT] = p.segment();
        segment[p.offset() as usize + NEXT_OFFSET] = p.offset();
        assert_eq!(cyclic.check_chain(p), None);
    }

    #[test]
    fn test_save_load() {
        let mut pool = pool(4, DocOrder::Forward);
        let mut writer = writer(DocOrder::Forward);
        let first = pool
            .append_block(writer.build(&[4, 8], None, None), 8, Pointer::UNDEFINED, Pointer::UNDEFINED)
            .unwrap();
        let mut buf = Vec::new();
        pool.save(&mut buf).unwrap();
        let loaded = SegmentPool::load(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded.segment_count(), 1);
        assert_eq!(loaded.size_in_words(), pool.size_in_words());
        assert_eq!(loaded.boundary(first), 8);
        assert!(SegmentPool::load(&mut &buf[..buf.len() - 1]).is_err());
    }
}
