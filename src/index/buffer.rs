use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    error::invalid_data,
    options::{DocOrder, IndexKind},
    pointer::Pointer,
    utils::vint::{decode_sorted, decode_vint32, encode_sorted, encode_vint32},
};

/// Postings of one term not yet compressed into the pool, in insertion
/// (ascending doc id) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermBuffer {
    pub docids: Vec<u32>,
    /// One tf or attribute score per document, empty for non-positional
    /// indexes.
    pub payload: Vec<u32>,
    /// Per-document position gap groups, concatenated. Group `i` has
    /// `payload[i]` entries.
    pub positions: Vec<u32>,
    /// Last block of the chain in forward mode.
    pub tail: Pointer,
}

impl TermBuffer {
    pub fn len(&self) -> usize {
        self.docids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docids.is_empty()
    }

    pub fn push(&mut self, docid: u32, payload: Option<u32>, positions: &[u32]) {
        self.docids.push(docid);
        self.payload.extend(payload);
        self.positions.extend_from_slice(positions);
    }

    /// Number of positions held by the first `n` documents.
    pub fn position_count(&self, n: usize, kind: IndexKind) -> usize {
        if !kind.has_positions() {
            return 0;
        }
        self.payload[..n].iter().map(|&tf| tf as usize).sum()
    }

    pub fn drain_front(&mut self, n: usize, npositions: usize) {
        self.docids.drain(..n);
        if !self.payload.is_empty() {
            self.payload.drain(..n);
        }
        self.positions.drain(..npositions);
    }
}

/// The first documents of a buffer laid out in traversal order, ready for
/// the block writer.
#[derive(Default)]
pub struct PendingBlock {
    pub docids: Vec<u32>,
    pub payload: Vec<u32>,
    pub positions: Vec<u32>,
}

impl PendingBlock {
    pub fn fill(&mut self, buffer: &TermBuffer, n: usize, npositions: usize, order: DocOrder) {
        self.docids.clear();
        self.payload.clear();
        self.positions.clear();
        let payload = &buffer.payload[..buffer.payload.len().min(n)];
        match order {
            DocOrder::Forward => {
                self.docids.extend_from_slice(&buffer.docids[..n]);
                self.payload.extend_from_slice(payload);
                self.positions
                    .extend_from_slice(&buffer.positions[..npositions]);
            }
            DocOrder::Reverse => {
                self.docids.extend(buffer.docids[..n].iter().rev());
                self.payload.extend(payload.iter().rev());
                if npositions > 0 {
                    let mut end = npositions;
                    for &tf in payload.iter().rev() {
                        let start = end - tf as usize;
                        self.positions
                            .extend_from_slice(&buffer.positions[start..end]);
                        end = start;
                    }
                }
            }
        }
    }

    /// Last doc id in traversal order.
    pub fn boundary(&self) -> u32 {
        self.docids[self.docids.len() - 1]
    }
}

/// Uncompressed postings of every term, indexed by term id.
pub struct BufferMaps {
    kind: IndexKind,
    df_cutoff: u32,
    buffers: Vec<TermBuffer>,
}

impl BufferMaps {
    pub fn new(kind: IndexKind, df_cutoff: u32) -> Self {
        Self {
            kind,
            df_cutoff,
            buffers: Vec::new(),
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn df_cutoff(&self) -> u32 {
        self.df_cutoff
    }

    /// Number of term slots, including drained ones.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn get(&self, term_id: u32) -> Option<&TermBuffer> {
        self.buffers.get(term_id as usize)
    }

    pub fn get_mut(&mut self, term_id: u32) -> &mut TermBuffer {
        let index = term_id as usize;
        if index >= self.buffers.len() {
            self.buffers.resize_with(index + 1, TermBuffer::default);
        }
        &mut self.buffers[index]
    }

    /// Total buffered postings over all terms.
    pub fn posting_count(&self) -> usize {
        self.buffers.iter().map(TermBuffer::len).sum()
    }

    pub fn save(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.kind.to_u32())?;
        writer.write_u32::<LittleEndian>(self.df_cutoff)?;
        writer.write_u32::<LittleEndian>(self.buffers.len() as u32)?;
        let mut blob = Vec::new();
        for buffer in &self.buffers {
            blob.clear();
            encode_sorted(&buffer.docids, &mut blob)?;
            for &v in buffer.payload.iter().chain(&buffer.positions) {
                encode_vint32(v, &mut blob)?;
            }
            writer.write_u32::<LittleEndian>(buffer.docids.len() as u32)?;
            writer.write_u32::<LittleEndian>(buffer.positions.len() as u32)?;
            writer.write_u64::<LittleEndian>(buffer.tail.to_raw())?;
            writer.write_u32::<LittleEndian>(blob.len() as u32)?;
            writer.write_all(&blob)?;
        }
        Ok(())
    }

    pub fn load(reader: &mut impl Read) -> std::io::Result<Self> {
        let kind = IndexKind::from_u32(reader.read_u32::<LittleEndian>()?)
            .ok_or_else(|| invalid_data("unknown index kind"))?;
        let df_cutoff = reader.read_u32::<LittleEndian>()?;
        let count = reader.read_u32::<LittleEndian>()?;
        let mut buffers = Vec::new();
        let mut blob = Vec::new();
        for _ in 0..count {
            let ndocs = reader.read_u32::<LittleEndian>()? as usize;
            let npositions = reader.read_u32::<LittleEndian>()? as usize;
            let tail = Pointer::from_raw(reader.read_u64::<LittleEndian>()?);
            let len = reader.read_u32::<LittleEndian>()? as usize;
            blob.resize(len, 0);
            reader.read_exact(&mut blob)?;

            let mut data = blob.as_slice();
            let mut buffer = TermBuffer {
                tail,
                ..Default::default()
            };
            decode_sorted(&mut data, ndocs, &mut buffer.docids)?;
            if kind.has_payload() {
                for _ in 0..ndocs {
                    buffer.payload.push(decode_vint32(&mut data)?);
                }
            }
            for _ in 0..npositions {
                buffer.positions.push(decode_vint32(&mut data)?);
            }
            if !data.is_empty() || buffer.position_count(ndocs, kind) != npositions {
                return Err(invalid_data("inconsistent term buffer"));
            }
            buffers.push(buffer);
        }
        Ok(Self {
            kind,
            df_cutoff,
            buffers,
        })
    }
}
