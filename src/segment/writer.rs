use super::{
    encode_docid_gaps, BlockFlags, BLOOM_OFFSET, COMPRESSION_BLOCK_SIZE, DOCID_LEN, DOC_COUNT,
    FLAGS, HEADER_LEN, LEN, NEXT_SEGMENT, NO_NEXT_SEGMENT,
};
use crate::{
    algorithm::{
        bloom,
        block_encode::{BlockEncode, BlockEncodeTrait},
    },
    options::{BloomOption, DocOrder, EncodeOption},
};

/// Assembles block records. Link and boundary words are left for the pool.
pub struct BlockWriter {
    encoder: BlockEncode,
    order: DocOrder,
    bloom: BloomOption,
    gaps: Vec<u32>,
    record: Vec<u32>,
}

impl BlockWriter {
    pub fn new(encode: EncodeOption, order: DocOrder, bloom: BloomOption) -> Self {
        Self {
            encoder: BlockEncode::new(encode),
            order,
            bloom,
            gaps: Vec::new(),
            record: Vec::new(),
        }
    }

    /// Builds the record for `docids`, listed in traversal order.
    ///
    /// `payload` holds one tf (or attribute score) per document; `positions`
    /// holds the concatenated per-document position gaps in the same order.
    pub fn build(
        &mut self,
        docids: &[u32],
        payload: Option<&[u32]>,
        positions: Option<&[u32]>,
    ) -> &[u32] {
        assert!(
            !docids.is_empty() && docids.len() <= COMPRESSION_BLOCK_SIZE,
            "block of {} documents",
            docids.len()
        );
        let mut flags = BlockFlags::empty();
        self.record.clear();
        self.record.resize(HEADER_LEN, 0);
        self.record[NEXT_SEGMENT] = NO_NEXT_SEGMENT;
        self.record[DOC_COUNT] = docids.len() as u32;

        encode_docid_gaps(self.order, docids, &mut self.gaps);
        let words = self.encoder.encode(&self.gaps);
        self.record[DOCID_LEN] = words.len() as u32;
        self.record.extend_from_slice(words);

        if let Some(payload) = payload {
            debug_assert_eq!(payload.len(), docids.len());
            flags |= BlockFlags::TF;
            let words = self.encoder.encode(payload);
            self.record.push(words.len() as u32);
            self.record.extend_from_slice(words);
        }

        if let Some(positions) = positions {
            flags |= BlockFlags::POSITIONS;
            self.record.push(positions.len() as u32);
            self.record
                .push(positions.len().div_ceil(COMPRESSION_BLOCK_SIZE) as u32);
            for chunk in positions.chunks(COMPRESSION_BLOCK_SIZE) {
                let words = self.encoder.encode(chunk);
                self.record.push(words.len() as u32);
                self.record.extend_from_slice(words);
            }
        }

        if self.bloom.enabled {
            flags |= BlockFlags::BLOOM;
            let start = self.record.len();
            let len = bloom::compute_length(docids.len(), self.bloom.bits_per_element);
            self.record[BLOOM_OFFSET] = start as u32;
            self.record.push(len as u32);
            self.record.resize(start + 1 + len, 0);
            let filter = &mut self.record[start + 1..];
            for &docid in docids {
                bloom::insert(filter, self.bloom.nb_hash, docid);
            }
        }

        self.record[FLAGS] = flags.bits();
        self.record[LEN] = self.record.len() as u32;
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::BlockRecord;

    #[test]
    fn test_record_sections() {
        let mut writer = BlockWriter::new(
            EncodeOption::OptPfor,
            DocOrder::Forward,
            BloomOption::default(),
        );
        let docids = [2, 5, 9];
        let positions: Vec<u32> = (1..=200).collect();
        let record = writer
            .build(&docids, Some(&[1, 1, 198]), Some(&positions))
            .to_vec();
        let view = BlockRecord::new(&record);
        assert_eq!(view.len(), record.len());
        assert_eq!(view.doc_count(), 3);
        assert_eq!(
            view.flags(),
            BlockFlags::TF | BlockFlags::POSITIONS | BlockFlags::BLOOM
        );
        assert!(view.tfs().is_some());
        assert_eq!(view.position_count(), Some(200));
        assert_eq!(view.position_blocks().count(), 2);
        let filter = view.bloom().unwrap();
        assert!(docids
            .iter()
            .all(|&d| bloom::contains(filter, BloomOption::default().nb_hash, d)));
        assert!(!view.next().is_defined());
    }

    #[test]
    fn test_record_without_optional_sections() {
        let mut writer = BlockWriter::new(
            EncodeOption::Bitpack,
            DocOrder::Reverse,
            BloomOption::disabled(),
        );
        let record = writer.build(&[9, 5, 2], None, None).to_vec();
        let view = BlockRecord::new(&record);
        assert_eq!(view.flags(), BlockFlags::empty());
        assert!(view.tfs().is_none());
        assert!(view.position_count().is_none());
        assert_eq!(view.position_blocks().count(), 0);
        assert!(view.bloom().is_none());
    }
}
