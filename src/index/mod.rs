mod buffer;

use std::{
    collections::HashMap,
    io::{Read, Write},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use validator::Validate;

use self::buffer::{BufferMaps, PendingBlock, TermBuffer};
use crate::{
    algorithm::{bwand_and, bwand_or, svs, wand, Algorithm, QueryTerm, SearchResult},
    dictionary::Dictionary,
    error::{invalid_data, Result, ZambeziError},
    filter::DocFilter,
    options::{BloomOption, DocOrder, IndexKind, IndexOptions},
    pointer::Pointer,
    pointers::Pointers,
    segment::{BlockReader, BlockWriter, SegmentPool, COMPRESSION_BLOCK_SIZE},
    utils::topk_computer::TopKComputer,
    weight::{idf, Bm25Weight},
};

/// Postings of one term inside the document being inserted.
struct DocTerm {
    term_id: u32,
    payload: u32,
    positions: Vec<u32>,
    last_position: u32,
}

/// Lays out the first `n` postings of `buffer` in traversal order and
/// compresses them. Returns the record, its boundary and the number of
/// positions it holds.
fn compress_front<'w>(
    writer: &'w mut BlockWriter,
    pending: &mut PendingBlock,
    buffer: &TermBuffer,
    n: usize,
    kind: IndexKind,
    order: DocOrder,
) -> (&'w [u32], u32, usize) {
    let npositions = buffer.position_count(n, kind);
    pending.fill(buffer, n, npositions, order);
    let record = writer.build(
        &pending.docids,
        kind.has_payload().then_some(pending.payload.as_slice()),
        kind.has_positions().then_some(pending.positions.as_slice()),
    );
    (record, pending.boundary(), npositions)
}

/// Compressed in-memory inverted index.
///
/// Postings are buffered per term and compressed into the segment pool one
/// block at a time. Terms at or below the df cutoff are short lists: they
/// stay in their buffers, even across `flush`, and queries read them from
/// there. For every other term `flush` writes whatever is still buffered,
/// and only flushed postings are visible to `retrieve`.
pub struct InvertedIndex {
    options: IndexOptions,
    dictionary: Dictionary,
    pointers: Pointers,
    buffers: BufferMaps,
    pool: SegmentPool,
    writer: BlockWriter,
    pending: PendingBlock,
    last_docid: Option<u32>,
}

impl InvertedIndex {
    pub fn new(options: IndexOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::from_parts(
            options,
            Dictionary::new(options.vocab_size),
            Pointers::new(),
            BufferMaps::new(options.kind, options.df_cutoff),
            SegmentPool::new(
                options.segment_size,
                options.max_segments,
                options.order(),
                options.encode,
            ),
        ))
    }

    fn from_parts(
        options: IndexOptions,
        dictionary: Dictionary,
        pointers: Pointers,
        buffers: BufferMaps,
        pool: SegmentPool,
    ) -> Self {
        let last_docid = pointers.doc_len.last_docid();
        Self {
            writer: BlockWriter::new(options.encode, options.order(), options.bloom),
            options,
            dictionary,
            pointers,
            buffers,
            pool,
            pending: PendingBlock::default(),
            last_docid,
        }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn pointers(&self) -> &Pointers {
        &self.pointers
    }

    pub fn pool(&self) -> &SegmentPool {
        &self.pool
    }

    /// Adds one document. Doc ids must be strictly increasing across calls.
    ///
    /// `scores` is required by attribute-score indexes, one per term, and
    /// ignored otherwise. A term the dictionary has no room for is skipped
    /// with a warning; it still counts towards the document length.
    pub fn insert_doc<S: AsRef<str>>(
        &mut self,
        docid: u32,
        terms: &[S],
        scores: Option<&[u32]>,
    ) -> Result<()> {
        if let Some(last) = self.last_docid {
            if docid <= last {
                return Err(ZambeziError::DocIdNotIncreasing { docid, last });
            }
        }
        let kind = self.options.kind;
        let scores = if kind.has_scores() {
            let actual = scores.map_or(0, <[u32]>::len);
            if actual != terms.len() {
                return Err(ZambeziError::ScoreCountMismatch {
                    expected: terms.len(),
                    actual,
                });
            }
            scores
        } else {
            None
        };

        let mut doc_terms: Vec<DocTerm> = Vec::new();
        let mut slots: HashMap<u32, usize> = HashMap::new();
        for (i, term) in terms.iter().enumerate() {
            let term = term.as_ref();
            let term_id = match self.dictionary.insert_term(term) {
                Ok(term_id) => term_id,
                Err(e) => {
                    log::warn!("skipping term {:?} of document {}: {}", term, docid, e);
                    continue;
                }
            };
            self.pointers.increment_cf(term_id);
            let slot = *slots.entry(term_id).or_insert_with(|| {
                doc_terms.push(DocTerm {
                    term_id,
                    payload: scores.map_or(0, |scores| scores[i]),
                    positions: Vec::new(),
                    last_position: 0,
                });
                doc_terms.len() - 1
            });
            let doc_term = &mut doc_terms[slot];
            if kind.has_tf() {
                doc_term.payload += 1;
            }
            if kind.has_positions() {
                let position = i as u32 + 1;
                doc_term.positions.push(position - doc_term.last_position);
                doc_term.last_position = position;
            }
        }

        let len = terms.len() as u32;
        self.pointers.add_doc(docid, len);
        self.last_docid = Some(docid);

        for doc_term in doc_terms {
            let term_id = doc_term.term_id;
            if kind.has_tf() {
                self.pointers.set_max_tf(term_id, doc_term.payload, len);
            }
            let df = self.pointers.increment_df(term_id);
            let buffer = self.buffers.get_mut(term_id);
            buffer.push(
                docid,
                kind.has_payload().then_some(doc_term.payload),
                &doc_term.positions,
            );
            if buffer.len() >= COMPRESSION_BLOCK_SIZE && df > self.options.df_cutoff {
                self.append_block(term_id, COMPRESSION_BLOCK_SIZE)?;
            }
        }
        Ok(())
    }

    /// Compresses the buffered postings of every term above the df cutoff
    /// into the pool.
    pub fn flush(&mut self) -> Result<()> {
        let mut blocks = 0;
        for term_id in 0..self.buffers.len() as u32 {
            if self.pointers.df(term_id) <= self.options.df_cutoff {
                continue;
            }
            while let Some(len) = self
                .buffers
                .get(term_id)
                .map(|buffer| buffer.len())
                .filter(|&len| len > 0)
            {
                self.append_block(term_id, len.min(COMPRESSION_BLOCK_SIZE))?;
                blocks += 1;
            }
        }
        log::debug!(
            "flushed {} blocks, pool holds {} words in {} segments",
            blocks,
            self.pool.size_in_words(),
            self.pool.segment_count()
        );
        Ok(())
    }

    /// Compresses the first `n` buffered postings of `term_id` into one block
    /// and links it into the term's chain.
    fn append_block(&mut self, term_id: u32, n: usize) -> Result<()> {
        let kind = self.options.kind;
        let order = self.options.order();
        let buffer = self.buffers.get_mut(term_id);
        let (record, boundary, npositions) =
            compress_front(&mut self.writer, &mut self.pending, buffer, n, kind, order);
        match order {
            DocOrder::Forward => {
                let pointer =
                    self.pool
                        .append_block(record, boundary, buffer.tail, Pointer::UNDEFINED)?;
                if !self.pointers.head(term_id).is_defined() {
                    self.pointers.set_head(term_id, pointer);
                }
                buffer.tail = pointer;
            }
            DocOrder::Reverse => {
                let head = self.pointers.head(term_id);
                let pointer = self
                    .pool
                    .append_block(record, boundary, Pointer::UNDEFINED, head)?;
                self.pointers.set_head(term_id, pointer);
            }
        }
        buffer.drain_front(n, npositions);
        Ok(())
    }

    /// Compresses the buffered postings of a short list into `short_lists`
    /// and returns the tagged pointer to its single block.
    fn short_list(
        &self,
        term_id: u32,
        short_lists: &mut SegmentPool,
        scratch: &mut Option<(BlockWriter, PendingBlock)>,
    ) -> Pointer {
        let Some(buffer) = self.buffers.get(term_id).filter(|buffer| !buffer.is_empty()) else {
            return Pointer::UNDEFINED;
        };
        let options = &self.options;
        let (writer, pending) = scratch.get_or_insert_with(|| {
            let writer = BlockWriter::new(options.encode, options.order(), options.bloom);
            (writer, PendingBlock::default())
        });
        let (record, boundary, _) =
            compress_front(writer, pending, buffer, buffer.len(), options.kind, options.order());
        match short_lists.append_block(record, boundary, Pointer::UNDEFINED, Pointer::UNDEFINED) {
            Ok(pointer) => pointer.to_short_list(),
            Err(e) => {
                log::warn!("skipping short list of term {}: {}", term_id, e);
                Pointer::UNDEFINED
            }
        }
    }

    /// Runs `query`, a list of `(term, weight)` pairs, with `algorithm`.
    ///
    /// Terms with a non-positive weight, unknown terms and terms without
    /// visible postings are dropped. `hits` bounds the result size; for the
    /// unscored algorithms 0 means unbounded, for the scored ones it yields
    /// an empty result.
    pub fn retrieve<S: AsRef<str>>(
        &self,
        algorithm: Algorithm,
        query: &[(S, i32)],
        filter: Option<&dyn DocFilter>,
        hits: usize,
    ) -> SearchResult {
        let kind = self.options.kind;
        let with_tf = algorithm == Algorithm::Wand && kind.has_tf();
        let total_docs = self.pointers.total_docs();
        let avgdl = self.pointers.avg_doc_len();
        let mut short_lists = SegmentPool::new(
            self.options.segment_size,
            query.len() as u32,
            self.options.order(),
            self.options.encode,
        );
        let mut scratch = None;
        let mut terms: Vec<QueryTerm> = Vec::new();
        for (term, weight) in query {
            if *weight <= 0 {
                continue;
            }
            let Some(term_id) = self.dictionary.get_term_id(term.as_ref()) else {
                continue;
            };
            let stat = self.pointers.stat(term_id);
            let head = if stat.df <= self.options.df_cutoff {
                self.short_list(term_id, &mut short_lists, &mut scratch)
            } else {
                stat.head
            };
            if !head.is_defined() {
                continue;
            }
            let query_weight = *weight as f32;
            let weight = Bm25Weight::new(query_weight, idf(total_docs, stat.df), avgdl);
            let max_score = if with_tf {
                weight.score(stat.max_tf_doc_len, stat.max_tf)
            } else {
                weight.idf_bound()
            };
            terms.push(QueryTerm {
                head,
                df: stat.df,
                query_weight,
                weight,
                max_score,
            });
        }
        if terms.is_empty() {
            return SearchResult::default();
        }

        let mut reader = BlockReader::new(&self.pool, self.options.bloom.nb_hash)
            .with_short_lists(&short_lists);
        match algorithm {
            Algorithm::BwandOr | Algorithm::Wand | Algorithm::Mbwand => {
                if hits == 0 {
                    return SearchResult::default();
                }
                let mut computer = TopKComputer::new(hits);
                if algorithm == Algorithm::BwandOr {
                    terms.sort_by_key(|term| term.df);
                    bwand_or(&mut reader, &terms, filter, &mut computer);
                } else {
                    wand(
                        &mut reader,
                        &terms,
                        &self.pointers.doc_len,
                        filter,
                        with_tf,
                        &mut computer,
                    );
                }
                computer.into()
            }
            Algorithm::BwandAnd => {
                terms.sort_by_key(|term| term.df);
                SearchResult {
                    docids: bwand_and(&mut reader, &terms, filter, hits),
                    scores: Vec::new(),
                }
            }
            Algorithm::Svs => {
                terms.sort_by_key(|term| term.df);
                svs(&mut reader, &terms, filter, hits, kind.has_scores())
            }
        }
    }

    /// Writes buffer maps, pool, dictionary, pointers and the bloom settings,
    /// in that order.
    pub fn save(&self, writer: &mut impl Write) -> Result<()> {
        log::info!(
            "saving index: {} buffered postings, {} segments ({} words), {} terms, {} documents",
            self.buffers.posting_count(),
            self.pool.segment_count(),
            self.pool.size_in_words(),
            self.dictionary.len(),
            self.pointers.total_docs()
        );
        self.buffers.save(writer)?;
        self.pool.save(writer)?;
        self.dictionary.save(writer)?;
        self.pointers.save(writer)?;
        let bloom = self.options.bloom;
        writer.write_u8(bloom.enabled as u8)?;
        writer.write_u32::<LittleEndian>(bloom.nb_hash)?;
        writer.write_u32::<LittleEndian>(bloom.bits_per_element)?;
        Ok(())
    }

    pub fn load(reader: &mut impl Read) -> Result<Self> {
        let index = Self::read_sections(reader).map_err(ZambeziError::deserialize)?;
        log::info!(
            "loaded index: {} buffered postings, {} segments ({} words), {} terms, {} documents",
            index.buffers.posting_count(),
            index.pool.segment_count(),
            index.pool.size_in_words(),
            index.dictionary.len(),
            index.pointers.total_docs()
        );
        Ok(index)
    }

    fn read_sections(reader: &mut impl Read) -> std::io::Result<Self> {
        let buffers = BufferMaps::load(reader)?;
        let pool = SegmentPool::load(reader)?;
        let dictionary = Dictionary::load(reader)?;
        let pointers = Pointers::load(reader)?;
        let enabled = match reader.read_u8()? {
            0 => false,
            1 => true,
            v => return Err(invalid_data(format!("invalid bloom flag {}", v))),
        };
        let bloom = BloomOption {
            enabled,
            nb_hash: reader.read_u32::<LittleEndian>()?,
            bits_per_element: reader.read_u32::<LittleEndian>()?,
        };
        let options = IndexOptions {
            kind: buffers.kind(),
            encode: pool.encode(),
            segment_size: pool.segment_size(),
            max_segments: pool.max_segments(),
            vocab_size: dictionary.capacity(),
            df_cutoff: buffers.df_cutoff(),
            reverse: pool.order().is_reverse(),
            bloom,
        };
        options
            .validate()
            .map_err(|e| invalid_data(e.to_string()))?;
        check_chains(&dictionary, &pointers, &buffers, &pool)?;
        Ok(Self::from_parts(options, dictionary, pointers, buffers, pool))
    }
}

/// Cross-checks loaded sections: every term slot belongs to the dictionary,
/// every chain is made of well-formed blocks inside the pool, and a term's
/// chain plus its buffer hold exactly `df` postings. Forward chains must end
/// at the buffer's tail.
fn check_chains(
    dictionary: &Dictionary,
    pointers: &Pointers,
    buffers: &BufferMaps,
    pool: &SegmentPool,
) -> std::io::Result<()> {
    let terms = dictionary.len();
    if pointers.term_count() > terms || buffers.len() > terms {
        return Err(invalid_data(format!(
            "{} term statistics and {} buffers for {} terms",
            pointers.term_count(),
            buffers.len(),
            terms
        )));
    }
    for term_id in 0..terms as u32 {
        let stat = pointers.stat(term_id);
        let (chained, last) = pool
            .check_chain(stat.head)
            .ok_or_else(|| invalid_data(format!("corrupt block chain for term {}", term_id)))?;
        let (buffered, tail) = buffers
            .get(term_id)
            .map_or((0, Pointer::UNDEFINED), |buffer| (buffer.len(), buffer.tail));
        if chained + buffered != stat.df as usize {
            return Err(invalid_data(format!(
                "term {} holds {} postings, df is {}",
                term_id,
                chained + buffered,
                stat.df
            )));
        }
        let expected_tail = match pool.order() {
            DocOrder::Forward => last,
            DocOrder::Reverse => Pointer::UNDEFINED,
        };
        if tail != expected_tail {
            return Err(invalid_data(format!("dangling tail for term {}", term_id)));
        }
    }
    Ok(())
}
