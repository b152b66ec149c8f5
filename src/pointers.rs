use std::{
    collections::HashMap,
    io::{Read, Write},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{error::invalid_data, pointer::Pointer, weight::bm25_tf};

/// Per-term counters and the head of the term's block chain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TermStat {
    pub df: u32,
    pub cf: u64,
    pub max_tf: u32,
    /// Length of the document `max_tf` was seen in.
    pub max_tf_doc_len: u32,
    pub head: Pointer,
}

/// Document lengths keyed by doc id; unknown ids have length 0. Doc ids may
/// be sparse anywhere in the `u32` range.
#[derive(Default)]
pub struct DocLenTable {
    lens: HashMap<u32, u32>,
    last_docid: Option<u32>,
}

impl DocLenTable {
    pub fn set(&mut self, docid: u32, len: u32) {
        self.lens.insert(docid, len);
        self.last_docid = self.last_docid.max(Some(docid));
    }

    pub fn get(&self, docid: u32) -> u32 {
        self.lens.get(&docid).copied().unwrap_or(0)
    }

    /// Highest doc id with a recorded length.
    pub fn last_docid(&self) -> Option<u32> {
        self.last_docid
    }

    pub fn len(&self) -> usize {
        self.lens.len()
    }

    fn save(&self, writer: &mut impl Write) -> std::io::Result<()> {
        let mut entries: Vec<(u32, u32)> = self.lens.iter().map(|(&d, &l)| (d, l)).collect();
        entries.sort_unstable();
        writer.write_u32::<LittleEndian>(entries.len() as u32)?;
        for (docid, len) in entries {
            writer.write_u32::<LittleEndian>(docid)?;
            writer.write_u32::<LittleEndian>(len)?;
        }
        Ok(())
    }

    fn load(reader: &mut impl Read) -> std::io::Result<Self> {
        let count = reader.read_u32::<LittleEndian>()?;
        let mut table = Self::default();
        for _ in 0..count {
            let docid = reader.read_u32::<LittleEndian>()?;
            let len = reader.read_u32::<LittleEndian>()?;
            if table.lens.insert(docid, len).is_some() {
                return Err(invalid_data(format!("duplicate length for document {}", docid)));
            }
            table.last_docid = table.last_docid.max(Some(docid));
        }
        Ok(table)
    }
}

/// Term statistics plus the corpus-wide counters scoring depends on.
#[derive(Default)]
pub struct Pointers {
    terms: Vec<TermStat>,
    pub doc_len: DocLenTable,
    total_docs: u32,
    total_doc_len: u64,
}

impl Pointers {
    pub fn new() -> Self {
        Self::default()
    }

    fn stat_mut(&mut self, term_id: u32) -> &mut TermStat {
        let index = term_id as usize;
        if index >= self.terms.len() {
            self.terms.resize(index + 1, TermStat::default());
        }
        &mut self.terms[index]
    }

    pub fn stat(&self, term_id: u32) -> TermStat {
        self.terms
            .get(term_id as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn df(&self, term_id: u32) -> u32 {
        self.stat(term_id).df
    }

    pub fn increment_df(&mut self, term_id: u32) -> u32 {
        let stat = self.stat_mut(term_id);
        stat.df += 1;
        stat.df
    }

    pub fn cf(&self, term_id: u32) -> u64 {
        self.stat(term_id).cf
    }

    pub fn increment_cf(&mut self, term_id: u32) {
        self.stat_mut(term_id).cf += 1;
    }

    /// `(max_tf, doc_len)` of the document with the highest BM25 tf component.
    pub fn max_tf(&self, term_id: u32) -> (u32, u32) {
        let stat = self.stat(term_id);
        (stat.max_tf, stat.max_tf_doc_len)
    }

    /// Replaces the max tf when `tf` in a document of `doc_len` terms has a
    /// strictly higher BM25 tf component at the current average length.
    pub fn set_max_tf(&mut self, term_id: u32, tf: u32, doc_len: u32) -> bool {
        let avgdl = self.avg_doc_len();
        let stat = self.stat_mut(term_id);
        if bm25_tf(tf, doc_len, avgdl) > bm25_tf(stat.max_tf, stat.max_tf_doc_len, avgdl) {
            stat.max_tf = tf;
            stat.max_tf_doc_len = doc_len;
            true
        } else {
            false
        }
    }

    pub fn head(&self, term_id: u32) -> Pointer {
        self.stat(term_id).head
    }

    pub fn set_head(&mut self, term_id: u32, head: Pointer) {
        self.stat_mut(term_id).head = head;
    }

    /// Records a new document of `len` terms.
    pub fn add_doc(&mut self, docid: u32, len: u32) {
        self.doc_len.set(docid, len);
        self.total_docs += 1;
        self.total_doc_len += len as u64;
    }

    pub fn total_docs(&self) -> u32 {
        self.total_docs
    }

    pub fn total_doc_len(&self) -> u64 {
        self.total_doc_len
    }

    pub fn avg_doc_len(&self) -> f32 {
        if self.total_docs == 0 {
            return 0.0;
        }
        self.total_doc_len as f32 / self.total_docs as f32
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn save(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.terms.len() as u32)?;
        for stat in &self.terms {
            writer.write_u32::<LittleEndian>(stat.df)?;
            writer.write_u64::<LittleEndian>(stat.cf)?;
            writer.write_u32::<LittleEndian>(stat.max_tf)?;
            writer.write_u32::<LittleEndian>(stat.max_tf_doc_len)?;
            writer.write_u64::<LittleEndian>(stat.head.to_raw())?;
        }
        writer.write_u32::<LittleEndian>(self.total_docs)?;
        writer.write_u64::<LittleEndian>(self.total_doc_len)?;
        self.doc_len.save(writer)
    }

    pub fn load(reader: &mut impl Read) -> std::io::Result<Self> {
        let term_count = reader.read_u32::<LittleEndian>()?;
        let mut terms = Vec::new();
        for _ in 0..term_count {
            terms.push(TermStat {
                df: reader.read_u32::<LittleEndian>()?,
                cf: reader.read_u64::<LittleEndian>()?,
                max_tf: reader.read_u32::<LittleEndian>()?,
                max_tf_doc_len: reader.read_u32::<LittleEndian>()?,
                head: Pointer::from_raw(reader.read_u64::<LittleEndian>()?),
            });
        }
        let total_docs = reader.read_u32::<LittleEndian>()?;
        let total_doc_len = reader.read_u64::<LittleEndian>()?;
        let doc_len = DocLenTable::load(reader)?;
        if doc_len.len() != total_docs as usize {
            return Err(invalid_data(format!(
                "{} document lengths for {} documents",
                doc_len.len(),
                total_docs
            )));
        }
        Ok(Self {
            terms,
            doc_len,
            total_docs,
            total_doc_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut pointers = Pointers::new();
        pointers.add_doc(1, 4);
        pointers.add_doc(3, 2);
        assert_eq!(pointers.total_docs(), 2);
        assert_eq!(pointers.avg_doc_len(), 3.0);
        assert_eq!(pointers.doc_len.get(3), 2);
        assert_eq!(pointers.doc_len.get(2), 0);
        assert_eq!(pointers.doc_len.get(100), 0);
        assert_eq!(pointers.doc_len.last_docid(), Some(3));
        assert_eq!(DocLenTable::default().last_docid(), None);

        assert_eq!(pointers.increment_df(5), 1);
        pointers.increment_cf(5);
        pointers.increment_cf(5);
        assert_eq!(pointers.df(5), 1);
        assert_eq!(pointers.cf(5), 2);
        assert_eq!(pointers.df(4), 0);
        assert!(!pointers.head(5).is_defined());
    }

    #[test]
    fn test_max_tf_keeps_best_bm25_component() {
        let mut pointers = Pointers::new();
        pointers.add_doc(1, 10);
        assert!(pointers.set_max_tf(0, 2, 10));
        // same tf in a longer document scores lower
        assert!(!pointers.set_max_tf(0, 2, 40));
        assert!(pointers.set_max_tf(0, 2, 4));
        assert_eq!(pointers.max_tf(0), (2, 4));
    }

    #[test]
    fn test_save_load() {
        let mut pointers = Pointers::new();
        pointers.add_doc(7, 3);
        pointers.increment_df(2);
        pointers.increment_cf(2);
        pointers.set_head(2, Pointer::new(1, 64));
        let mut buf = Vec::new();
        pointers.save(&mut buf).unwrap();
        let loaded = Pointers::load(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded.stat(2), pointers.stat(2));
        assert_eq!(loaded.total_docs(), 1);
        assert_eq!(loaded.total_doc_len(), 3);
        assert_eq!(loaded.doc_len.get(7), 3);
        assert!(Pointers::load(&mut &buf[..buf.len() - 1]).is_err());
    }

    #[test]
    fn test_sparse_doc_ids() {
        let mut pointers = Pointers::new();
        pointers.add_doc(3, 5);
        pointers.add_doc(u32::MAX - 1, 2);
        pointers.add_doc(u32::MAX, 7);
        assert_eq!(pointers.doc_len.len(), 3);
        assert_eq!(pointers.doc_len.get(u32::MAX), 7);
        assert_eq!(pointers.doc_len.get(1 << 31), 0);
        assert_eq!(pointers.doc_len.last_docid(), Some(u32::MAX));

        let mut buf = Vec::new();
        pointers.save(&mut buf).unwrap();
        // three (doc id, length) pairs, not a table spanning the id range
        assert!(buf.len() < 64);
        let loaded = Pointers::load(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded.doc_len.get(u32::MAX - 1), 2);
        assert_eq!(loaded.doc_len.last_docid(), Some(u32::MAX));
    }
}
