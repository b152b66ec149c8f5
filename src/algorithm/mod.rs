pub mod block_encode;
mod block_wand;
pub mod bloom;
mod cursor;
mod svs;
mod wand;

pub use block_encode::{BlockDecode, BlockDecodeTrait, BlockEncode, BlockEncodeTrait};
pub use block_wand::{bwand_and, bwand_or};
pub use cursor::BlockCursor;
pub use svs::svs;
pub use wand::wand;

use serde::{Deserialize, Serialize};

use crate::{filter::DocFilter, pointer::Pointer, utils::topk_computer::TopKComputer, weight::Bm25Weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Block-max WAND over the union, scored by summed idf bounds.
    BwandOr,
    /// Block-max WAND over the intersection, unscored.
    BwandAnd,
    /// WAND scored with BM25 over stored term frequencies.
    Wand,
    /// WAND scored by summed idf bounds.
    Mbwand,
    /// Set-versus-set intersection.
    Svs,
}

/// One resolved query term.
#[derive(Debug, Clone, Copy)]
pub struct QueryTerm {
    pub head: Pointer,
    pub df: u32,
    pub query_weight: f32,
    pub weight: Bm25Weight,
    /// Upper bound on the term's contribution to any document score.
    pub max_score: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub docids: Vec<u32>,
    /// Empty for algorithms that do not score.
    pub scores: Vec<f32>,
}

impl SearchResult {
    pub fn len(&self) -> usize {
        self.docids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docids.is_empty()
    }
}

impl From<TopKComputer> for SearchResult {
    fn from(computer: TopKComputer) -> Self {
        let (scores, docids) = computer.into_sorted_vec().into_iter().unzip();
        Self { docids, scores }
    }
}

#[inline]
fn is_excluded(filter: Option<&dyn DocFilter>, docid: u32) -> bool {
    filter.is_some_and(|filter| filter.test(docid))
}
