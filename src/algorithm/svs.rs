use std::cmp::Ordering;

use super::{is_excluded, BlockCursor, QueryTerm, SearchResult};
use crate::{filter::DocFilter, segment::BlockReader};

/// Set-versus-set intersection. Terms are expected in ascending df order: the
/// two shortest lists are intersected by galloping both cursors, then every
/// further list shrinks the running set. `hits == 0` keeps every match.
///
/// With `with_scores` each match is scored by the query-weighted sum of its
/// stored per-document scores.
pub fn svs(
    reader: &mut BlockReader,
    terms: &[QueryTerm],
    filter: Option<&dyn DocFilter>,
    hits: usize,
    with_scores: bool,
) -> SearchResult {
    let mut candidates = match terms {
        [] => return SearchResult::default(),
        [single] => copy_bounded(reader, single, filter, hits, with_scores),
        [first, second, ..] => intersect_pair(reader, first, second, filter, with_scores),
    };

    for term in terms.iter().skip(2) {
        if candidates.is_empty() {
            break;
        }
        let mut cursor = BlockCursor::new(reader, term.head, with_scores);
        candidates.retain_mut(|(docid, score)| {
            cursor.gallop_to(reader, *docid);
            if cursor.is_exhausted() || cursor.doc() != *docid {
                return false;
            }
            *score += posting_score(term, &cursor, with_scores);
            true
        });
    }

    if hits > 0 {
        candidates.truncate(hits);
    }
    let (docids, scores): (Vec<u32>, Vec<f32>) = candidates.into_iter().unzip();
    SearchResult {
        docids,
        scores: if with_scores { scores } else { Vec::new() },
    }
}

fn posting_score(term: &QueryTerm, cursor: &BlockCursor, with_scores: bool) -> f32 {
    if with_scores {
        term.query_weight * cursor.tf() as f32
    } else {
        0.0
    }
}

fn copy_bounded(
    reader: &mut BlockReader,
    term: &QueryTerm,
    filter: Option<&dyn DocFilter>,
    hits: usize,
    with_scores: bool,
) -> Vec<(u32, f32)> {
    let mut results = Vec::new();
    let mut cursor = BlockCursor::new(reader, term.head, with_scores);
    while !cursor.is_exhausted() && (hits == 0 || results.len() < hits) {
        let docid = cursor.doc();
        if !is_excluded(filter, docid) {
            results.push((docid, posting_score(term, &cursor, with_scores)));
        }
        cursor.advance(reader);
    }
    results
}

fn intersect_pair(
    reader: &mut BlockReader,
    first: &QueryTerm,
    second: &QueryTerm,
    filter: Option<&dyn DocFilter>,
    with_scores: bool,
) -> Vec<(u32, f32)> {
    let order = reader.order();
    let mut results = Vec::new();
    let mut a = BlockCursor::new(reader, first.head, with_scores);
    let mut b = BlockCursor::new(reader, second.head, with_scores);
    while !a.is_exhausted() && !b.is_exhausted() {
        match order.cmp(a.doc(), b.doc()) {
            Ordering::Less => a.gallop_to(reader, b.doc()),
            Ordering::Greater => b.gallop_to(reader, a.doc()),
            Ordering::Equal => {
                let docid = a.doc();
                if !is_excluded(filter, docid) {
                    let score = posting_score(first, &a, with_scores)
                        + posting_score(second, &b, with_scores);
                    results.push((docid, score));
                }
                a.advance(reader);
                b.advance(reader);
            }
        }
    }
    results
}
