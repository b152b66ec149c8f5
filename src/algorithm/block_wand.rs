use super::{block_encode::Block, is_excluded, QueryTerm};
use crate::{
    filter::DocFilter,
    pointer::Pointer,
    segment::{BlockReader, COMPRESSION_BLOCK_SIZE},
    utils::topk_computer::TopKComputer,
};

/// Walks the chain of `terms[0]` and scores every candidate by the bounds of
/// the terms that contain it. `terms[0]` should be the term with the lowest
/// df.
///
/// Stops early once the heap is full and its weakest score equals the sum of
/// all bounds, since no later candidate can beat it.
pub fn bwand_or(
    reader: &mut BlockReader,
    terms: &[QueryTerm],
    filter: Option<&dyn DocFilter>,
    computer: &mut TopKComputer,
) {
    let Some((driver, others)) = terms.split_first() else {
        return;
    };
    let sum_of_bounds: f32 = terms.iter().map(|t| t.max_score).sum();
    let mut heads: Vec<Pointer> = others.iter().map(|t| t.head).collect();
    let mut docids: Block = [0; COMPRESSION_BLOCK_SIZE];

    let mut pointer = driver.head;
    while pointer.is_defined() {
        let count = reader.decode_docids(pointer, &mut docids);
        for &pivot in &docids[..count] {
            if is_excluded(filter, pivot) {
                continue;
            }
            let mut score = driver.max_score;
            for (term, head) in others.iter().zip(heads.iter_mut()) {
                if reader.contains_docid(pivot, head) {
                    score += term.max_score;
                }
            }
            computer.push(score, pivot);
            if computer.is_full() && computer.threshold() == sum_of_bounds {
                return;
            }
        }
        pointer = reader.next_pointer(pointer);
    }
}

/// Doc ids of `terms[0]` contained in every other term, in traversal order.
/// `hits == 0` collects all of them.
pub fn bwand_and(
    reader: &mut BlockReader,
    terms: &[QueryTerm],
    filter: Option<&dyn DocFilter>,
    hits: usize,
) -> Vec<u32> {
    let mut results = Vec::new();
    let Some((driver, others)) = terms.split_first() else {
        return results;
    };
    let mut heads: Vec<Pointer> = others.iter().map(|t| t.head).collect();
    let mut docids: Block = [0; COMPRESSION_BLOCK_SIZE];

    let mut pointer = driver.head;
    while pointer.is_defined() {
        let count = reader.decode_docids(pointer, &mut docids);
        for &pivot in &docids[..count] {
            if heads.iter().any(|head| !head.is_defined()) {
                return results;
            }
            if is_excluded(filter, pivot) {
                continue;
            }
            if heads
                .iter_mut()
                .all(|head| reader.contains_docid(pivot, head))
            {
                results.push(pivot);
                if results.len() == hits {
                    return results;
                }
            }
        }
        pointer = reader.next_pointer(pointer);
    }
    results
}
