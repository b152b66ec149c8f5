use super::{is_excluded, BlockCursor, QueryTerm};
use crate::{
    filter::DocFilter, options::DocOrder, pointers::DocLenTable, segment::BlockReader,
    utils::topk_computer::TopKComputer, weight::Bm25Weight,
};

struct WandScorer {
    cursor: BlockCursor,
    weight: Bm25Weight,
    max_score: f32,
}

/// Document-at-a-time WAND. With `with_tf` a pivot is scored by BM25 over the
/// stored term frequencies; without it by the sum of the matching terms'
/// bounds.
pub fn wand(
    reader: &mut BlockReader,
    terms: &[QueryTerm],
    doc_len: &DocLenTable,
    filter: Option<&dyn DocFilter>,
    with_tf: bool,
    computer: &mut TopKComputer,
) {
    let order = reader.order();
    let mut scorers: Vec<WandScorer> = terms
        .iter()
        .map(|term| WandScorer {
            cursor: BlockCursor::new(reader, term.head, with_tf),
            weight: term.weight,
            max_score: term.max_score,
        })
        .collect();
    retain_and_sort(&mut scorers, order);

    // with one bound-scored term every document ties, so a full heap is final
    let single_bound = !with_tf && terms.len() == 1;
    let mut threshold = 0.0;
    while let Some((before_pivot_len, pivot_len, pivot_doc)) = find_pivot_doc(&scorers, threshold)
    {
        if scorers[0].cursor.doc() != pivot_doc {
            for scorer in &mut scorers[..before_pivot_len] {
                scorer.cursor.gallop_to(reader, pivot_doc);
            }
            retain_and_sort(&mut scorers, order);
            continue;
        }

        if !is_excluded(filter, pivot_doc) {
            let score: f32 = if with_tf {
                let len = doc_len.get(pivot_doc);
                scorers[..pivot_len]
                    .iter()
                    .map(|scorer| scorer.weight.score(len, scorer.cursor.tf()))
                    .sum()
            } else {
                scorers[..pivot_len].iter().map(|s| s.max_score).sum()
            };
            if score > threshold {
                computer.push(score, pivot_doc);
                if computer.is_full() {
                    if single_bound {
                        break;
                    }
                    threshold = computer.threshold();
                }
            }
        }

        advance_all_scorers_on_pivot(&mut scorers, reader, pivot_len, order);
    }
}

fn find_pivot_doc(scorers: &[WandScorer], threshold: f32) -> Option<(usize, usize, u32)> {
    let mut upper_bound = 0.0;
    let before_pivot_len = scorers.iter().position(|scorer| {
        upper_bound += scorer.max_score;
        upper_bound > threshold
    })?;
    let pivot_doc = scorers[before_pivot_len].cursor.doc();
    let mut pivot_len = before_pivot_len + 1;
    pivot_len += scorers[pivot_len..]
        .iter()
        .take_while(|scorer| scorer.cursor.doc() == pivot_doc)
        .count();
    Some((before_pivot_len, pivot_len, pivot_doc))
}

fn advance_all_scorers_on_pivot(
    scorers: &mut Vec<WandScorer>,
    reader: &mut BlockReader,
    pivot_len: usize,
    order: DocOrder,
) {
    for scorer in &mut scorers[..pivot_len] {
        scorer.cursor.advance(reader);
    }
    retain_and_sort(scorers, order);
}

fn retain_and_sort(scorers: &mut Vec<WandScorer>, order: DocOrder) {
    scorers.retain(|scorer| !scorer.cursor.is_exhausted());
    scorers.sort_unstable_by(|a, b| order.cmp(a.cursor.doc(), b.cursor.doc()));
}
