const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Query-time BM25 weight of one term: query weight and idf folded together,
/// leaving the per-document tf and length to `score`.
#[derive(Clone, Copy, Debug)]
pub struct Bm25Weight {
    weight: f32, // query weight * idf
    avgdl: f32,
}

impl Bm25Weight {
    pub fn new(query_weight: f32, idf: f32, avgdl: f32) -> Self {
        Self {
            weight: query_weight * idf,
            avgdl,
        }
    }

    #[inline]
    pub fn score(&self, len: u32, tf: u32) -> f32 {
        self.weight * bm25_tf(tf, len, self.avgdl)
    }

    /// Bound used by the block-max algorithms, which never look at tfs.
    pub fn idf_bound(&self) -> f32 {
        self.weight
    }
}

// ln ( 1 + (N - n(q) + 0.5) / (n(q) + 0.5) )
#[inline]
pub fn idf(doc_cnt: u32, doc_freq: u32) -> f32 {
    let n = doc_freq as f32;
    (1.0 + (doc_cnt as f32 - n + 0.5) / (n + 0.5)).ln()
}

/// The tf component of BM25 for a document of `len` terms.
#[inline]
pub fn bm25_tf(tf: u32, len: u32, avgdl: f32) -> f32 {
    let tf = tf as f32;
    tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * len as f32 / avgdl))
}

#[inline]
pub fn bm25(tf: u32, doc_freq: u32, doc_cnt: u32, len: u32, avgdl: f32) -> f32 {
    idf(doc_cnt, doc_freq) * bm25_tf(tf, len, avgdl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf() {
        assert!(idf(100, 1) > idf(100, 50));
        assert!(idf(100, 100) > 0.0);
        let expected = (1.0f32 + 90.5 / 10.5).ln();
        assert!((idf(100, 10) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_bm25_tf() {
        // at average length, tf = 1 gives exactly 1
        assert!((bm25_tf(1, 10, 10.0) - 1.0).abs() < 1e-6);
        assert!(bm25_tf(5, 10, 10.0) > bm25_tf(1, 10, 10.0));
        assert!(bm25_tf(1, 5, 10.0) > bm25_tf(1, 20, 10.0));
        assert!(bm25_tf(1_000_000, 10, 10.0) < K1 + 1.0);
    }

    #[test]
    fn test_weight() {
        let weight = Bm25Weight::new(2.0, idf(50, 5), 8.0);
        let expected = 2.0 * bm25(3, 5, 50, 6, 8.0);
        assert!((weight.score(6, 3) - expected).abs() < 1e-5);
        assert!((weight.idf_bound() - 2.0 * idf(50, 5)).abs() < 1e-6);
    }
}
