//! Maximal marginal relevance selection
//!
//! Re-selects `top_k` documents from a candidate pool, trading query
//! relevance against redundancy with documents already picked:
//! `lambda * sim(query, d) - (1 - lambda) * max sim(d, selected)`.

use crate::store::ScoredDocument;
use crate::types::Document;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Greedy MMR selection over candidates carrying stored vectors.
///
/// Candidates without a vector cannot be compared and are dropped from
/// the pool. `lambda` of 1.0 degenerates to pure relevance order.
pub fn mmr_select(
    query: &[f32],
    candidates: &[ScoredDocument],
    top_k: usize,
    lambda: f32,
) -> Vec<Document> {
    let pool: Vec<(&Document, &[f32], f32)> = candidates
        .iter()
        .filter_map(|c| {
            c.vector
                .as_deref()
                .map(|v| (&c.document, v, cosine_similarity(query, v)))
        })
        .collect();

    let mut selected: Vec<usize> = Vec::new();

    while selected.len() < top_k.min(pool.len()) {
        let mut best: Option<(usize, f32)> = None;

        for (i, (_, vector, query_sim)) in pool.iter().enumerate() {
            if selected.contains(&i) {
                continue;
            }

            let redundancy = if selected.is_empty() {
                0.0
            } else {
                selected
                    .iter()
                    .map(|&j| cosine_similarity(vector, pool[j].1))
                    .fold(f32::NEG_INFINITY, f32::max)
            };

            let score = lambda * query_sim - (1.0 - lambda) * redundancy;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }

        match best {
            Some((i, _)) => selected.push(i),
            None => break,
        }
    }

    selected
        .into_iter()
        .map(|i| pool[i].0.clone())
        .collect()
}
