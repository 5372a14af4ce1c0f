use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};
use uuid::Uuid;

use skillpath_common::vector::{dot, normalize};
use skillpath_common::SimilarityEdge;

use crate::traits::{ContentGraph, VectorStore};

/// Keeps `SIMILAR_TO` edges current as content arrives.
///
/// Each call compares only the new items against the corpus, so an insert
/// costs O(new × corpus) rather than a full pairwise rebuild. Edges are
/// written in both directions with the same score and are never removed.
pub struct SimilarityMaintainer {
    vectors: Arc<dyn VectorStore>,
    graph: Arc<dyn ContentGraph>,
    threshold: f64,
}

impl SimilarityMaintainer {
    pub fn new(vectors: Arc<dyn VectorStore>, graph: Arc<dyn ContentGraph>, threshold: f64) -> Self {
        Self {
            vectors,
            graph,
            threshold,
        }
    }

    /// Link `new_ids` to every item at or above the threshold. Returns the
    /// number of edges merged (both directions counted).
    pub async fn update_for_new_items(&self, new_ids: &[Uuid]) -> Result<u64> {
        if new_ids.is_empty() {
            return Ok(0);
        }
        let corpus = self.vectors.all_embeddings().await?;
        let new_set: HashSet<Uuid> = new_ids.iter().copied().collect();
        let edges = compute_edges(&corpus, &new_set, self.threshold);
        debug!(
            new_items = new_set.len(),
            corpus = corpus.len(),
            edges = edges.len(),
            "Computed similarity edges"
        );
        if edges.is_empty() {
            return Ok(0);
        }
        let merged = self.graph.merge_similarity_edges(&edges).await?;
        info!(new_items = new_set.len(), merged, "Similarity graph updated");
        Ok(merged)
    }

    /// Recompute edges for the entire corpus. Existing edges are rescored in
    /// place; pairs that dropped below the threshold keep their old edge.
    pub async fn rebuild(&self) -> Result<u64> {
        let corpus = self.vectors.all_embeddings().await?;
        let all: HashSet<Uuid> = corpus.iter().map(|(id, _)| *id).collect();
        let edges = compute_edges(&corpus, &all, self.threshold);
        if edges.is_empty() {
            return Ok(0);
        }
        let merged = self.graph.merge_similarity_edges(&edges).await?;
        info!(items = all.len(), merged, "Similarity graph rebuilt");
        Ok(merged)
    }
}

/// Edges between each item of `new_ids` and every other corpus item whose
/// cosine similarity is at least `threshold`.
///
/// Vectors are normalized here, so the corpus may hold raw embeddings.
/// Zero vectors and vectors whose length differs from the new item's are
/// skipped. Output is deterministic: sorted by (from, to).
pub fn compute_edges(
    corpus: &[(Uuid, Vec<f32>)],
    new_ids: &HashSet<Uuid>,
    threshold: f64,
) -> Vec<SimilarityEdge> {
    let normalized: Vec<(Uuid, Vec<f32>)> = corpus
        .iter()
        .filter(|(_, v)| v.iter().any(|x| *x != 0.0))
        .map(|(id, v)| (*id, normalize(v)))
        .collect();

    let mut edges: BTreeMap<(Uuid, Uuid), f64> = BTreeMap::new();
    for (id, v) in normalized.iter().filter(|(id, _)| new_ids.contains(id)) {
        for (other, w) in &normalized {
            if other == id || w.len() != v.len() {
                continue;
            }
            let score = dot(v, w);
            if score >= threshold {
                edges.insert((*id, *other), score);
                edges.insert((*other, *id), score);
            }
        }
    }

    edges
        .into_iter()
        .map(|((from, to), score)| SimilarityEdge { from, to, score })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillpath_common::vector::cosine_similarity;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    /// Unit vector in the plane at cosine `c` from the x axis.
    fn at_cosine(c: f32) -> Vec<f32> {
        vec![c, (1.0 - c * c).sqrt(), 0.0]
    }

    #[test]
    fn pair_at_point_nine_links_both_directions() {
        let corpus = vec![(id(1), vec![1.0, 0.0, 0.0]), (id(2), at_cosine(0.9))];
        let edges = compute_edges(&corpus, &HashSet::from([id(2)]), 0.70);
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].from, edges[0].to), (id(1), id(2)));
        assert_eq!((edges[1].from, edges[1].to), (id(2), id(1)));
        for e in edges {
            assert!((e.score - 0.9).abs() < 1e-5);
        }
    }

    #[test]
    fn edges_exist_exactly_for_pairs_at_or_above_threshold() {
        let corpus: Vec<(Uuid, Vec<f32>)> = [1.0, 0.95, 0.8, 0.71, 0.5, 0.1, -0.6]
            .iter()
            .enumerate()
            .map(|(i, c)| (id(i as u128 + 1), at_cosine(*c)))
            .collect();
        let new_ids: HashSet<Uuid> = [id(3), id(6)].into();
        let threshold = 0.70;
        let edges = compute_edges(&corpus, &new_ids, threshold);

        for (a, va) in &corpus {
            for (b, vb) in &corpus {
                if a == b || !(new_ids.contains(a) || new_ids.contains(b)) {
                    continue;
                }
                let sim = cosine_similarity(va, vb);
                let present = edges.iter().any(|e| e.from == *a && e.to == *b);
                assert_eq!(present, sim >= threshold, "{a} -> {b} sim {sim}");
            }
        }
    }

    #[test]
    fn old_pairs_are_not_recomputed() {
        let corpus = vec![
            (id(1), vec![1.0, 0.0]),
            (id(2), vec![1.0, 0.0]),
            (id(3), vec![0.0, 1.0]),
        ];
        let edges = compute_edges(&corpus, &HashSet::from([id(3)]), 0.7);
        assert!(edges.is_empty());
    }

    #[test]
    fn same_batch_items_link_to_each_other() {
        let corpus = vec![(id(1), vec![0.0, 2.0]), (id(2), vec![0.0, 3.0])];
        let edges = compute_edges(&corpus, &HashSet::from([id(1), id(2)]), 0.7);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn skips_zero_vectors_and_dimension_mismatch() {
        let corpus = vec![
            (id(1), vec![0.0, 0.0]),
            (id(2), vec![1.0, 0.0]),
            (id(3), vec![1.0, 0.0, 0.0]),
        ];
        let edges = compute_edges(&corpus, &HashSet::from([id(1), id(2)]), 0.5);
        assert!(edges.is_empty());
    }

    #[test]
    fn recomputation_is_deterministic() {
        let corpus = vec![
            (id(1), vec![1.0, 0.1]),
            (id(2), vec![1.0, 0.2]),
            (id(3), vec![0.9, 0.3]),
        ];
        let new_ids = HashSet::from([id(2), id(3)]);
        assert_eq!(
            compute_edges(&corpus, &new_ids, 0.7),
            compute_edges(&corpus, &new_ids, 0.7)
        );
    }
}
