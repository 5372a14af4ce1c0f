use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use skillpath_common::{ContentRef, RatingHit, SignalSource, SimilarityHit, TopicHit};

/// A recommendable item together with every source that surfaced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub content: ContentRef,
    pub sources: BTreeSet<SignalSource>,
    /// Strongest `SIMILAR_TO` score reaching this item from the user's reads.
    pub similarity: Option<f64>,
    /// (average rating, rating count) across all users.
    pub rating: Option<(f64, u32)>,
}

impl Candidate {
    fn new(content: ContentRef) -> Self {
        Self {
            content,
            sources: BTreeSet::new(),
            similarity: None,
            rating: None,
        }
    }

    pub fn has(&self, source: SignalSource) -> bool {
        self.sources.contains(&source)
    }
}

/// Union the three candidate sources by content id, keeping provenance.
/// Output order follows first appearance: similarity, then topic, then rating.
pub fn merge(
    similar: Vec<SimilarityHit>,
    topical: Vec<TopicHit>,
    rated: Vec<RatingHit>,
) -> Vec<Candidate> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_id: HashMap<Uuid, Candidate> = HashMap::new();

    let mut entry = |content: ContentRef| -> Uuid {
        let id = content.id;
        by_id.entry(id).or_insert_with(|| {
            order.push(id);
            Candidate::new(content)
        });
        id
    };

    let mut similar_ids = Vec::with_capacity(similar.len());
    for hit in similar {
        similar_ids.push((entry(hit.content), hit.score));
    }
    let topical_ids: Vec<Uuid> = topical.into_iter().map(|hit| entry(hit.content)).collect();
    let mut rated_ids = Vec::with_capacity(rated.len());
    for hit in rated {
        rated_ids.push((entry(hit.content), hit.avg_rating, hit.rating_count));
    }

    for (id, score) in similar_ids {
        if let Some(c) = by_id.get_mut(&id) {
            c.sources.insert(SignalSource::Similarity);
            c.similarity = Some(c.similarity.map_or(score, |s| s.max(score)));
        }
    }
    for id in topical_ids {
        if let Some(c) = by_id.get_mut(&id) {
            c.sources.insert(SignalSource::Topic);
        }
    }
    for (id, avg, count) in rated_ids {
        if let Some(c) = by_id.get_mut(&id) {
            c.sources.insert(SignalSource::Rating);
            c.rating = Some((avg, count));
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}
