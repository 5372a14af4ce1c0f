//! Personalized recommendations.
//!
//! 1. Users without reads (or asking for it) get cold start.
//! 2. Candidates come from three independent graph reads (similarity
//!    neighbors, topic matches, rated items), merged by id.
//! 3. Each candidate gets a weighted sum of four [0,1] components.
//! 4. With more than `2 * limit` candidates, MMR orders a `2 * limit`
//!    pool of embedded candidates and the first `limit` picks are kept.
//!    Candidates without an embedding are never dropped by this step.
//! 5. Sort by score, truncate, explain.

pub mod candidates;
pub mod cold_start;
pub mod diversity;
pub mod explain;
pub mod scoring;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use skillpath_common::config::RankingTuning;
use skillpath_common::error::Result;
use skillpath_common::{ComponentScores, RankedItem, SkillpathError, Strategy};

use crate::traits::{ContentGraph, VectorStore};

use self::candidates::Candidate;
use self::scoring::Weights;

#[derive(Debug, Clone, TypedBuilder)]
pub struct RecommendRequest {
    #[builder(setter(into))]
    pub user_id: String,
    #[builder(default = 10)]
    pub limit: usize,
    #[builder(default = Strategy::Personalized)]
    pub strategy: Strategy,
    #[builder(default = true)]
    pub apply_diversity: bool,
    #[builder(default = true)]
    pub include_explanations: bool,
}

pub struct RankingEngine {
    graph: Arc<dyn ContentGraph>,
    vectors: Arc<dyn VectorStore>,
    tuning: RankingTuning,
    weights: Weights,
}

impl RankingEngine {
    pub fn new(graph: Arc<dyn ContentGraph>, vectors: Arc<dyn VectorStore>, tuning: RankingTuning) -> Self {
        let weights = Weights::from_tuning(&tuning);
        Self {
            graph,
            vectors,
            tuning,
            weights,
        }
    }

    pub async fn recommend(&self, req: &RecommendRequest) -> Result<Vec<RankedItem>> {
        let user_id = req.user_id.trim();
        if user_id.is_empty() {
            return Err(SkillpathError::validation("user_id must not be empty"));
        }
        if req.limit == 0 {
            return Ok(Vec::new());
        }
        self.graph.ensure_user(user_id).await?;

        if req.strategy == Strategy::ColdStart {
            return self.cold_start(req.limit, req.include_explanations).await;
        }
        let reads = self.graph.read_count(user_id).await?;
        if reads == 0 {
            debug!(user_id, "No reads yet, using cold start");
            return self.cold_start(req.limit, req.include_explanations).await;
        }

        let candidates = self.gather(user_id).await;
        if candidates.is_empty() {
            info!(user_id, "No personalized candidates, falling back to cold start");
            return self.cold_start(req.limit, req.include_explanations).await;
        }

        let affinities = match self.graph.topic_affinities(user_id).await {
            Ok(a) => a,
            Err(e) => {
                warn!(user_id, error = %e, "Topic affinities unavailable");
                HashMap::new()
            }
        };

        let now = Utc::now();
        let mut scored: Vec<(Candidate, ComponentScores, f64)> = candidates
            .into_iter()
            .map(|c| {
                let components = scoring::components(&c, &affinities, &self.tuning, now);
                let score = self.weights.combine(&components);
                (c, components, score)
            })
            .collect();
        let candidate_count = scored.len();

        if req.apply_diversity && scored.len() > req.limit.saturating_mul(2) {
            scored = self.diversify(scored, req.limit).await;
        }
        scored.sort_by(|a, b| b.2.total_cmp(&a.2));
        scored.truncate(req.limit);

        info!(
            user_id,
            candidates = candidate_count,
            returned = scored.len(),
            "Personalized recommendations ready"
        );

        Ok(scored
            .into_iter()
            .map(|(c, components, score)| {
                let explanation = req
                    .include_explanations
                    .then(|| explain::personalized(&c, &components));
                RankedItem {
                    content: c.content,
                    score: round4(score),
                    strategy: Strategy::Personalized,
                    sources: c.sources.into_iter().collect(),
                    components: Some(components),
                    explanation,
                }
            })
            .collect())
    }

    /// Query the three sources concurrently. A failing source contributes nothing.
    async fn gather(&self, user_id: &str) -> Vec<Candidate> {
        let (similar, topical, rated) = futures::join!(
            self.graph.similarity_neighbors(user_id),
            self.graph.topic_matches(user_id),
            self.graph.rated_content(user_id),
        );
        let similar = similar.unwrap_or_else(|e| {
            warn!(user_id, error = %e, "Similarity candidates unavailable");
            Vec::new()
        });
        let topical = topical.unwrap_or_else(|e| {
            warn!(user_id, error = %e, "Topic candidates unavailable");
            Vec::new()
        });
        let rated = rated.unwrap_or_else(|e| {
            warn!(user_id, error = %e, "Rated candidates unavailable");
            Vec::new()
        });
        debug!(
            user_id,
            similar = similar.len(),
            topical = topical.len(),
            rated = rated.len(),
            "Gathered candidates"
        );
        candidates::merge(similar, topical, rated)
    }

    /// MMR over a `2 * limit` pool, keeping the first `limit` picks.
    /// Candidates without an embedding skip MMR and are all kept, so the
    /// caller's score sort decides whether they make the final cut.
    async fn diversify<S>(&self, scored: Vec<(Candidate, S, f64)>, limit: usize) -> Vec<(Candidate, S, f64)> {
        let ids: Vec<Uuid> = scored.iter().map(|(c, _, _)| c.content.id).collect();
        let embeddings: HashMap<Uuid, Vec<f32>> = match self.vectors.get(&ids).await {
            Ok(items) => items
                .into_iter()
                .filter(|i| !i.embedding.is_empty())
                .map(|i| (i.id, i.embedding))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Embeddings unavailable, skipping diversity filter");
                return scored;
            }
        };

        let (mut with, mut without): (Vec<_>, Vec<_>) = scored
            .into_iter()
            .partition(|(c, _, _)| embeddings.contains_key(&c.content.id));
        // Highest score first so MMR ties break toward relevance.
        with.sort_by(|a, b| b.2.total_cmp(&a.2));
        without.sort_by(|a, b| b.2.total_cmp(&a.2));

        let inputs: Vec<(f64, &[f32])> = with
            .iter()
            .filter_map(|(c, _, score)| {
                embeddings
                    .get(&c.content.id)
                    .map(|e| (*score, e.as_slice()))
            })
            .collect();
        let mut picked = diversity::mmr_select(&inputs, limit.saturating_mul(2), self.tuning.mmr_lambda);
        picked.truncate(limit);
        debug!(
            embedded = with.len(),
            unembedded = without.len(),
            picked = picked.len(),
            "Applied diversity filter"
        );

        let mut slots: Vec<Option<(Candidate, S, f64)>> = with.into_iter().map(Some).collect();
        let mut out: Vec<(Candidate, S, f64)> = picked
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect();
        out.extend(without);
        out
    }

    /// Popularity ranking for users without history.
    pub async fn cold_start(&self, limit: usize, include_explanations: bool) -> Result<Vec<RankedItem>> {
        let rows = self.graph.popularity().await?;
        let ranked = cold_start::rank(rows, self.tuning.recency_decay_days, Utc::now());
        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(row, score)| {
                let explanation = include_explanations.then(|| explain::cold_start(&row));
                RankedItem {
                    content: row.content,
                    score: round4(score),
                    strategy: Strategy::ColdStart,
                    sources: Vec::new(),
                    components: None,
                    explanation,
                }
            })
            .collect())
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
