// Collaborator seams for the generation and recommendation core.
//
// TextGenerator / JudgeBackend / TextEmbedder: model calls.
// WebSearcher: reference context for the SEARCH step.
// VectorStore / ContentGraph: the two persistence backends.
//
// Production implementations sit next to each trait (OpenAi) or under
// `infra/` (stores, search). `testing.rs` holds deterministic in-memory fakes.

use std::collections::HashMap;

use ai_client::{CompletionOptions, OpenAi};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skillpath_common::{
    ContentItem, ContentRef, GraphStats, HistoryEntry, NearestHit, PopularityRow, RatingHit,
    SamplingParams, SimilarityEdge, SimilarityHit, TopicHit, VectorFilter,
};

// ---------------------------------------------------------------------------
// Model calls
// ---------------------------------------------------------------------------

const GENERATOR_SYSTEM_PROMPT: &str =
    "You are an expert educational writer producing accurate, well-structured learning material.";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String>;
}

#[async_trait]
pub trait JudgeBackend: Send + Sync {
    /// Expected to return a JSON body; callers validate it.
    async fn judge(&self, prompt: &str, system_prompt: &str, params: &SamplingParams) -> Result<String>;
}

#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

fn completion_options(params: &SamplingParams) -> CompletionOptions {
    CompletionOptions {
        temperature: params.temperature,
        max_tokens: params.max_tokens,
        top_p: params.top_p,
    }
}

#[async_trait]
impl TextGenerator for OpenAi {
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
        self.complete_with(GENERATOR_SYSTEM_PROMPT, prompt, completion_options(params))
            .await
    }
}

#[async_trait]
impl JudgeBackend for OpenAi {
    async fn judge(&self, prompt: &str, system_prompt: &str, params: &SamplingParams) -> Result<String> {
        self.complete_with(system_prompt, prompt, completion_options(params))
            .await
    }
}

#[async_trait]
impl TextEmbedder for OpenAi {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.create_embedding(text).await
    }
}

// ---------------------------------------------------------------------------
// WebSearcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

// ---------------------------------------------------------------------------
// VectorStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn insert(&self, item: &ContentItem) -> Result<()>;

    /// `k` nearest items by cosine distance.
    async fn query_nearest(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<NearestHit>>;

    async fn get(&self, ids: &[Uuid]) -> Result<Vec<ContentItem>>;
    async fn get_by_filter(&self, filter: &VectorFilter) -> Result<Vec<ContentItem>>;

    /// The whole corpus as (id, raw embedding) pairs.
    async fn all_embeddings(&self) -> Result<Vec<(Uuid, Vec<f32>)>>;

    async fn delete(&self, ids: &[Uuid]) -> Result<u64>;
    async fn count(&self) -> Result<u64>;

    /// Distinct topics, sorted.
    async fn topics(&self) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// ContentGraph
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ContentGraph: Send + Sync {
    // --- Writes ---

    async fn upsert_content(&self, item: &ContentItem) -> Result<()>;
    async fn delete_content(&self, id: Uuid) -> Result<bool>;

    /// Merge edges, overwriting scores. Returns the number of edges merged.
    async fn merge_similarity_edges(&self, edges: &[SimilarityEdge]) -> Result<u64>;

    async fn ensure_user(&self, user_id: &str) -> Result<()>;
    /// Record a read and add 1 to the user's affinity for the content's
    /// topic, as one write.
    async fn record_read(&self, user_id: &str, content_id: Uuid) -> Result<()>;
    async fn record_rating(&self, user_id: &str, content_id: Uuid, score: u8) -> Result<()>;
    async fn record_bookmark(&self, user_id: &str, content_id: Uuid) -> Result<()>;

    // --- Reads ---

    async fn content(&self, id: Uuid) -> Result<Option<ContentRef>>;
    async fn read_count(&self, user_id: &str) -> Result<u64>;

    /// Unread items reachable by SIMILAR_TO from the user's reads.
    async fn similarity_neighbors(&self, user_id: &str) -> Result<Vec<SimilarityHit>>;
    /// Unread items sharing a topic with the user's reads.
    async fn topic_matches(&self, user_id: &str) -> Result<Vec<TopicHit>>;
    /// Unread items with any rating.
    async fn rated_content(&self, user_id: &str) -> Result<Vec<RatingHit>>;

    async fn topic_affinities(&self, user_id: &str) -> Result<HashMap<String, f64>>;
    async fn popularity(&self) -> Result<Vec<PopularityRow>>;
    async fn read_history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;
    async fn stats(&self) -> Result<GraphStats>;
}
