// Test doubles for the generation and recommendation core.
//
// One fake per trait boundary:
// - ScriptedGenerator (TextGenerator): canned article/summary/topic text, records prompts
// - ScriptedJudge (JudgeBackend): fixed scores or a raw body, counts calls
// - FixedEmbedder (TextEmbedder): registered vectors, hash-based otherwise
// - MockSearcher (WebSearcher): fixed results or failure
// - MemoryVectorStore (VectorStore) and MemoryGraph (ContentGraph): stateful in-memory stores
//
// Plus `TestHarness`, which wires them into the real components.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use skillpath_common::config::Tuning;
use skillpath_common::vector::cosine_similarity;
use skillpath_common::{
    ContentItem, ContentRef, GraphStats, HistoryEntry, NearestHit, PopularityRow, RatingHit,
    SamplingParams, SimilarityEdge, SimilarityHit, TopicHit, VectorFilter,
};

use crate::generation::GenerationLoop;
use crate::judge::{CooldownGate, QualityJudge};
use crate::prompts;
use crate::ranking::RankingEngine;
use crate::similarity::SimilarityMaintainer;
use crate::storage::StorageCoordinator;
use crate::traits::{
    ContentGraph, JudgeBackend, SearchResult, TextEmbedder, TextGenerator, VectorStore, WebSearcher,
};

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

/// Embedding dimension for test vectors.
pub const TEST_EMBEDDING_DIM: usize = 64;

/// Defaults with judge pacing switched off so tests don't sleep.
pub fn test_tuning() -> Tuning {
    let mut tuning = Tuning::default();
    tuning.judge.initial_delay_ms = 0;
    tuning.judge.cooldown_ms = 0;
    tuning
}

/// Unit vector along axis `i` of the test dimension.
pub fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; TEST_EMBEDDING_DIM];
    v[i % TEST_EMBEDDING_DIM] = 1.0;
    v
}

/// Unit vector at cosine `c` from `axis(i)`, rotated toward `axis(j)`.
pub fn toward(i: usize, j: usize, c: f32) -> Vec<f32> {
    let mut v = vec![0.0; TEST_EMBEDDING_DIM];
    v[i % TEST_EMBEDDING_DIM] = c;
    v[j % TEST_EMBEDDING_DIM] = (1.0 - c * c).max(0.0).sqrt();
    v
}

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

/// Answers by prompt kind. Article responses are consumed in order; the last
/// one repeats. Every prompt is recorded for inspection.
pub struct ScriptedGenerator {
    articles: Mutex<Vec<String>>,
    summary: String,
    topics: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            articles: Mutex::new(vec!["A generated article.".to_string()]),
            summary: "- Term: definition".to_string(),
            topics: String::new(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn articles(self, articles: &[&str]) -> Self {
        *self.articles.lock().unwrap() = articles.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn topics(mut self, raw: &str) -> Self {
        self.topics = raw.to_string();
        self
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn article_prompts(&self) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.starts_with("Write a professional English article"))
            .collect()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _params: &SamplingParams) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            bail!("ScriptedGenerator: generation unavailable");
        }
        if prompt.starts_with("Write a professional English article") {
            let mut articles = self.articles.lock().unwrap();
            let next = if articles.len() > 1 {
                articles.remove(0)
            } else {
                articles.first().cloned().unwrap_or_default()
            };
            return Ok(next);
        }
        if prompt.starts_with("Extract") {
            return Ok(self.summary.clone());
        }
        if prompt.starts_with("Generate exactly") {
            return Ok(self.topics.clone());
        }
        Err(anyhow!("ScriptedGenerator: unexpected prompt"))
    }
}

// ---------------------------------------------------------------------------
// ScriptedJudge
// ---------------------------------------------------------------------------

/// Judge JSON for the task-performance call.
pub fn performance_json(scores: [f64; 3]) -> String {
    serde_json::json!({
        "usefulness": {"score": scores[0], "explanation": "usefulness note", "strengths": [], "weaknesses": []},
        "factuality": {"score": scores[1], "explanation": "factuality note", "errors": []},
        "relevance": {"score": scores[2], "explanation": "relevance note", "off_topic_sections": []},
        "average_score": (scores[0] + scores[1] + scores[2]) / 3.0,
    })
    .to_string()
}

/// Judge JSON for the alignment call.
pub fn alignment_json(scores: [f64; 2]) -> String {
    serde_json::json!({
        "tone": {"score": scores[0], "explanation": "tone note", "tone_issues": []},
        "style": {"score": scores[1], "explanation": "style note", "style_issues": [], "vocabulary_level": "appropriate"},
        "average_score": (scores[0] + scores[1]) / 2.0,
    })
    .to_string()
}

enum JudgeScript {
    Scores { performance: String, alignment: String },
    Raw(String),
    Fail,
}

pub struct ScriptedJudge {
    script: JudgeScript,
    calls: AtomicUsize,
}

impl ScriptedJudge {
    /// Every criterion of both groups gets `score`.
    pub fn uniform(score: f64) -> Self {
        Self::scores([score; 3], [score; 2])
    }

    pub fn scores(performance: [f64; 3], alignment: [f64; 2]) -> Self {
        Self {
            script: JudgeScript::Scores {
                performance: performance_json(performance),
                alignment: alignment_json(alignment),
            },
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `body` verbatim for both calls.
    pub fn raw(body: &str) -> Self {
        Self {
            script: JudgeScript::Raw(body.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: JudgeScript::Fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JudgeBackend for ScriptedJudge {
    async fn judge(&self, _prompt: &str, system_prompt: &str, _params: &SamplingParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            JudgeScript::Scores {
                performance,
                alignment,
            } => {
                if system_prompt == prompts::ALIGNMENT_SYSTEM_PROMPT {
                    Ok(alignment.clone())
                } else {
                    Ok(performance.clone())
                }
            }
            JudgeScript::Raw(body) => Ok(body.clone()),
            JudgeScript::Fail => bail!("ScriptedJudge: judge unavailable"),
        }
    }
}

// ---------------------------------------------------------------------------
// FixedEmbedder
// ---------------------------------------------------------------------------

/// Deterministic embedder. Registered texts get exact vectors; anything else
/// gets a hash-based unit vector with low similarity to everything.
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dimension,
        }
    }

    pub fn on_text(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.hash_vector(text))
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut vec = vec![0.0f32; self.dimension];
        for v in vec.iter_mut() {
            // LCG
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *v = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
        }
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vec.iter_mut() {
                *v /= norm;
            }
        }
        vec
    }
}

#[async_trait]
impl TextEmbedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

pub struct MockSearcher {
    results: Vec<SearchResult>,
    fail: bool,
}

impl MockSearcher {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            fail: false,
        }
    }

    pub fn with_context(content: &str) -> Self {
        Self {
            results: vec![SearchResult {
                url: "https://example.org/reference".to_string(),
                title: "Reference".to_string(),
                content: content.to_string(),
            }],
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        if self.fail {
            bail!("MockSearcher: search unavailable");
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryVectorStore
// ---------------------------------------------------------------------------

/// In-memory vector store keeping insertion order.
pub struct MemoryVectorStore {
    items: Mutex<Vec<ContentItem>>,
    fail_inserts: bool,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            fail_inserts: false,
        }
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn items(&self) -> Vec<ContentItem> {
        self.items.lock().unwrap().clone()
    }

    /// Seed an item directly, bypassing the coordinator.
    pub fn put(&self, item: ContentItem) {
        self.items.lock().unwrap().push(item);
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert(&self, item: &ContentItem) -> Result<()> {
        if self.fail_inserts {
            bail!("MemoryVectorStore: insert rejected");
        }
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|i| i.id == item.id) {
            bail!("MemoryVectorStore: duplicate id {}", item.id);
        }
        items.push(item.clone());
        Ok(())
    }

    async fn query_nearest(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<NearestHit>> {
        let items = self.items.lock().unwrap();
        let mut hits: Vec<NearestHit> = items
            .iter()
            .filter(|i| filter.map_or(true, |f| f.matches(i)))
            .map(|i| NearestHit {
                id: i.id,
                topic: i.topic.clone(),
                distance: 1.0 - cosine_similarity(embedding, &i.embedding),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn get(&self, ids: &[Uuid]) -> Result<Vec<ContentItem>> {
        let items = self.items.lock().unwrap();
        Ok(items.iter().filter(|i| ids.contains(&i.id)).cloned().collect())
    }

    async fn get_by_filter(&self, filter: &VectorFilter) -> Result<Vec<ContentItem>> {
        let items = self.items.lock().unwrap();
        Ok(items.iter().filter(|i| filter.matches(i)).cloned().collect())
    }

    async fn all_embeddings(&self) -> Result<Vec<(Uuid, Vec<f32>)>> {
        let items = self.items.lock().unwrap();
        Ok(items.iter().map(|i| (i.id, i.embedding.clone())).collect())
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<u64> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|i| !ids.contains(&i.id));
        Ok((before - items.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.items.lock().unwrap().len() as u64)
    }

    async fn topics(&self) -> Result<Vec<String>> {
        let items = self.items.lock().unwrap();
        let mut topics: Vec<String> = items.iter().map(|i| i.topic.clone()).collect();
        topics.sort();
        topics.dedup();
        Ok(topics)
    }
}

// ---------------------------------------------------------------------------
// MemoryGraph
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryGraphInner {
    contents: HashMap<Uuid, ContentRef>,
    users: HashSet<String>,
    /// (user, content) -> read sequence number; higher is more recent.
    reads: HashMap<(String, Uuid), u64>,
    read_seq: u64,
    ratings: HashMap<(String, Uuid), u8>,
    bookmarks: HashSet<(String, Uuid)>,
    affinities: HashMap<(String, String), f64>,
    edges: BTreeMap<(Uuid, Uuid), f64>,
    fail_upserts: bool,
    fail_reads: bool,
}

/// Stateful in-memory graph mirroring the Neo4j read and write semantics.
pub struct MemoryGraph {
    inner: Mutex<MemoryGraphInner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryGraphInner::default()),
        }
    }

    /// Make `upsert_content` fail.
    pub fn failing_upserts(self) -> Self {
        self.inner.lock().unwrap().fail_upserts = true;
        self
    }

    /// Make the three candidate-source reads fail.
    pub fn failing_candidate_reads(self) -> Self {
        self.inner.lock().unwrap().fail_reads = true;
        self
    }

    /// Seed a content node directly.
    pub fn put(&self, content: ContentRef) {
        self.inner.lock().unwrap().contents.insert(content.id, content);
    }

    pub fn edges(&self) -> Vec<SimilarityEdge> {
        self.inner
            .lock()
            .unwrap()
            .edges
            .iter()
            .map(|((from, to), score)| SimilarityEdge {
                from: *from,
                to: *to,
                score: *score,
            })
            .collect()
    }

    pub fn has_content(&self, id: Uuid) -> bool {
        self.inner.lock().unwrap().contents.contains_key(&id)
    }

    pub fn affinity(&self, user_id: &str, topic: &str) -> Option<f64> {
        self.inner
            .lock()
            .unwrap()
            .affinities
            .get(&(user_id.to_string(), topic.to_string()))
            .copied()
    }

    pub fn bookmarked(&self, user_id: &str, content_id: Uuid) -> bool {
        self.inner
            .lock()
            .unwrap()
            .bookmarks
            .contains(&(user_id.to_string(), content_id))
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraphInner {
    fn read_ids(&self, user_id: &str) -> HashSet<Uuid> {
        self.reads
            .keys()
            .filter(|(u, _)| u == user_id)
            .map(|(_, id)| *id)
            .collect()
    }

    fn rating_aggregate(&self, id: Uuid) -> Option<(f64, u32)> {
        let scores: Vec<f64> = self
            .ratings
            .iter()
            .filter(|((_, c), _)| *c == id)
            .map(|(_, s)| *s as f64)
            .collect();
        if scores.is_empty() {
            return None;
        }
        Some((scores.iter().sum::<f64>() / scores.len() as f64, scores.len() as u32))
    }

    /// Content in a stable order: newest first, then by id.
    fn sorted_contents(&self) -> Vec<&ContentRef> {
        let mut all: Vec<&ContentRef> = self.contents.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        all
    }
}

#[async_trait]
impl ContentGraph for MemoryGraph {
    async fn upsert_content(&self, item: &ContentItem) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        if g.fail_upserts {
            bail!("MemoryGraph: upsert rejected");
        }
        g.contents.entry(item.id).or_insert_with(|| item.to_ref());
        Ok(())
    }

    async fn delete_content(&self, id: Uuid) -> Result<bool> {
        let mut g = self.inner.lock().unwrap();
        let existed = g.contents.remove(&id).is_some();
        g.reads.retain(|(_, c), _| *c != id);
        g.ratings.retain(|(_, c), _| *c != id);
        g.bookmarks.retain(|(_, c)| *c != id);
        g.edges.retain(|(a, b), _| *a != id && *b != id);
        Ok(existed)
    }

    async fn merge_similarity_edges(&self, edges: &[SimilarityEdge]) -> Result<u64> {
        let mut g = self.inner.lock().unwrap();
        let mut merged = 0;
        for e in edges {
            if g.contents.contains_key(&e.from) && g.contents.contains_key(&e.to) {
                g.edges.insert((e.from, e.to), e.score);
                merged += 1;
            }
        }
        Ok(merged)
    }

    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        self.inner.lock().unwrap().users.insert(user_id.to_string());
        Ok(())
    }

    async fn record_read(&self, user_id: &str, content_id: Uuid) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        g.users.insert(user_id.to_string());
        let Some(topic) = g.contents.get(&content_id).map(|c| c.topic.clone()) else {
            return Ok(());
        };
        g.read_seq += 1;
        let seq = g.read_seq;
        g.reads.insert((user_id.to_string(), content_id), seq);
        *g.affinities.entry((user_id.to_string(), topic)).or_insert(0.0) += 1.0;
        Ok(())
    }

    async fn record_rating(&self, user_id: &str, content_id: Uuid, score: u8) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        g.users.insert(user_id.to_string());
        if g.contents.contains_key(&content_id) {
            g.ratings.insert((user_id.to_string(), content_id), score);
        }
        Ok(())
    }

    async fn record_bookmark(&self, user_id: &str, content_id: Uuid) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        g.users.insert(user_id.to_string());
        if g.contents.contains_key(&content_id) {
            g.bookmarks.insert((user_id.to_string(), content_id));
        }
        Ok(())
    }

    async fn content(&self, id: Uuid) -> Result<Option<ContentRef>> {
        Ok(self.inner.lock().unwrap().contents.get(&id).cloned())
    }

    async fn read_count(&self, user_id: &str) -> Result<u64> {
        Ok(self.inner.lock().unwrap().read_ids(user_id).len() as u64)
    }

    async fn similarity_neighbors(&self, user_id: &str) -> Result<Vec<SimilarityHit>> {
        let g = self.inner.lock().unwrap();
        if g.fail_reads {
            bail!("MemoryGraph: candidate read failed");
        }
        let read = g.read_ids(user_id);
        let mut best: HashMap<Uuid, f64> = HashMap::new();
        for ((from, to), score) in &g.edges {
            if read.contains(from) && !read.contains(to) {
                let entry = best.entry(*to).or_insert(*score);
                *entry = entry.max(*score);
            }
        }
        let mut hits: Vec<SimilarityHit> = best
            .into_iter()
            .filter_map(|(id, score)| {
                g.contents
                    .get(&id)
                    .map(|c| SimilarityHit { content: c.clone(), score })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.content.id.cmp(&b.content.id)));
        Ok(hits)
    }

    async fn topic_matches(&self, user_id: &str) -> Result<Vec<TopicHit>> {
        let g = self.inner.lock().unwrap();
        if g.fail_reads {
            bail!("MemoryGraph: candidate read failed");
        }
        let read = g.read_ids(user_id);
        let topics: HashSet<&str> = read
            .iter()
            .filter_map(|id| g.contents.get(id).map(|c| c.topic.as_str()))
            .collect();
        Ok(g.sorted_contents()
            .into_iter()
            .filter(|c| topics.contains(c.topic.as_str()) && !read.contains(&c.id))
            .map(|c| TopicHit { content: c.clone() })
            .collect())
    }

    async fn rated_content(&self, user_id: &str) -> Result<Vec<RatingHit>> {
        let g = self.inner.lock().unwrap();
        if g.fail_reads {
            bail!("MemoryGraph: candidate read failed");
        }
        let read = g.read_ids(user_id);
        let mut hits: Vec<RatingHit> = g
            .sorted_contents()
            .into_iter()
            .filter(|c| !read.contains(&c.id))
            .filter_map(|c| {
                g.rating_aggregate(c.id).map(|(avg_rating, rating_count)| RatingHit {
                    content: c.clone(),
                    avg_rating,
                    rating_count,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.avg_rating.total_cmp(&a.avg_rating));
        Ok(hits)
    }

    async fn topic_affinities(&self, user_id: &str) -> Result<HashMap<String, f64>> {
        let g = self.inner.lock().unwrap();
        Ok(g.affinities
            .iter()
            .filter(|((u, _), _)| u == user_id)
            .map(|((_, topic), score)| (topic.clone(), *score))
            .collect())
    }

    async fn popularity(&self) -> Result<Vec<PopularityRow>> {
        let g = self.inner.lock().unwrap();
        Ok(g.sorted_contents()
            .into_iter()
            .map(|c| {
                let read_count = g.reads.keys().filter(|(_, id)| *id == c.id).count() as u64;
                let aggregate = g.rating_aggregate(c.id);
                PopularityRow {
                    content: c.clone(),
                    read_count,
                    avg_rating: aggregate.map(|(avg, _)| avg),
                    rating_count: aggregate.map_or(0, |(_, n)| n as u64),
                }
            })
            .collect())
    }

    async fn read_history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let g = self.inner.lock().unwrap();
        let mut reads: Vec<(u64, Uuid)> = g
            .reads
            .iter()
            .filter(|((u, _), _)| u == user_id)
            .map(|((_, id), seq)| (*seq, *id))
            .collect();
        reads.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(reads
            .into_iter()
            .take(limit)
            .filter_map(|(_, id)| {
                let key = (user_id.to_string(), id);
                g.contents.get(&id).map(|c| HistoryEntry {
                    content: c.clone(),
                    rating: g.ratings.get(&key).copied(),
                    bookmarked: g.bookmarks.contains(&key),
                })
            })
            .collect())
    }

    async fn stats(&self) -> Result<GraphStats> {
        let g = self.inner.lock().unwrap();
        let topics: HashSet<&str> = g.contents.values().map(|c| c.topic.as_str()).collect();
        Ok(GraphStats {
            contents: g.contents.len() as u64,
            users: g.users.len() as u64,
            interactions: (g.reads.len() + g.ratings.len() + g.bookmarks.len()) as u64,
            topics: topics.len() as u64,
            similarity_edges: g.edges.len() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A content item with the given embedding, created `age_days` ago.
pub fn content_item(topic: &str, embedding: Vec<f32>, age_days: i64) -> ContentItem {
    ContentItem {
        id: Uuid::new_v4(),
        topic: topic.to_string(),
        body: format!("Body about {topic}."),
        auxiliary_summary: String::new(),
        author: "AI".to_string(),
        embedding,
        created_at: Utc::now() - chrono::Duration::days(age_days),
    }
}

pub fn content_ref(topic: &str, created_at: Option<DateTime<Utc>>) -> ContentRef {
    ContentRef {
        id: Uuid::new_v4(),
        title: topic.to_string(),
        topic: topic.to_string(),
        created_at,
    }
}

// ---------------------------------------------------------------------------
// TestHarness
// ---------------------------------------------------------------------------

/// Real components over in-memory stores and scripted model calls.
pub struct TestHarness {
    pub vectors: Arc<MemoryVectorStore>,
    pub graph: Arc<MemoryGraph>,
    pub generator: Arc<ScriptedGenerator>,
    pub judge_backend: Arc<ScriptedJudge>,
    pub storage: Arc<StorageCoordinator>,
    pub generation: GenerationLoop,
    pub ranking: RankingEngine,
}

impl TestHarness {
    pub fn new(generator: ScriptedGenerator, judge: ScriptedJudge, embedder: FixedEmbedder) -> Self {
        Self::with_stores(
            generator,
            judge,
            embedder,
            MemoryVectorStore::new(),
            MemoryGraph::new(),
            MockSearcher::empty(),
        )
    }

    pub fn with_stores(
        generator: ScriptedGenerator,
        judge: ScriptedJudge,
        embedder: FixedEmbedder,
        vectors: MemoryVectorStore,
        graph: MemoryGraph,
        searcher: MockSearcher,
    ) -> Self {
        let tuning = test_tuning();
        let vectors = Arc::new(vectors);
        let graph = Arc::new(graph);
        let generator = Arc::new(generator);
        let judge_backend = Arc::new(judge);

        let similarity = Arc::new(SimilarityMaintainer::new(
            vectors.clone(),
            graph.clone(),
            tuning.similarity.threshold,
        ));
        let storage = Arc::new(StorageCoordinator::new(
            vectors.clone(),
            graph.clone(),
            Arc::new(embedder),
            similarity,
        ));
        let judge = Arc::new(QualityJudge::new(
            judge_backend.clone(),
            Arc::new(CooldownGate::new(Duration::from_millis(tuning.judge.cooldown_ms))),
            tuning.judge.clone(),
            tuning.timeouts.judge(),
        ));
        let generation = GenerationLoop::new(
            generator.clone(),
            Arc::new(searcher),
            judge,
            storage.clone(),
            tuning.generation.clone(),
            tuning.timeouts.clone(),
        );
        let ranking = RankingEngine::new(graph.clone(), vectors.clone(), tuning.ranking.clone());

        Self {
            vectors,
            graph,
            generator,
            judge_backend,
            storage,
            generation,
            ranking,
        }
    }
}
