use std::sync::Arc;
use std::time::Duration;

use ai_client::OpenAi;
use anyhow::Context;
use tracing::info;
use uuid::Uuid;

use skillpath_common::error::Result;
use skillpath_common::{
    BatchReport, Config, ContentItem, HistoryEntry, InteractionKind, RankedItem, SkillpathError,
    SystemStats, Tuning, VectorFilter,
};
use skillpath_graph::{GraphClient, PgVectorStore};

use crate::generation::{BatchRequest, CancelFlag, GenerationLoop};
use crate::infra::{Neo4jContentGraph, NoopSearcher, PgVectors, TavilySearcher};
use crate::judge::{CooldownGate, QualityJudge};
use crate::ranking::{RankingEngine, RecommendRequest};
use crate::similarity::SimilarityMaintainer;
use crate::storage::StorageCoordinator;
use crate::traits::{
    ContentGraph, JudgeBackend, TextEmbedder, TextGenerator, VectorStore, WebSearcher,
};

/// The operations exposed to callers: generation batches, recommendations,
/// interaction recording and store maintenance. Built once at startup.
pub struct SkillsService {
    generation: GenerationLoop,
    ranking: RankingEngine,
    storage: Arc<StorageCoordinator>,
    graph: Arc<dyn ContentGraph>,
    graph_client: Option<GraphClient>,
    vector_store: Option<PgVectorStore>,
}

/// Collaborators a [`SkillsService`] is assembled from.
pub struct Collaborators {
    pub generator: Arc<dyn TextGenerator>,
    pub judge: Arc<dyn JudgeBackend>,
    pub embedder: Arc<dyn TextEmbedder>,
    pub searcher: Arc<dyn WebSearcher>,
    pub vectors: Arc<dyn VectorStore>,
    pub graph: Arc<dyn ContentGraph>,
}

impl SkillsService {
    /// Connect to every backend named in `config`.
    pub async fn connect(config: &Config, tuning: Tuning) -> anyhow::Result<Self> {
        tuning.validate()?;
        let timeouts = &tuning.timeouts;

        let mut generator = OpenAi::new(&config.llm_api_key, &config.llm_model)
            .with_timeout(timeouts.llm());
        if let Some(url) = &config.llm_base_url {
            generator = generator.with_base_url(url);
        }
        let mut judge = OpenAi::new(&config.judge_api_key, &config.judge_model)
            .with_timeout(timeouts.judge());
        if let Some(url) = &config.judge_base_url {
            judge = judge.with_base_url(url);
        }
        let mut embedder = OpenAi::new(&config.embedding_api_key, &config.llm_model)
            .with_embedding_model(&config.embedding_model)
            .with_timeout(timeouts.llm());
        if let Some(url) = &config.embedding_base_url {
            embedder = embedder.with_base_url(url);
        }

        let searcher: Arc<dyn WebSearcher> = match &config.tavily_api_key {
            Some(key) => Arc::new(TavilySearcher::new(key, timeouts.search())?),
            None => {
                info!("TAVILY_API_KEY not set, generating without search context");
                Arc::new(NoopSearcher)
            }
        };

        let graph_client =
            GraphClient::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
                .await
                .context("Failed to connect to Neo4j")?;
        let vector_store = PgVectorStore::connect(&config.database_url)
            .await
            .context("Failed to connect to Postgres")?;

        let collaborators = Collaborators {
            generator: Arc::new(generator),
            judge: Arc::new(judge),
            embedder: Arc::new(embedder),
            searcher,
            vectors: Arc::new(PgVectors::new(vector_store.clone(), timeouts.store())),
            graph: Arc::new(Neo4jContentGraph::new(graph_client.clone(), timeouts.store())),
        };

        let mut service = Self::from_parts(collaborators, &tuning);
        service.graph_client = Some(graph_client);
        service.vector_store = Some(vector_store);
        Ok(service)
    }

    /// Assemble from already-built collaborators.
    pub fn from_parts(c: Collaborators, tuning: &Tuning) -> Self {
        let similarity = Arc::new(SimilarityMaintainer::new(
            c.vectors.clone(),
            c.graph.clone(),
            tuning.similarity.threshold,
        ));
        let storage = Arc::new(StorageCoordinator::new(
            c.vectors.clone(),
            c.graph.clone(),
            c.embedder,
            similarity,
        ));
        let gate = Arc::new(CooldownGate::new(Duration::from_millis(tuning.judge.cooldown_ms)));
        let judge = Arc::new(QualityJudge::new(
            c.judge,
            gate,
            tuning.judge.clone(),
            tuning.timeouts.judge(),
        ));
        let generation = GenerationLoop::new(
            c.generator,
            c.searcher,
            judge,
            storage.clone(),
            tuning.generation.clone(),
            tuning.timeouts.clone(),
        );
        let ranking = RankingEngine::new(c.graph.clone(), c.vectors, tuning.ranking.clone());

        Self {
            generation,
            ranking,
            storage,
            graph: c.graph,
            graph_client: None,
            vector_store: None,
        }
    }

    /// Apply graph constraints and SQL migrations. No-op for injected stores.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        if let Some(client) = &self.graph_client {
            skillpath_graph::migrate(client).await?;
        }
        if let Some(store) = &self.vector_store {
            store.migrate().await?;
        }
        Ok(())
    }

    // --- Generation -----------------------------------------------------------

    pub async fn generate_batch(&self, request: &BatchRequest, cancel: &CancelFlag) -> Result<BatchReport> {
        self.generation.generate_batch(request, cancel).await
    }

    pub async fn suggest_topics(&self, n: usize) -> Result<Vec<String>> {
        self.generation.suggest_topics(n).await
    }

    // --- Recommendations --------------------------------------------------------

    pub async fn recommend(&self, request: &RecommendRequest) -> Result<Vec<RankedItem>> {
        self.ranking.recommend(request).await
    }

    /// Record a read, rating or bookmark. Reads also bump the user's affinity
    /// for the item's topic.
    pub async fn record_interaction(
        &self,
        user_id: &str,
        content_id: Uuid,
        kind: InteractionKind,
        rating: Option<u8>,
    ) -> Result<()> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SkillpathError::validation("user_id must not be empty"));
        }
        if self.graph.content(content_id).await?.is_none() {
            return Err(SkillpathError::NotFound {
                kind: "content",
                id: content_id.to_string(),
            });
        }

        match kind {
            InteractionKind::Read => {
                self.graph.record_read(user_id, content_id).await?;
            }
            InteractionKind::Rate => {
                let score = rating
                    .filter(|r| (1..=5).contains(r))
                    .ok_or_else(|| {
                        SkillpathError::validation(format!(
                            "rating must be between 1 and 5, got {rating:?}"
                        ))
                    })?;
                self.graph.record_rating(user_id, content_id, score).await?;
            }
            InteractionKind::Bookmark => {
                self.graph.record_bookmark(user_id, content_id).await?;
            }
        }
        info!(user_id, %content_id, %kind, "Interaction recorded");
        Ok(())
    }

    pub async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        Ok(self.graph.read_history(user_id.trim(), limit).await?)
    }

    // --- Content ----------------------------------------------------------------

    pub async fn stats(&self) -> Result<SystemStats> {
        let storage = self.storage.stats().await?;
        let graph = self.graph.stats().await?;
        Ok(SystemStats { storage, graph })
    }

    pub async fn get(&self, id: Uuid) -> Result<ContentItem> {
        self.storage.get(id).await
    }

    pub async fn list(&self, filter: &VectorFilter) -> Result<Vec<ContentItem>> {
        Ok(self.storage.list(filter).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.storage.delete(id).await
    }

    /// Recompute similarity edges across the whole corpus.
    pub async fn rebuild_similarity(&self) -> Result<u64> {
        Ok(self.storage.similarity().rebuild().await?)
    }
}
