use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use skillpath_common::{
    ContentItem, ContentRef, GraphStats, HistoryEntry, PopularityRow, RatingHit, SimilarityEdge,
    SimilarityHit, TopicHit,
};
use skillpath_graph::{GraphClient, GraphReader, GraphWriter};
use uuid::Uuid;

use crate::timeout::bounded;
use crate::traits::ContentGraph;

/// [`ContentGraph`] over Neo4j with a deadline on every call.
pub struct Neo4jContentGraph {
    writer: GraphWriter,
    reader: GraphReader,
    timeout: Duration,
}

impl Neo4jContentGraph {
    pub fn new(client: GraphClient, timeout: Duration) -> Self {
        Self {
            writer: GraphWriter::new(client.clone()),
            reader: GraphReader::new(client),
            timeout,
        }
    }

    async fn run<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, neo4rs::Error>>,
    ) -> Result<T> {
        bounded(self.timeout, what, async { Ok(fut.await?) }).await
    }
}

#[async_trait]
impl ContentGraph for Neo4jContentGraph {
    async fn upsert_content(&self, item: &ContentItem) -> Result<()> {
        self.run("graph upsert", self.writer.upsert_content(item)).await
    }

    async fn delete_content(&self, id: Uuid) -> Result<bool> {
        self.run("graph delete", self.writer.delete_content(id)).await
    }

    async fn merge_similarity_edges(&self, edges: &[SimilarityEdge]) -> Result<u64> {
        self.run("graph edge merge", self.writer.merge_similarity_edges(edges)).await
    }

    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        self.run("graph user", self.writer.ensure_user(user_id)).await
    }

    async fn record_read(&self, user_id: &str, content_id: Uuid) -> Result<()> {
        self.run("graph read", self.writer.record_read(user_id, content_id)).await
    }

    async fn record_rating(&self, user_id: &str, content_id: Uuid, score: u8) -> Result<()> {
        self.run("graph rating", self.writer.record_rating(user_id, content_id, score))
            .await
    }

    async fn record_bookmark(&self, user_id: &str, content_id: Uuid) -> Result<()> {
        self.run("graph bookmark", self.writer.record_bookmark(user_id, content_id))
            .await
    }

    async fn content(&self, id: Uuid) -> Result<Option<ContentRef>> {
        self.run("graph content", self.reader.content(id)).await
    }

    async fn read_count(&self, user_id: &str) -> Result<u64> {
        self.run("graph read count", self.reader.read_count(user_id)).await
    }

    async fn similarity_neighbors(&self, user_id: &str) -> Result<Vec<SimilarityHit>> {
        self.run("graph similarity neighbors", self.reader.similarity_neighbors(user_id))
            .await
    }

    async fn topic_matches(&self, user_id: &str) -> Result<Vec<TopicHit>> {
        self.run("graph topic matches", self.reader.topic_matches(user_id)).await
    }

    async fn rated_content(&self, user_id: &str) -> Result<Vec<RatingHit>> {
        self.run("graph rated content", self.reader.rated_content(user_id)).await
    }

    async fn topic_affinities(&self, user_id: &str) -> Result<HashMap<String, f64>> {
        self.run("graph affinities", self.reader.topic_affinities(user_id)).await
    }

    async fn popularity(&self) -> Result<Vec<PopularityRow>> {
        self.run("graph popularity", self.reader.popularity()).await
    }

    async fn read_history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.run("graph history", self.reader.read_history(user_id, limit)).await
    }

    async fn stats(&self) -> Result<GraphStats> {
        self.run("graph stats", self.reader.stats()).await
    }
}
