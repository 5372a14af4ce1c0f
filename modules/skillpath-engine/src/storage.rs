use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use skillpath_common::error::Result as SkillpathResult;
use skillpath_common::vector::normalize;
use skillpath_common::{ContentItem, SkillpathError, StorageStats, VectorFilter};

use crate::similarity::SimilarityMaintainer;
use crate::traits::{ContentGraph, TextEmbedder, VectorStore};

/// Owns the write path into the vector and graph stores.
///
/// Every item gets one id, used by both stores. The vector store is written
/// first; a graph failure after that surfaces as [`SkillpathError::Consistency`]
/// and is left for an operator to reconcile.
pub struct StorageCoordinator {
    vectors: Arc<dyn VectorStore>,
    graph: Arc<dyn ContentGraph>,
    embedder: Arc<dyn TextEmbedder>,
    similarity: Arc<SimilarityMaintainer>,
    /// Serializes id assignment, dual write and similarity update per item.
    write_lock: Mutex<()>,
}

impl StorageCoordinator {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        graph: Arc<dyn ContentGraph>,
        embedder: Arc<dyn TextEmbedder>,
        similarity: Arc<SimilarityMaintainer>,
    ) -> Self {
        Self {
            vectors,
            graph,
            embedder,
            similarity,
            write_lock: Mutex::new(()),
        }
    }

    /// Persist one item into both stores and link it into the similarity graph.
    pub async fn save(
        &self,
        topic: &str,
        body: &str,
        summary: &str,
        author: &str,
    ) -> SkillpathResult<Uuid> {
        let embedding = self
            .embedder
            .embed(&format!("{topic}: {body}"))
            .await
            .map_err(|e| SkillpathError::transient("embedding", e))?;
        if embedding.is_empty() {
            return Err(SkillpathError::transient("embedding", "empty embedding returned"));
        }

        let _guard = self.write_lock.lock().await;

        let item = ContentItem {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            body: body.to_string(),
            auxiliary_summary: summary.to_string(),
            author: author.to_string(),
            embedding: normalize(&embedding),
            created_at: Utc::now(),
        };

        self.vectors
            .insert(&item)
            .await
            .map_err(|e| SkillpathError::transient("vector store", e))?;

        if let Err(e) = self.graph.upsert_content(&item).await {
            error!(
                id = %item.id,
                topic,
                error = %e,
                "Graph write failed after vector write; item needs manual reconciliation"
            );
            return Err(SkillpathError::Consistency {
                id: item.id,
                message: e.to_string(),
            });
        }

        match self.similarity.update_for_new_items(&[item.id]).await {
            Ok(edges) => info!(id = %item.id, topic, edges, "Content saved"),
            Err(e) => warn!(
                id = %item.id,
                error = %e,
                "Content saved but similarity update failed"
            ),
        }

        Ok(item.id)
    }

    /// Topic of the nearest stored item when its cosine similarity to
    /// `topic` is at least `threshold`.
    pub async fn find_duplicate(&self, topic: &str, threshold: f64) -> Result<Option<(String, f64)>> {
        let embedding = normalize(&self.embedder.embed(topic).await?);
        let nearest = self.vectors.query_nearest(&embedding, 1, None).await?;
        Ok(nearest
            .into_iter()
            .next()
            .map(|hit| {
                let similarity = hit.similarity();
                debug!(topic, nearest = %hit.topic, similarity, threshold, "Nearest stored topic");
                (hit.topic, similarity)
            })
            .filter(|(_, similarity)| *similarity >= threshold))
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        let total_items = self.vectors.count().await?;
        let topics = self.vectors.topics().await?;
        Ok(StorageStats {
            total_items,
            unique_topics: topics.len() as u64,
            topics,
        })
    }

    pub async fn get(&self, id: Uuid) -> SkillpathResult<ContentItem> {
        self.vectors
            .get(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SkillpathError::NotFound {
                kind: "content",
                id: id.to_string(),
            })
    }

    pub async fn list(&self, filter: &VectorFilter) -> Result<Vec<ContentItem>> {
        self.vectors.get_by_filter(filter).await
    }

    /// Remove an item from both stores. Its similarity edges go with the node.
    pub async fn delete(&self, id: Uuid) -> SkillpathResult<()> {
        let _guard = self.write_lock.lock().await;
        let removed_vectors = self.vectors.delete(&[id]).await?;
        let removed_node = self.graph.delete_content(id).await?;
        if removed_vectors == 0 && !removed_node {
            return Err(SkillpathError::NotFound {
                kind: "content",
                id: id.to_string(),
            });
        }
        if removed_vectors == 0 || !removed_node {
            warn!(%id, removed_vectors, removed_node, "Content was only present in one store");
        }
        info!(%id, "Content deleted");
        Ok(())
    }

    pub fn similarity(&self) -> &SimilarityMaintainer {
        &self.similarity
    }
}
