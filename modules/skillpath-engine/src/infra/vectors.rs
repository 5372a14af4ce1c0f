use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use skillpath_common::{ContentItem, NearestHit, VectorFilter};
use skillpath_graph::PgVectorStore;
use uuid::Uuid;

use crate::timeout::bounded;
use crate::traits::VectorStore;

/// [`VectorStore`] over Postgres/pgvector with a deadline on every call.
pub struct PgVectors {
    store: PgVectorStore,
    timeout: Duration,
}

impl PgVectors {
    pub fn new(store: PgVectorStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

#[async_trait]
impl VectorStore for PgVectors {
    async fn insert(&self, item: &ContentItem) -> Result<()> {
        bounded(self.timeout, "vector insert", self.store.insert(item)).await
    }

    async fn query_nearest(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<NearestHit>> {
        bounded(
            self.timeout,
            "vector query",
            self.store.query_nearest(embedding, k, filter),
        )
        .await
    }

    async fn get(&self, ids: &[Uuid]) -> Result<Vec<ContentItem>> {
        bounded(self.timeout, "vector get", self.store.get(ids)).await
    }

    async fn get_by_filter(&self, filter: &VectorFilter) -> Result<Vec<ContentItem>> {
        bounded(self.timeout, "vector get", self.store.get_by_filter(filter)).await
    }

    async fn all_embeddings(&self) -> Result<Vec<(Uuid, Vec<f32>)>> {
        bounded(self.timeout, "vector scan", self.store.all_embeddings()).await
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<u64> {
        bounded(self.timeout, "vector delete", self.store.delete(ids)).await
    }

    async fn count(&self) -> Result<u64> {
        bounded(self.timeout, "vector count", self.store.count()).await
    }

    async fn topics(&self) -> Result<Vec<String>> {
        bounded(self.timeout, "vector topics", self.store.topics()).await
    }
}
