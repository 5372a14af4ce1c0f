use anyhow::Result;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use skillpath_common::{ContentItem, NearestHit, VectorFilter};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres + pgvector store holding each item's text, metadata and embedding.
#[derive(Clone)]
pub struct PgVectorStore {
    pool: PgPool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    topic: String,
    body: String,
    summary: String,
    author: String,
    created_at: DateTime<Utc>,
    embedding: Vector,
}

impl From<ContentRow> for ContentItem {
    fn from(r: ContentRow) -> Self {
        ContentItem {
            id: r.id,
            topic: r.topic,
            body: r.body,
            auxiliary_summary: r.summary,
            author: r.author,
            embedding: r.embedding.to_vec(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct NearestRow {
    id: Uuid,
    topic: String,
    distance: f64,
}

impl PgVectorStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the SQL migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn insert(&self, item: &ContentItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO content_embeddings (id, topic, body, summary, author, created_at, embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.id)
        .bind(&item.topic)
        .bind(&item.body)
        .bind(&item.auxiliary_summary)
        .bind(&item.author)
        .bind(item.created_at)
        .bind(Vector::from(item.embedding.clone()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `k` nearest items by cosine distance, optionally filtered by metadata.
    pub async fn query_nearest(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<NearestHit>> {
        let (topic, author) = split_filter(filter);
        let rows = sqlx::query_as::<_, NearestRow>(
            r#"
            SELECT id, topic, (embedding <=> $1)::float8 AS distance
            FROM content_embeddings
            WHERE ($2::text IS NULL OR topic = $2)
              AND ($3::text IS NULL OR author = $3)
            ORDER BY embedding <=> $1
            LIMIT $4
            "#,
        )
        .bind(Vector::from(embedding.to_vec()))
        .bind(topic)
        .bind(author)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| NearestHit {
                id: r.id,
                topic: r.topic,
                distance: r.distance,
            })
            .collect())
    }

    pub async fn get(&self, ids: &[Uuid]) -> Result<Vec<ContentItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ContentRow>(
            "SELECT id, topic, body, summary, author, created_at, embedding
             FROM content_embeddings WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_by_filter(&self, filter: &VectorFilter) -> Result<Vec<ContentItem>> {
        let (topic, author) = split_filter(Some(filter));
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT id, topic, body, summary, author, created_at, embedding
            FROM content_embeddings
            WHERE ($1::text IS NULL OR topic = $1)
              AND ($2::text IS NULL OR author = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(topic)
        .bind(author)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every stored (id, embedding) pair.
    pub async fn all_embeddings(&self) -> Result<Vec<(Uuid, Vec<f32>)>> {
        let rows = sqlx::query_as::<_, (Uuid, Vector)>(
            "SELECT id, embedding FROM content_embeddings",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id, v)| (id, v.to_vec())).collect())
    }

    pub async fn delete(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM content_embeddings WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<u64> {
        let (n,): (i64,) = sqlx::query_as("SELECT count(*) FROM content_embeddings")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    pub async fn topics(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT topic FROM content_embeddings ORDER BY topic")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }
}

fn split_filter(filter: Option<&VectorFilter>) -> (Option<String>, Option<String>) {
    match filter {
        Some(f) => (f.topic.clone(), f.author.clone()),
        None => (None, None),
    }
}
