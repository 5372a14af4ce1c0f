use std::collections::HashMap;

use chrono::{DateTime, Utc};
use neo4rs::{query, Row};
use skillpath_common::{
    ContentRef, GraphStats, HistoryEntry, PopularityRow, RatingHit, SimilarityHit, TopicHit,
};
use tracing::warn;
use uuid::Uuid;

use crate::GraphClient;

/// Columns every content-returning query projects.
const CONTENT_COLUMNS: &str =
    "c.id AS id, c.title AS title, c.topic AS topic, c.created_at AS created_at";

/// Excludes content the user has already read.
const NOT_READ: &str = "NOT EXISTS { MATCH (:User {id: $user})-[:READ]->(c) }";

/// Read side of the content graph. Each candidate source is its own query so
/// the ranking layer can compose and test them independently.
#[derive(Clone)]
pub struct GraphReader {
    client: GraphClient,
}

impl GraphReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn content(&self, id: Uuid) -> Result<Option<ContentRef>, neo4rs::Error> {
        let q = query(&format!(
            "MATCH (c:Content {{id: $id}}) RETURN {CONTENT_COLUMNS}"
        ))
        .param("id", id.to_string());

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            return Ok(content_ref(&row));
        }
        Ok(None)
    }

    pub async fn read_count(&self, user_id: &str) -> Result<u64, neo4rs::Error> {
        let q = query(
            "MATCH (:User {id: $user})-[r:READ]->(:Content)
             RETURN count(r) AS reads",
        )
        .param("user", user_id);

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            let reads: i64 = row.get("reads").unwrap_or(0);
            return Ok(reads.max(0) as u64);
        }
        Ok(0)
    }

    // --- Candidate sources --------------------------------------------------

    /// Unread items one SIMILAR_TO hop away from anything the user read.
    /// Multiple paths to the same item collapse to the strongest edge.
    pub async fn similarity_neighbors(&self, user_id: &str) -> Result<Vec<SimilarityHit>, neo4rs::Error> {
        let q = query(&format!(
            "MATCH (:User {{id: $user}})-[:READ]->(:Content)-[s:SIMILAR_TO]->(c:Content)
             WHERE {NOT_READ}
             WITH c, max(s.score) AS score
             RETURN {CONTENT_COLUMNS}, score
             ORDER BY score DESC"
        ))
        .param("user", user_id);

        let mut hits = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Some(content) = content_ref(&row) {
                let score: f64 = row.get("score").unwrap_or(0.0);
                hits.push(SimilarityHit { content, score });
            }
        }
        Ok(hits)
    }

    /// Unread items sharing a topic with anything the user read.
    pub async fn topic_matches(&self, user_id: &str) -> Result<Vec<TopicHit>, neo4rs::Error> {
        let q = query(&format!(
            "MATCH (:User {{id: $user}})-[:READ]->(r:Content)
             WITH collect(DISTINCT r.topic) AS topics
             MATCH (c:Content)
             WHERE c.topic IN topics AND {NOT_READ}
             RETURN {CONTENT_COLUMNS}"
        ))
        .param("user", user_id);

        let mut hits = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Some(content) = content_ref(&row) {
                hits.push(TopicHit { content });
            }
        }
        Ok(hits)
    }

    /// Unread items rated by anyone, with their rating aggregates.
    pub async fn rated_content(&self, user_id: &str) -> Result<Vec<RatingHit>, neo4rs::Error> {
        let q = query(&format!(
            "MATCH (:User)-[rt:RATED]->(c:Content)
             WHERE {NOT_READ}
             WITH c, avg(toFloat(rt.score)) AS avg_rating, count(rt) AS rating_count
             RETURN {CONTENT_COLUMNS}, avg_rating, rating_count
             ORDER BY avg_rating DESC"
        ))
        .param("user", user_id);

        let mut hits = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Some(content) = content_ref(&row) {
                let avg_rating: f64 = row.get("avg_rating").unwrap_or(0.0);
                let rating_count: i64 = row.get("rating_count").unwrap_or(0);
                hits.push(RatingHit {
                    content,
                    avg_rating,
                    rating_count: rating_count.max(0) as u32,
                });
            }
        }
        Ok(hits)
    }

    // --- Per-user signals ---------------------------------------------------

    /// Topic name -> affinity score for every topic the user has read.
    pub async fn topic_affinities(&self, user_id: &str) -> Result<HashMap<String, f64>, neo4rs::Error> {
        let q = query(
            "MATCH (:User {id: $user})-[i:INTERESTED_IN]->(t:Topic)
             RETURN t.name AS topic, toFloat(i.score) AS score",
        )
        .param("user", user_id);

        let mut out = HashMap::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            let topic: String = row.get("topic").unwrap_or_default();
            let score: f64 = row.get("score").unwrap_or(0.0);
            if !topic.is_empty() {
                out.insert(topic, score);
            }
        }
        Ok(out)
    }

    /// Read and rating aggregates for every content node, for cold start.
    pub async fn popularity(&self) -> Result<Vec<PopularityRow>, neo4rs::Error> {
        let q = query(&format!(
            "MATCH (c:Content)
             OPTIONAL MATCH (:User)-[r:READ]->(c)
             WITH c, count(r) AS read_count
             OPTIONAL MATCH (:User)-[rt:RATED]->(c)
             WITH c, read_count, avg(toFloat(rt.score)) AS avg_rating, count(rt) AS rating_count
             RETURN {CONTENT_COLUMNS}, read_count, avg_rating, rating_count"
        ));

        let mut rows = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Some(content) = content_ref(&row) {
                let read_count: i64 = row.get("read_count").unwrap_or(0);
                let rating_count: i64 = row.get("rating_count").unwrap_or(0);
                let avg_rating: Option<f64> = row.get("avg_rating").ok();
                rows.push(PopularityRow {
                    content,
                    read_count: read_count.max(0) as u64,
                    avg_rating,
                    rating_count: rating_count.max(0) as u64,
                });
            }
        }
        Ok(rows)
    }

    /// Items the user read, newest read first, with their own rating.
    pub async fn read_history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, neo4rs::Error> {
        let q = query(&format!(
            "MATCH (u:User {{id: $user}})-[r:READ]->(c:Content)
             OPTIONAL MATCH (u)-[rt:RATED]->(c)
             OPTIONAL MATCH (u)-[b:BOOKMARKED]->(c)
             RETURN {CONTENT_COLUMNS}, rt.score AS rating, b IS NOT NULL AS bookmarked, r.at AS read_at
             ORDER BY read_at DESC
             LIMIT $limit"
        ))
        .param("user", user_id)
        .param("limit", limit as i64);

        let mut entries = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Some(content) = content_ref(&row) {
                let rating: Option<i64> = row.get("rating").ok();
                let bookmarked: bool = row.get("bookmarked").unwrap_or(false);
                entries.push(HistoryEntry {
                    content,
                    rating: rating.and_then(|r| u8::try_from(r).ok()),
                    bookmarked,
                });
            }
        }
        Ok(entries)
    }

    pub async fn stats(&self) -> Result<GraphStats, neo4rs::Error> {
        let q = query(
            "CALL { MATCH (c:Content) RETURN count(c) AS contents }
             CALL { MATCH (u:User) RETURN count(u) AS users }
             CALL { MATCH (:User)-[r:READ|RATED|BOOKMARKED]->(:Content) RETURN count(r) AS interactions }
             CALL { MATCH (c:Content) RETURN count(DISTINCT c.topic) AS topics }
             CALL { MATCH (:Content)-[s:SIMILAR_TO]->(:Content) RETURN count(s) AS similarity_edges }
             RETURN contents, users, interactions, topics, similarity_edges",
        );

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            let get = |k: &str| row.get::<i64>(k).unwrap_or(0).max(0) as u64;
            return Ok(GraphStats {
                contents: get("contents"),
                users: get("users"),
                interactions: get("interactions"),
                topics: get("topics"),
                similarity_edges: get("similarity_edges"),
            });
        }
        Ok(GraphStats::default())
    }
}

/// Build a [`ContentRef`] from the standard content columns. Rows with a
/// malformed id are skipped; a bad timestamp only loses recency.
fn content_ref(row: &Row) -> Option<ContentRef> {
    let raw_id: String = row.get("id").unwrap_or_default();
    let id = match Uuid::parse_str(&raw_id) {
        Ok(id) => id,
        Err(_) => {
            warn!(id = %raw_id, "Skipping content node with malformed id");
            return None;
        }
    };
    let topic: String = row.get("topic").unwrap_or_default();
    let title: String = row.get::<String>("title").unwrap_or_else(|_| topic.clone());
    let created_at = row
        .get::<String>("created_at")
        .ok()
        .and_then(|s| parse_timestamp(&s));
    Some(ContentRef {
        id,
        title,
        topic,
        created_at,
    })
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
}
