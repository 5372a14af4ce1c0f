use chrono::Utc;
use neo4rs::{query, BoltFloat, BoltMap, BoltString, BoltType};
use skillpath_common::{ContentItem, SimilarityEdge};
use tracing::{debug, info};
use uuid::Uuid;

use crate::GraphClient;

/// Batch size for UNWIND edge creation.
const EDGE_BATCH_SIZE: usize = 500;

/// Write side of the content graph.
///
/// Schema:
/// - `(:Content {id, title, topic, author, created_at})`
/// - `(:User {id})`
/// - `(:Topic {name})`
/// - `(User)-[:READ {at}]->(Content)`
/// - `(User)-[:RATED {score, at}]->(Content)`
/// - `(User)-[:BOOKMARKED {timestamp}]->(Content)`
/// - `(User)-[:INTERESTED_IN {score}]->(Topic)`, bumped by every read
/// - `(Content)-[:SIMILAR_TO {score}]->(Content)`
#[derive(Clone)]
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    // --- Content ------------------------------------------------------------

    /// Create the content node. Properties are only set on creation so a
    /// repeated write never mutates a persisted item.
    pub async fn upsert_content(&self, item: &ContentItem) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (c:Content {id: $id})
             ON CREATE SET c.title = $title,
                           c.topic = $topic,
                           c.author = $author,
                           c.created_at = $created_at",
        )
        .param("id", item.id.to_string())
        .param("title", item.title())
        .param("topic", item.topic.as_str())
        .param("author", item.author.as_str())
        .param("created_at", item.created_at.to_rfc3339());

        self.client.graph.run(q).await?;
        debug!(content_id = %item.id, topic = %item.topic, "Content node written");
        Ok(())
    }

    /// Remove a content node and every relationship touching it.
    pub async fn delete_content(&self, id: Uuid) -> Result<bool, neo4rs::Error> {
        let q = query(
            "MATCH (c:Content {id: $id})
             DETACH DELETE c
             RETURN count(*) AS deleted",
        )
        .param("id", id.to_string());

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            let deleted: i64 = row.get("deleted").unwrap_or(0);
            return Ok(deleted > 0);
        }
        Ok(false)
    }

    // --- Similarity ---------------------------------------------------------

    /// Merge SIMILAR_TO edges in batches. The score is overwritten, never
    /// accumulated, so re-running with the same input is a no-op.
    pub async fn merge_similarity_edges(&self, edges: &[SimilarityEdge]) -> Result<u64, neo4rs::Error> {
        let mut total = 0u64;
        for batch in edges.chunks(EDGE_BATCH_SIZE) {
            total += self.write_edge_batch(batch).await?;
        }
        if total > 0 {
            info!(edges = total, "SIMILAR_TO edges merged");
        }
        Ok(total)
    }

    async fn write_edge_batch(&self, batch: &[SimilarityEdge]) -> Result<u64, neo4rs::Error> {
        let edge_data: Vec<BoltType> = batch
            .iter()
            .map(|e| {
                BoltType::Map(BoltMap::from_iter(vec![
                    (
                        BoltString::from("from"),
                        BoltType::String(BoltString::from(e.from.to_string().as_str())),
                    ),
                    (
                        BoltString::from("to"),
                        BoltType::String(BoltString::from(e.to.to_string().as_str())),
                    ),
                    (
                        BoltString::from("score"),
                        BoltType::Float(BoltFloat::new(e.score)),
                    ),
                ]))
            })
            .collect();

        let q = query(
            "UNWIND $edges AS edge
             MATCH (a:Content {id: edge.from})
             MATCH (b:Content {id: edge.to})
             MERGE (a)-[r:SIMILAR_TO]->(b)
             SET r.score = edge.score
             RETURN count(r) AS merged",
        )
        .param("edges", edge_data);

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            let merged: i64 = row.get("merged").unwrap_or(0);
            return Ok(merged as u64);
        }
        Ok(0)
    }

    // --- Users and interactions ---------------------------------------------

    /// Create the user node on first contact.
    pub async fn ensure_user(&self, user_id: &str) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (u:User {id: $id})
             ON CREATE SET u.created_at = $now",
        )
        .param("id", user_id)
        .param("now", Utc::now().to_rfc3339());
        self.client.graph.run(q).await
    }

    /// Mark `content_id` as read and add 1 to the user's affinity for its
    /// topic in the same statement. Unknown content writes nothing but the user.
    pub async fn record_read(&self, user_id: &str, content_id: Uuid) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (u:User {id: $user})
             WITH u
             MATCH (c:Content {id: $content})
             MERGE (u)-[r:READ]->(c)
             SET r.at = $now
             MERGE (t:Topic {name: c.topic})
             MERGE (u)-[i:INTERESTED_IN]->(t)
             SET i.score = coalesce(i.score, 0) + 1",
        )
        .param("user", user_id)
        .param("content", content_id.to_string())
        .param("now", Utc::now().to_rfc3339());
        self.client.graph.run(q).await
    }

    /// Rating is overwritable: the latest score wins.
    pub async fn record_rating(
        &self,
        user_id: &str,
        content_id: Uuid,
        score: u8,
    ) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (u:User {id: $user})
             WITH u
             MATCH (c:Content {id: $content})
             MERGE (u)-[r:RATED]->(c)
             SET r.score = $score, r.at = $now",
        )
        .param("user", user_id)
        .param("content", content_id.to_string())
        .param("score", score as i64)
        .param("now", Utc::now().to_rfc3339());
        self.client.graph.run(q).await
    }

    pub async fn record_bookmark(&self, user_id: &str, content_id: Uuid) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (u:User {id: $user})
             WITH u
             MATCH (c:Content {id: $content})
             MERGE (u)-[b:BOOKMARKED]->(c)
             SET b.timestamp = $now",
        )
        .param("user", user_id)
        .param("content", content_id.to_string())
        .param("now", Utc::now().to_rfc3339());
        self.client.graph.run(q).await
    }
}
