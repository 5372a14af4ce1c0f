#![cfg(feature = "test-utils")]

// Graph store integration tests against a real Neo4j.
//
// Requirements: Docker (for Neo4j via testcontainers)
//
// Run with: cargo test -p skillpath-graph --features test-utils --test graph_test

use chrono::{Duration, Utc};
use skillpath_common::{ContentItem, SimilarityEdge};
use skillpath_graph::{GraphClient, GraphReader, GraphWriter};
use uuid::Uuid;

async fn setup() -> (impl std::any::Any, GraphWriter, GraphReader) {
    let (container, client): (_, GraphClient) = skillpath_graph::testutil::neo4j_container().await;
    (container, GraphWriter::new(client.clone()), GraphReader::new(client))
}

fn item(topic: &str, age_days: i64) -> ContentItem {
    ContentItem {
        id: Uuid::new_v4(),
        topic: topic.to_string(),
        body: format!("Body about {topic}"),
        auxiliary_summary: "- Term: definition".to_string(),
        author: "AI".to_string(),
        embedding: vec![],
        created_at: Utc::now() - Duration::days(age_days),
    }
}

#[tokio::test]
async fn content_node_is_not_mutated_by_second_upsert() {
    let (_c, writer, reader) = setup().await;
    let mut a = item("Legal translation", 3);
    writer.upsert_content(&a).await.unwrap();

    a.topic = "Changed".into();
    writer.upsert_content(&a).await.unwrap();

    let stored = reader.content(a.id).await.unwrap().unwrap();
    assert_eq!(stored.topic, "Legal translation");
    assert!(stored.created_at.is_some());
}

#[tokio::test]
async fn similarity_edges_merge_idempotently() {
    let (_c, writer, reader) = setup().await;
    let a = item("Medical terminology", 1);
    let b = item("Clinical trials", 1);
    writer.upsert_content(&a).await.unwrap();
    writer.upsert_content(&b).await.unwrap();

    let edges = vec![
        SimilarityEdge { from: a.id, to: b.id, score: 0.9 },
        SimilarityEdge { from: b.id, to: a.id, score: 0.9 },
    ];
    assert_eq!(writer.merge_similarity_edges(&edges).await.unwrap(), 2);
    assert_eq!(writer.merge_similarity_edges(&edges).await.unwrap(), 2);

    let stats = reader.stats().await.unwrap();
    assert_eq!(stats.similarity_edges, 2);

    writer.record_read("gus", a.id).await.unwrap();
    let neighbors = reader.similarity_neighbors("gus").await.unwrap();
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].content.id, b.id);
    assert!((neighbors[0].score - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn candidate_sources_exclude_read_items() {
    let (_c, writer, reader) = setup().await;
    let read = item("Patent law", 2);
    let neighbor = item("Trademark law", 2);
    let same_topic = item("Patent law", 5);
    let rated = item("Subtitling", 1);
    for i in [&read, &neighbor, &same_topic, &rated] {
        writer.upsert_content(i).await.unwrap();
    }
    writer
        .merge_similarity_edges(&[SimilarityEdge { from: read.id, to: neighbor.id, score: 0.8 }])
        .await
        .unwrap();

    writer.record_read("alice", read.id).await.unwrap();
    writer.record_rating("bob", rated.id, 5).await.unwrap();
    writer.record_rating("carol", rated.id, 4).await.unwrap();
    writer.record_rating("bob", read.id, 1).await.unwrap();

    assert_eq!(reader.read_count("alice").await.unwrap(), 1);

    let sim = reader.similarity_neighbors("alice").await.unwrap();
    assert_eq!(sim.len(), 1);
    assert_eq!(sim[0].content.id, neighbor.id);

    let topics = reader.topic_matches("alice").await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].content.id, same_topic.id);

    let ratings = reader.rated_content("alice").await.unwrap();
    assert_eq!(ratings.len(), 1, "the read item is excluded even though rated");
    assert_eq!(ratings[0].content.id, rated.id);
    assert!((ratings[0].avg_rating - 4.5).abs() < 1e-9);
    assert_eq!(ratings[0].rating_count, 2);

    let affinities = reader.topic_affinities("alice").await.unwrap();
    assert_eq!(affinities.get("Patent law"), Some(&1.0));
}

#[tokio::test]
async fn every_read_bumps_topic_affinity() {
    let (_c, writer, reader) = setup().await;
    let a = item("Localization", 1);
    let b = item("Localization", 2);
    writer.upsert_content(&a).await.unwrap();
    writer.upsert_content(&b).await.unwrap();

    writer.record_read("dana", a.id).await.unwrap();
    writer.record_read("dana", a.id).await.unwrap();
    writer.record_read("dana", b.id).await.unwrap();
    writer.record_read("dana", Uuid::new_v4()).await.unwrap();

    assert_eq!(reader.read_count("dana").await.unwrap(), 2);
    let affinities = reader.topic_affinities("dana").await.unwrap();
    assert_eq!(affinities.len(), 1);
    assert_eq!(affinities.get("Localization"), Some(&3.0));
}

#[tokio::test]
async fn rating_is_overwritten_and_history_reports_it() {
    let (_c, writer, reader) = setup().await;
    let a = item("Interpreting", 1);
    writer.upsert_content(&a).await.unwrap();
    writer.record_read("erin", a.id).await.unwrap();
    writer.record_rating("erin", a.id, 2).await.unwrap();
    writer.record_rating("erin", a.id, 5).await.unwrap();
    writer.record_bookmark("erin", a.id).await.unwrap();

    let history = reader.read_history("erin", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].rating, Some(5));
    assert!(history[0].bookmarked);
}

#[tokio::test]
async fn popularity_counts_reads_and_ratings() {
    let (_c, writer, reader) = setup().await;
    let a = item("Audiovisual translation", 1);
    let b = item("CAT tools", 1);
    writer.upsert_content(&a).await.unwrap();
    writer.upsert_content(&b).await.unwrap();
    writer.record_read("u1", a.id).await.unwrap();
    writer.record_read("u2", a.id).await.unwrap();
    writer.record_rating("u1", a.id, 4).await.unwrap();

    let rows = reader.popularity().await.unwrap();
    let pa = rows.iter().find(|r| r.content.id == a.id).unwrap();
    let pb = rows.iter().find(|r| r.content.id == b.id).unwrap();
    assert_eq!(pa.read_count, 2);
    assert_eq!(pa.rating_count, 1);
    assert_eq!(pa.avg_rating, Some(4.0));
    assert_eq!(pb.read_count, 0);
    assert_eq!(pb.avg_rating, None);
}

#[tokio::test]
async fn delete_detaches_relationships() {
    let (_c, writer, reader) = setup().await;
    let a = item("Terminology management", 1);
    writer.upsert_content(&a).await.unwrap();
    writer.record_read("fay", a.id).await.unwrap();

    assert!(writer.delete_content(a.id).await.unwrap());
    assert!(reader.content(a.id).await.unwrap().is_none());
    assert_eq!(reader.read_count("fay").await.unwrap(), 0);
    assert!(!writer.delete_content(a.id).await.unwrap());
}
