//! Vector store integration tests.
//! Requires Postgres with the pgvector extension. Set DATABASE_TEST_URL or these tests are skipped.

use chrono::Utc;
use skillpath_common::{ContentItem, VectorFilter};
use skillpath_graph::PgVectorStore;
use uuid::Uuid;

async fn test_store() -> Option<PgVectorStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let store = PgVectorStore::connect(&url).await.ok()?;
    store.migrate().await.ok()?;
    Some(store)
}

fn item(topic: &str, embedding: Vec<f32>) -> ContentItem {
    ContentItem {
        id: Uuid::new_v4(),
        topic: topic.to_string(),
        body: format!("Body about {topic}"),
        auxiliary_summary: "- Term: definition".to_string(),
        author: "AI".to_string(),
        embedding,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn insert_then_get_round_trips() {
    let Some(store) = test_store().await else { return };
    let a = item("Sworn translation", vec![1.0, 0.0, 0.0]);
    store.insert(&a).await.unwrap();

    let got = store.get(&[a.id]).await.unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].topic, a.topic);
    assert_eq!(got[0].body, a.body);
    assert_eq!(got[0].auxiliary_summary, a.auxiliary_summary);

    store.delete(&[a.id]).await.unwrap();
}

#[tokio::test]
async fn nearest_orders_by_cosine_distance() {
    let Some(store) = test_store().await else { return };
    let tag = Uuid::new_v4().to_string();
    let near = ContentItem { author: tag.clone(), ..item("Near", vec![1.0, 0.1, 0.0]) };
    let far = ContentItem { author: tag.clone(), ..item("Far", vec![0.0, 0.0, 1.0]) };
    store.insert(&near).await.unwrap();
    store.insert(&far).await.unwrap();

    let filter = VectorFilter { author: Some(tag), ..Default::default() };
    let hits = store.query_nearest(&[1.0, 0.0, 0.0], 2, Some(&filter)).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, near.id);
    assert!(hits[0].distance < hits[1].distance);

    assert_eq!(store.delete(&[near.id, far.id]).await.unwrap(), 2);
}
