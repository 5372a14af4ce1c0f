//! Recommendation tests.
//!
//! Seeded in-memory graph and vector store → RankingEngine and SkillsService →
//! verify cold start, candidate exclusion, diversity and interaction recording.
//!
//! Run with: cargo test -p skillpath-engine --test recommendation_test

use std::sync::Arc;

use uuid::Uuid;

use skillpath_common::{ContentItem, InteractionKind, SkillpathError, Strategy};
use skillpath_engine::testing::*;
use skillpath_engine::traits::ContentGraph;
use skillpath_engine::{Collaborators, RecommendRequest, SkillsService};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn harness_with(graph: MemoryGraph) -> TestHarness {
    TestHarness::with_stores(
        ScriptedGenerator::new(),
        ScriptedJudge::uniform(80.0),
        FixedEmbedder::new(TEST_EMBEDDING_DIM),
        MemoryVectorStore::new(),
        graph,
        MockSearcher::empty(),
    )
}

/// Put an item into both stores, bypassing generation.
fn seed(h: &TestHarness, topic: &str, embedding: Vec<f32>, age_days: i64) -> ContentItem {
    let item = content_item(topic, embedding, age_days);
    h.vectors.put(item.clone());
    h.graph.put(item.to_ref());
    item
}

fn ids(items: &[skillpath_common::RankedItem]) -> Vec<Uuid> {
    items.iter().map(|i| i.content.id).collect()
}

/// One read item plus five unread items on the same topic. `near` is a
/// near-duplicate of `a`; `d`, `e` and `f` are orthogonal to everything.
struct Corpus {
    read: ContentItem,
    a: ContentItem,
    near: ContentItem,
    d: ContentItem,
    e: ContentItem,
    f: ContentItem,
}

async fn corpus(h: &TestHarness, user: &str) -> Corpus {
    let read = seed(h, "Contract law", axis(0), 3);
    let a = seed(h, "Contract law", axis(1), 0);
    let near = seed(h, "Contract law", toward(1, 2, 0.99), 0);
    let d = seed(h, "Contract law", axis(3), 2);
    let e = seed(h, "Contract law", axis(4), 5);
    let f = seed(h, "Contract law", axis(5), 10);
    h.graph.record_read(user, read.id).await.unwrap();
    Corpus {
        read,
        a,
        near,
        d,
        e,
        f,
    }
}

// ---------------------------------------------------------------------------
// Cold start
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_without_reads_gets_popular_items() {
    let h = harness_with(MemoryGraph::new());
    let popular = seed(&h, "Patent law", axis(0), 1);
    seed(&h, "Maritime law", axis(1), 0);
    seed(&h, "Tax law", axis(2), 20);
    h.graph.record_read("reader-1", popular.id).await.unwrap();
    h.graph.record_read("reader-2", popular.id).await.unwrap();

    let request = RecommendRequest::builder().user_id("newcomer").limit(5).build();
    let items = h.ranking.recommend(&request).await.unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].content.id, popular.id);
    assert!(items.iter().all(|i| i.strategy == Strategy::ColdStart));
    assert!(items.iter().all(|i| i.components.is_none()));
    assert!(items
        .iter()
        .all(|i| i.explanation.as_deref().is_some_and(|e| e.starts_with("Recommended"))));
    assert!(items.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn cold_start_strategy_can_be_forced() {
    let h = harness_with(MemoryGraph::new());
    let c = corpus(&h, "reader").await;

    let request = RecommendRequest::builder()
        .user_id("reader")
        .strategy(Strategy::ColdStart)
        .include_explanations(false)
        .build();
    let items = h.ranking.recommend(&request).await.unwrap();

    assert!(!items.is_empty());
    assert!(items.iter().all(|i| i.strategy == Strategy::ColdStart));
    assert!(items.iter().all(|i| i.explanation.is_none()));
    // Cold start does not filter by the user's history.
    assert!(ids(&items).contains(&c.read.id));
}

#[tokio::test]
async fn failing_candidate_sources_fall_back_to_cold_start() {
    let h = harness_with(MemoryGraph::new().failing_candidate_reads());
    corpus(&h, "reader").await;

    let request = RecommendRequest::builder().user_id("reader").build();
    let items = h.ranking.recommend(&request).await.unwrap();

    assert!(!items.is_empty());
    assert!(items.iter().all(|i| i.strategy == Strategy::ColdStart));
}

// ---------------------------------------------------------------------------
// Personalized
// ---------------------------------------------------------------------------

#[tokio::test]
async fn personalized_results_exclude_read_items() {
    let h = harness_with(MemoryGraph::new());
    let c = corpus(&h, "reader").await;

    let request = RecommendRequest::builder().user_id("reader").limit(10).build();
    let items = h.ranking.recommend(&request).await.unwrap();

    assert_eq!(items.len(), 5);
    assert!(!ids(&items).contains(&c.read.id));
    assert!(items.iter().all(|i| i.strategy == Strategy::Personalized));
    assert!(items.iter().all(|i| i.components.is_some()));
    assert!(items.iter().all(|i| i.explanation.is_some()));
    assert!(items.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(items.last().unwrap().content.id, c.f.id);
}

#[tokio::test]
async fn diversity_drops_near_duplicates() {
    let h = harness_with(MemoryGraph::new());
    let c = corpus(&h, "reader").await;

    let request = RecommendRequest::builder().user_id("reader").limit(2).build();
    let items = h.ranking.recommend(&request).await.unwrap();
    let picked = ids(&items);

    assert_eq!(picked.len(), 2);
    assert!(picked.contains(&c.d.id));
    assert!(picked.contains(&c.a.id) ^ picked.contains(&c.near.id));
    assert!(!picked.contains(&c.e.id));
}

#[tokio::test]
async fn unembedded_candidates_compete_on_score_under_diversity() {
    let h = harness_with(MemoryGraph::new());
    let c = corpus(&h, "reader").await;
    // Only in the graph: no embedding for MMR to use.
    let graph_only = content_item("Contract law", Vec::new(), 0);
    h.graph.put(graph_only.to_ref());
    for rater in 0..10 {
        h.graph
            .record_rating(&format!("rater-{rater}"), graph_only.id, 5)
            .await
            .unwrap();
    }

    let request = RecommendRequest::builder().user_id("reader").limit(2).build();
    let items = h.ranking.recommend(&request).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].content.id, graph_only.id);
    assert!(items[0].score > items[1].score);
    assert!(c.a.id == items[1].content.id || c.near.id == items[1].content.id);
}

#[tokio::test]
async fn without_diversity_top_scores_win() {
    let h = harness_with(MemoryGraph::new());
    let c = corpus(&h, "reader").await;

    let request = RecommendRequest::builder()
        .user_id("reader")
        .limit(2)
        .apply_diversity(false)
        .build();
    let items = h.ranking.recommend(&request).await.unwrap();
    let picked = ids(&items);

    assert!(picked.contains(&c.a.id));
    assert!(picked.contains(&c.near.id));
}

#[tokio::test]
async fn similarity_neighbors_are_explained() {
    let h = harness_with(MemoryGraph::new());
    let read = seed(&h, "Contract law", axis(0), 0);
    let neighbor = seed(&h, "Contract drafting", toward(0, 1, 0.9), 0);
    seed(&h, "Astronomy", axis(7), 0);
    h.storage.similarity().rebuild().await.unwrap();
    h.graph.record_read("reader", read.id).await.unwrap();

    let request = RecommendRequest::builder().user_id("reader").build();
    let items = h.ranking.recommend(&request).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content.id, neighbor.id);
    let components = items[0].components.unwrap();
    assert!((components.similarity - 0.9).abs() < 1e-4);
    assert!(items[0]
        .explanation
        .as_deref()
        .unwrap()
        .contains("it's similar to articles you've read"));
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let h = harness_with(MemoryGraph::new());

    let blank = RecommendRequest::builder().user_id("  ").build();
    assert!(matches!(
        h.ranking.recommend(&blank).await,
        Err(SkillpathError::Validation(_))
    ));

    let zero = RecommendRequest::builder().user_id("reader").limit(0).build();
    assert!(h.ranking.recommend(&zero).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Interactions through the service
// ---------------------------------------------------------------------------

struct ServiceFixture {
    service: SkillsService,
    graph: Arc<MemoryGraph>,
    vectors: Arc<MemoryVectorStore>,
}

fn service() -> ServiceFixture {
    let graph = Arc::new(MemoryGraph::new());
    let vectors = Arc::new(MemoryVectorStore::new());
    let service = SkillsService::from_parts(
        Collaborators {
            generator: Arc::new(ScriptedGenerator::new()),
            judge: Arc::new(ScriptedJudge::uniform(80.0)),
            embedder: Arc::new(FixedEmbedder::new(TEST_EMBEDDING_DIM)),
            searcher: Arc::new(MockSearcher::empty()),
            vectors: vectors.clone(),
            graph: graph.clone(),
        },
        &test_tuning(),
    );
    ServiceFixture {
        service,
        graph,
        vectors,
    }
}

fn seed_service(f: &ServiceFixture, topic: &str) -> ContentItem {
    let item = content_item(topic, axis(0), 0);
    f.vectors.put(item.clone());
    f.graph.put(item.to_ref());
    item
}

#[tokio::test]
async fn reads_build_topic_affinity_and_history() {
    let f = service();
    let first = seed_service(&f, "Patent law");
    let second = seed_service(&f, "Patent law");

    f.service
        .record_interaction("reader", first.id, InteractionKind::Read, None)
        .await
        .unwrap();
    f.service
        .record_interaction("reader", second.id, InteractionKind::Read, None)
        .await
        .unwrap();
    f.service
        .record_interaction("reader", second.id, InteractionKind::Rate, Some(5))
        .await
        .unwrap();
    f.service
        .record_interaction("reader", second.id, InteractionKind::Bookmark, None)
        .await
        .unwrap();

    assert_eq!(f.graph.affinity("reader", "Patent law"), Some(2.0));
    assert!(f.graph.bookmarked("reader", second.id));

    let history = f.service.history("reader", 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content.id, second.id);
    assert_eq!(history[0].rating, Some(5));
    assert!(history[0].bookmarked);
    assert_eq!(history[1].rating, None);

    let stats = f.service.stats().await.unwrap();
    assert_eq!(stats.storage.total_items, 2);
    assert_eq!(stats.graph.users, 1);
    assert_eq!(stats.graph.interactions, 4);
}

#[tokio::test]
async fn each_read_raises_affinity_for_its_topic() {
    let h = harness_with(MemoryGraph::new());
    let item = seed(&h, "Maritime law", axis(0), 0);

    h.graph.record_read("reader", item.id).await.unwrap();
    h.graph.record_read("reader", item.id).await.unwrap();
    h.graph.record_read("reader", Uuid::new_v4()).await.unwrap();

    assert_eq!(h.graph.affinity("reader", "Maritime law"), Some(2.0));
    assert_eq!(h.graph.read_count("reader").await.unwrap(), 1);
}

#[tokio::test]
async fn interaction_validation() {
    let f = service();
    let item = seed_service(&f, "Patent law");

    let unknown = f
        .service
        .record_interaction("reader", Uuid::new_v4(), InteractionKind::Read, None)
        .await;
    assert!(matches!(unknown, Err(SkillpathError::NotFound { .. })));

    let blank = f
        .service
        .record_interaction(" ", item.id, InteractionKind::Read, None)
        .await;
    assert!(matches!(blank, Err(SkillpathError::Validation(_))));

    for rating in [None, Some(0), Some(6)] {
        let bad = f
            .service
            .record_interaction("reader", item.id, InteractionKind::Rate, rating)
            .await;
        assert!(matches!(bad, Err(SkillpathError::Validation(_))), "{rating:?}");
    }
    assert_eq!(f.graph.affinity("reader", "Patent law"), None);
}

#[tokio::test]
async fn reading_switches_user_to_personalized() {
    let f = service();
    let read = seed_service(&f, "Patent law");
    let unread = seed_service(&f, "Patent law");

    let before = f
        .service
        .recommend(&RecommendRequest::builder().user_id("reader").build())
        .await
        .unwrap();
    assert!(before.iter().all(|i| i.strategy == Strategy::ColdStart));

    f.service
        .record_interaction("reader", read.id, InteractionKind::Read, None)
        .await
        .unwrap();

    let after = f
        .service
        .recommend(&RecommendRequest::builder().user_id("reader").build())
        .await
        .unwrap();
    assert_eq!(ids(&after), vec![unread.id]);
    assert_eq!(after[0].strategy, Strategy::Personalized);
}
