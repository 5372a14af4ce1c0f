use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SkillpathError;
use crate::quality::EvaluationResult;

// --- Content ----------------------------------------------------------------

/// A generated unit of learning content. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub topic: String,
    pub body: String,
    /// Vocabulary digest derived from `body`.
    pub auxiliary_summary: String,
    pub author: String,
    /// Unit-normalized embedding of `"{topic}: {body}"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// Display title. Generated content is titled by its topic.
    pub fn title(&self) -> &str {
        &self.topic
    }

    pub fn to_ref(&self) -> ContentRef {
        ContentRef {
            id: self.id,
            title: self.topic.clone(),
            topic: self.topic.clone(),
            created_at: Some(self.created_at),
        }
    }
}

/// Lightweight view of a content node as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRef {
    pub id: Uuid,
    pub title: String,
    pub topic: String,
    /// `None` when the stored timestamp is missing or unparseable.
    pub created_at: Option<DateTime<Utc>>,
}

/// Metadata filter for vector store reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorFilter {
    pub topic: Option<String>,
    pub author: Option<String>,
}

impl VectorFilter {
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, item: &ContentItem) -> bool {
        self.topic.as_deref().map_or(true, |t| t == item.topic)
            && self.author.as_deref().map_or(true, |a| a == item.author)
    }
}

/// One nearest-neighbor result. `distance` is cosine distance (1 - similarity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestHit {
    pub id: Uuid,
    pub topic: String,
    pub distance: f64,
}

impl NearestHit {
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

// --- Similarity graph ---------------------------------------------------------

/// Directed `SIMILAR_TO` relationship between two content items.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub from: Uuid,
    pub to: Uuid,
    pub score: f64,
}

// --- Interactions -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Read,
    Rate,
    Bookmark,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionKind::Read => write!(f, "read"),
            InteractionKind::Rate => write!(f, "rate"),
            InteractionKind::Bookmark => write!(f, "bookmark"),
        }
    }
}

impl FromStr for InteractionKind {
    type Err = SkillpathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(InteractionKind::Read),
            "rate" => Ok(InteractionKind::Rate),
            "bookmark" => Ok(InteractionKind::Bookmark),
            other => Err(SkillpathError::Validation(format!(
                "unknown interaction kind '{other}' (expected read, rate or bookmark)"
            ))),
        }
    }
}

// --- Graph read models ------------------------------------------------------

/// Candidate reached through a `SIMILAR_TO` edge from something the user read.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub content: ContentRef,
    pub score: f64,
}

/// Candidate whose topic the user has read before.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicHit {
    pub content: ContentRef,
}

/// Candidate with at least one rating from any user.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingHit {
    pub content: ContentRef,
    pub avg_rating: f64,
    pub rating_count: u32,
}

/// Popularity aggregates used by cold start.
#[derive(Debug, Clone, PartialEq)]
pub struct PopularityRow {
    pub content: ContentRef,
    pub read_count: u64,
    pub avg_rating: Option<f64>,
    pub rating_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub content: ContentRef,
    pub rating: Option<u8>,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub contents: u64,
    pub users: u64,
    pub interactions: u64,
    pub topics: u64,
    pub similarity_edges: u64,
}

// --- Ranking ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Personalized,
    ColdStart,
}

impl FromStr for Strategy {
    type Err = SkillpathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "personalized" => Ok(Strategy::Personalized),
            "cold_start" => Ok(Strategy::ColdStart),
            other => Err(SkillpathError::Validation(format!(
                "unknown strategy '{other}' (expected personalized or cold_start)"
            ))),
        }
    }
}

/// Which candidate source surfaced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Similarity,
    Topic,
    Rating,
}

/// Normalized [0,1] scoring components of a personalized recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub similarity: f64,
    pub topic: f64,
    pub rating: f64,
    pub recency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub content: ContentRef,
    pub score: f64,
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SignalSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

// --- Generation ---------------------------------------------------------------

/// Sampling parameters for one text-generation or judge call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl SamplingParams {
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
            top_p: None,
        }
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationStatus {
    Generated,
    /// A semantically near-duplicate topic already exists.
    Skipped { similar_topic: Option<String> },
    /// Storage failed. `consistency` marks a half-written item.
    Failed { reason: String, consistency: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub topic: String,
    #[serde(flatten)]
    pub status: GenerationStatus,
    pub content_id: Option<Uuid>,
    pub content: String,
    pub summary: String,
    pub evaluation: Option<EvaluationResult>,
    pub regeneration_count: u32,
}

impl GenerationOutcome {
    pub fn skipped(topic: impl Into<String>, similar_topic: Option<String>) -> Self {
        Self {
            topic: topic.into(),
            status: GenerationStatus::Skipped { similar_topic },
            content_id: None,
            content: String::new(),
            summary: String::new(),
            evaluation: None,
            regeneration_count: 0,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.status, GenerationStatus::Generated)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, GenerationStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, GenerationStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<GenerationOutcome>,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Topics never attempted because the batch was cancelled.
    pub cancelled: usize,
    pub total_regenerations: u32,
    /// Mean overall score across generated items, if any were generated.
    pub average_quality: Option<f64>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<GenerationOutcome>, cancelled: usize, duration_ms: u64) -> Self {
        let generated = outcomes.iter().filter(|o| o.is_generated()).count();
        let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        let total_regenerations = outcomes.iter().map(|o| o.regeneration_count).sum();
        let scores: Vec<f64> = outcomes
            .iter()
            .filter(|o| o.is_generated())
            .filter_map(|o| o.evaluation.as_ref().map(|e| e.overall_score))
            .collect();
        let average_quality = if scores.is_empty() {
            None
        } else {
            Some(round2(scores.iter().sum::<f64>() / scores.len() as f64))
        };
        Self {
            outcomes,
            generated,
            skipped,
            failed,
            cancelled,
            total_regenerations,
            average_quality,
            duration_ms,
        }
    }
}

// --- Stats ------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_items: u64,
    pub unique_topics: u64,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(flatten)]
    pub storage: StorageStats,
    pub graph: GraphStats,
}

/// Round to two decimals, the precision scores are reported at.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{AlignmentReport, CriterionScore, EvaluationResult, PerformanceReport};

    fn eval(score: f64) -> EvaluationResult {
        let c = CriterionScore::new(score, "");
        EvaluationResult::from_reports(
            PerformanceReport::new(c.clone(), c.clone(), c.clone()),
            AlignmentReport::new(c.clone(), c),
            0.6,
            0.4,
            70.0,
            false,
        )
    }

    fn generated(topic: &str, score: f64, regens: u32) -> GenerationOutcome {
        GenerationOutcome {
            topic: topic.into(),
            status: GenerationStatus::Generated,
            content_id: Some(Uuid::new_v4()),
            content: "body".into(),
            summary: "summary".into(),
            evaluation: Some(eval(score)),
            regeneration_count: regens,
        }
    }

    #[test]
    fn interaction_kind_parses_case_insensitively() {
        assert_eq!("READ".parse::<InteractionKind>().unwrap(), InteractionKind::Read);
        assert_eq!(" rate ".parse::<InteractionKind>().unwrap(), InteractionKind::Rate);
        assert!(matches!(
            "like".parse::<InteractionKind>(),
            Err(SkillpathError::Validation(_))
        ));
    }

    #[test]
    fn strategy_accepts_hyphenated_cold_start() {
        assert_eq!("cold-start".parse::<Strategy>().unwrap(), Strategy::ColdStart);
        assert_eq!("personalized".parse::<Strategy>().unwrap(), Strategy::Personalized);
    }

    #[test]
    fn batch_report_counts_by_status() {
        let mut failed = generated("c", 0.0, 2);
        failed.status = GenerationStatus::Failed {
            reason: "graph down".into(),
            consistency: true,
        };
        failed.content_id = None;
        let report = BatchReport::from_outcomes(
            vec![
                generated("a", 80.0, 0),
                generated("b", 70.0, 1),
                GenerationOutcome::skipped("a again", Some("a".into())),
                failed,
            ],
            0,
            12,
        );
        assert_eq!(report.generated, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total_regenerations, 3);
        assert_eq!(report.average_quality, Some(75.0));
    }

    #[test]
    fn outcome_serializes_status_inline() {
        let json = serde_json::to_value(GenerationOutcome::skipped("x", None)).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["topic"], "x");
    }

    #[test]
    fn vector_filter_matches_on_all_set_fields() {
        let item = ContentItem {
            id: Uuid::new_v4(),
            topic: "Contract law".into(),
            body: String::new(),
            auxiliary_summary: String::new(),
            author: "AI".into(),
            embedding: vec![],
            created_at: Utc::now(),
        };
        assert!(VectorFilter::default().matches(&item));
        assert!(VectorFilter::topic("Contract law").matches(&item));
        assert!(!VectorFilter::topic("Patents").matches(&item));
    }
}
