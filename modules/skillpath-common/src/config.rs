use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::SkillpathError;
use crate::types::SamplingParams;

// =============================================================================
// Environment (secrets and endpoints)
// =============================================================================

/// Connection settings and credentials loaded from environment variables.
/// Tunable behavior lives in [`Tuning`].
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Postgres (pgvector)
    pub database_url: String,

    // Generation model
    pub llm_api_key: String,
    pub llm_base_url: Option<String>,
    pub llm_model: String,

    // Judge model, each field falls back to the generation model's
    pub judge_api_key: String,
    pub judge_base_url: Option<String>,
    pub judge_model: String,

    // Embeddings
    pub embedding_api_key: String,
    pub embedding_base_url: Option<String>,
    pub embedding_model: String,

    // Search
    pub tavily_api_key: Option<String>,

    /// Optional path to a TOML tuning file.
    pub tuning_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let llm_api_key = required_env("LLM_API_KEY")?;
        let llm_base_url = optional_env("LLM_BASE_URL");
        let llm_model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let config = Self {
            neo4j_uri: required_env("NEO4J_URI")?,
            neo4j_user: required_env("NEO4J_USER")?,
            neo4j_password: required_env("NEO4J_PASSWORD")?,
            database_url: required_env("DATABASE_URL")?,
            judge_api_key: optional_env("JUDGE_LLM_API_KEY").unwrap_or_else(|| llm_api_key.clone()),
            judge_base_url: optional_env("JUDGE_LLM_BASE_URL").or_else(|| llm_base_url.clone()),
            judge_model: optional_env("JUDGE_LLM_MODEL").unwrap_or_else(|| llm_model.clone()),
            embedding_api_key: optional_env("EMBEDDING_API_KEY")
                .unwrap_or_else(|| llm_api_key.clone()),
            embedding_base_url: optional_env("EMBEDDING_BASE_URL")
                .or_else(|| llm_base_url.clone()),
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            tavily_api_key: optional_env("TAVILY_API_KEY"),
            tuning_path: optional_env("SKILLPATH_CONFIG"),
            llm_api_key,
            llm_base_url,
            llm_model,
        };

        config.log_keys();
        Ok(config)
    }

    /// True when the judge is a different model than the generator.
    pub fn separate_judge(&self) -> bool {
        self.judge_model != self.llm_model || self.judge_base_url != self.llm_base_url
    }

    /// Load tuning from `SKILLPATH_CONFIG` if set, defaults otherwise.
    pub fn load_tuning(&self) -> Result<Tuning> {
        match &self.tuning_path {
            Some(path) => Tuning::load(Path::new(path)),
            None => Ok(Tuning::default()),
        }
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            let head = val.get(..n).unwrap_or("");
            format!("{}...({} chars)", head, val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  NEO4J_URI: {}", self.neo4j_uri);
        tracing::info!("  LLM_MODEL: {}", self.llm_model);
        tracing::info!("  LLM_API_KEY: {}", preview(&self.llm_api_key));
        tracing::info!(
            "  JUDGE_LLM_MODEL: {} (separate: {})",
            self.judge_model,
            self.separate_judge()
        );
        tracing::info!("  JUDGE_LLM_API_KEY: {}", preview(&self.judge_api_key));
        tracing::info!("  EMBEDDING_MODEL: {}", self.embedding_model);
        tracing::info!("  TAVILY_API_KEY: {}", preview_opt(&self.tavily_api_key));
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} environment variable is required"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Tuning (TOML)
// =============================================================================

/// Behavior knobs. Every field has a default so a partial file is valid.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    pub judge: JudgeTuning,
    pub generation: GenerationTuning,
    pub similarity: SimilarityTuning,
    pub ranking: RankingTuning,
    pub timeouts: TimeoutTuning,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JudgeTuning {
    pub performance_weight: f64,
    pub alignment_weight: f64,
    pub quality_threshold: f64,
    pub criterion_threshold: f64,
    /// Pause before the first judge call of an evaluation.
    pub initial_delay_ms: u64,
    /// Minimum spacing between any two judge calls.
    pub cooldown_ms: u64,
    pub performance_sampling: SamplingParams,
    pub alignment_sampling: SamplingParams,
    pub target_audience: String,
    pub expected_tone: String,
    pub expected_style: String,
    /// Characters of search context shown to the judge for fact checking.
    pub reference_context_chars: usize,
}

impl Default for JudgeTuning {
    fn default() -> Self {
        Self {
            performance_weight: 0.6,
            alignment_weight: 0.4,
            quality_threshold: 70.0,
            criterion_threshold: 70.0,
            initial_delay_ms: 5_000,
            cooldown_ms: 7_000,
            performance_sampling: SamplingParams::new(0.2, 1200).with_top_p(0.9),
            alignment_sampling: SamplingParams::new(0.2, 1000).with_top_p(0.9),
            target_audience: "translator students".to_string(),
            expected_tone: "professional, educational".to_string(),
            expected_style: "formal, factual, informative".to_string(),
            reference_context_chars: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationTuning {
    pub max_regenerations: u32,
    pub duplicate_threshold: f64,
    pub search_results: usize,
    pub article_sampling: SamplingParams,
    pub summary_sampling: SamplingParams,
    pub topic_sampling: SamplingParams,
    pub author: String,
}

impl Default for GenerationTuning {
    fn default() -> Self {
        Self {
            max_regenerations: 2,
            duplicate_threshold: 0.85,
            search_results: 3,
            article_sampling: SamplingParams::new(0.7, 1200),
            summary_sampling: SamplingParams::new(0.3, 600),
            topic_sampling: SamplingParams::new(0.7, 250),
            author: "AI".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimilarityTuning {
    pub threshold: f64,
}

impl Default for SimilarityTuning {
    fn default() -> Self {
        Self { threshold: 0.70 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingTuning {
    pub similarity_weight: f64,
    pub topic_weight: f64,
    pub rating_weight: f64,
    pub recency_weight: f64,
    /// Relevance share in the MMR objective; the rest penalizes redundancy.
    pub mmr_lambda: f64,
    /// Reads of a topic at which affinity saturates to 1.0.
    pub affinity_saturation: f64,
    /// Ratings needed for full confidence in an average.
    pub rating_confidence_count: f64,
    pub recency_decay_days: f64,
}

impl Default for RankingTuning {
    fn default() -> Self {
        Self {
            similarity_weight: 0.35,
            topic_weight: 0.20,
            rating_weight: 0.30,
            recency_weight: 0.15,
            mmr_lambda: 0.7,
            affinity_saturation: 20.0,
            rating_confidence_count: 10.0,
            recency_decay_days: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutTuning {
    pub llm_secs: u64,
    pub judge_secs: u64,
    pub store_secs: u64,
    pub search_secs: u64,
}

impl Default for TimeoutTuning {
    fn default() -> Self {
        Self {
            llm_secs: 120,
            judge_secs: 120,
            store_secs: 30,
            search_secs: 30,
        }
    }
}

impl TimeoutTuning {
    pub fn llm(&self) -> Duration {
        Duration::from_secs(self.llm_secs)
    }

    pub fn judge(&self) -> Duration {
        Duration::from_secs(self.judge_secs)
    }

    pub fn store(&self) -> Duration {
        Duration::from_secs(self.store_secs)
    }

    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }
}

impl Tuning {
    /// Load and validate a TOML tuning file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let tuning = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(tuning)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let tuning: Tuning = toml::from_str(content)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), SkillpathError> {
        let j = &self.judge;
        check_score("judge.quality_threshold", j.quality_threshold)?;
        check_score("judge.criterion_threshold", j.criterion_threshold)?;
        check_weights(
            "judge",
            &[
                ("performance_weight", j.performance_weight),
                ("alignment_weight", j.alignment_weight),
            ],
        )?;

        let g = &self.generation;
        check_unit_interval("generation.duplicate_threshold", g.duplicate_threshold)?;
        check_cosine("similarity.threshold", self.similarity.threshold)?;

        let r = &self.ranking;
        check_weights(
            "ranking",
            &[
                ("similarity_weight", r.similarity_weight),
                ("topic_weight", r.topic_weight),
                ("rating_weight", r.rating_weight),
                ("recency_weight", r.recency_weight),
            ],
        )?;
        check_unit_interval("ranking.mmr_lambda", r.mmr_lambda)?;
        for (name, v) in [
            ("ranking.affinity_saturation", r.affinity_saturation),
            ("ranking.rating_confidence_count", r.rating_confidence_count),
            ("ranking.recency_decay_days", r.recency_decay_days),
        ] {
            if !(v > 0.0) {
                return Err(SkillpathError::Validation(format!("{name} must be positive, got {v}")));
            }
        }
        Ok(())
    }
}

fn check_score(name: &str, v: f64) -> Result<(), SkillpathError> {
    if !(0.0..=100.0).contains(&v) {
        return Err(SkillpathError::Validation(format!(
            "{name} must be within [0, 100], got {v}"
        )));
    }
    Ok(())
}

fn check_unit_interval(name: &str, v: f64) -> Result<(), SkillpathError> {
    if !(0.0..=1.0).contains(&v) {
        return Err(SkillpathError::Validation(format!(
            "{name} must be within [0, 1], got {v}"
        )));
    }
    Ok(())
}

fn check_cosine(name: &str, v: f64) -> Result<(), SkillpathError> {
    if !(-1.0..=1.0).contains(&v) {
        return Err(SkillpathError::Validation(format!(
            "{name} must be within [-1, 1], got {v}"
        )));
    }
    Ok(())
}

fn check_weights(group: &str, weights: &[(&str, f64)]) -> Result<(), SkillpathError> {
    for (name, w) in weights {
        if !w.is_finite() || *w < 0.0 {
            return Err(SkillpathError::Validation(format!(
                "{group}.{name} must be a non-negative number, got {w}"
            )));
        }
    }
    if weights.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
        return Err(SkillpathError::Validation(format!(
            "{group} weights must not all be zero"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let t = Tuning::from_toml(
            r#"
            [judge]
            quality_threshold = 80.0

            [ranking]
            recency_weight = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(t.judge.quality_threshold, 80.0);
        assert_eq!(t.judge.performance_weight, 0.6);
        assert_eq!(t.ranking.recency_weight, 0.5);
        assert_eq!(t.generation.max_regenerations, 2);
    }

    #[test]
    fn sampling_tables_parse() {
        let t = Tuning::from_toml(
            r#"
            [generation.article_sampling]
            temperature = 0.5
            max_tokens = 900
            "#,
        )
        .unwrap();
        assert_eq!(t.generation.article_sampling.max_tokens, 900);
        assert_eq!(t.generation.article_sampling.top_p, None);
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut t = Tuning::default();
        t.judge.quality_threshold = 120.0;
        assert!(matches!(t.validate(), Err(SkillpathError::Validation(_))));
    }

    #[test]
    fn negative_or_zero_weights_rejected() {
        let mut t = Tuning::default();
        t.ranking.topic_weight = -0.1;
        assert!(t.validate().is_err());

        let mut t = Tuning::default();
        t.ranking = RankingTuning {
            similarity_weight: 0.0,
            topic_weight: 0.0,
            rating_weight: 0.0,
            recency_weight: 0.0,
            ..RankingTuning::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(Tuning::from_toml("[judge]\nbogus = 1\n").is_err());
    }
}
