use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::Regex;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use skillpath_common::config::{GenerationTuning, TimeoutTuning};
use skillpath_common::error::Result;
use skillpath_common::{
    BatchReport, EvaluationResult, GenerationOutcome, GenerationStatus, SkillpathError,
    DEFAULT_QUALITY_THRESHOLD,
};

use crate::judge::QualityJudge;
use crate::prompts;
use crate::storage::StorageCoordinator;
use crate::timeout::bounded;
use crate::traits::{TextGenerator, WebSearcher};

// =============================================================================
// Request / cancellation
// =============================================================================

#[derive(Debug, Clone, TypedBuilder)]
pub struct BatchRequest {
    pub topics: Vec<String>,
    #[builder(default = DEFAULT_QUALITY_THRESHOLD)]
    pub quality_threshold: f64,
    #[builder(default = 2)]
    pub max_regenerations: u32,
}

impl BatchRequest {
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(SkillpathError::validation("topic list is empty"));
        }
        if let Some(i) = self.topics.iter().position(|t| t.trim().is_empty()) {
            return Err(SkillpathError::validation(format!("topic #{} is blank", i + 1)));
        }
        if !(0.0..=100.0).contains(&self.quality_threshold) {
            return Err(SkillpathError::validation(format!(
                "quality_threshold must be within [0, 100], got {}",
                self.quality_threshold
            )));
        }
        Ok(())
    }
}

/// Stops a batch between topics. The topic in flight always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// State machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Search,
    Generate,
    Summarize,
    Evaluate,
    Regenerate,
    Store,
    Done,
    Failed,
}

/// Working state of one topic while it moves through the steps.
struct TopicRun {
    topic: String,
    context: String,
    content: String,
    summary: String,
    evaluation: Option<EvaluationResult>,
    regeneration_count: u32,
    content_id: Option<Uuid>,
    failure: Option<(String, bool)>,
}

impl TopicRun {
    fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            context: String::new(),
            content: String::new(),
            summary: String::new(),
            evaluation: None,
            regeneration_count: 0,
            content_id: None,
            failure: None,
        }
    }

    fn into_outcome(self) -> GenerationOutcome {
        let status = match self.failure {
            Some((reason, consistency)) => GenerationStatus::Failed { reason, consistency },
            None => GenerationStatus::Generated,
        };
        GenerationOutcome {
            topic: self.topic,
            status,
            content_id: self.content_id,
            content: self.content,
            summary: self.summary,
            evaluation: self.evaluation,
            regeneration_count: self.regeneration_count,
        }
    }
}

/// Search, generate, summarize, evaluate, regenerate on low quality, store.
///
/// Topics run one after another. Search, generation and summarization
/// failures degrade to empty text so every topic reaches evaluation and
/// storage; only a storage failure fails the topic.
pub struct GenerationLoop {
    generator: Arc<dyn TextGenerator>,
    searcher: Arc<dyn WebSearcher>,
    judge: Arc<QualityJudge>,
    storage: Arc<StorageCoordinator>,
    tuning: GenerationTuning,
    criterion_threshold: f64,
    timeouts: TimeoutTuning,
}

impl GenerationLoop {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        searcher: Arc<dyn WebSearcher>,
        judge: Arc<QualityJudge>,
        storage: Arc<StorageCoordinator>,
        tuning: GenerationTuning,
        timeouts: TimeoutTuning,
    ) -> Self {
        let criterion_threshold = judge.tuning().criterion_threshold;
        Self {
            generator,
            searcher,
            judge,
            storage,
            tuning,
            criterion_threshold,
            timeouts,
        }
    }

    pub async fn generate_batch(&self, request: &BatchRequest, cancel: &CancelFlag) -> Result<BatchReport> {
        request.validate()?;
        let started = Instant::now();
        info!(
            topics = request.topics.len(),
            quality_threshold = request.quality_threshold,
            max_regenerations = request.max_regenerations,
            "Starting generation batch"
        );

        let mut outcomes = Vec::with_capacity(request.topics.len());
        for (i, topic) in request.topics.iter().enumerate() {
            if cancel.is_cancelled() {
                let remaining = request.topics.len() - i;
                warn!(remaining, "Generation batch cancelled");
                return Ok(finish(outcomes, remaining, started));
            }
            let topic = topic.trim();
            info!(topic, index = i + 1, total = request.topics.len(), "Processing topic");
            outcomes.push(self.run_topic(topic, request).await);
        }

        Ok(finish(outcomes, 0, started))
    }

    async fn run_topic(&self, topic: &str, request: &BatchRequest) -> GenerationOutcome {
        match self
            .storage
            .find_duplicate(topic, self.tuning.duplicate_threshold)
            .await
        {
            Ok(Some((similar, score))) => {
                info!(topic, similar_topic = %similar, score, "Skipping near-duplicate topic");
                return GenerationOutcome::skipped(topic, Some(similar));
            }
            Ok(None) => {}
            Err(e) => warn!(topic, error = %e, "Duplicate check failed, generating anyway"),
        }

        let mut run = TopicRun::new(topic);
        let mut step = Step::Search;
        loop {
            debug!(topic, ?step, regeneration_count = run.regeneration_count, "Step");
            step = match step {
                Step::Search => {
                    run.context = self.search(topic).await;
                    Step::Generate
                }
                Step::Generate => {
                    run.content = self.write_article(topic, &run.context, None).await;
                    Step::Summarize
                }
                Step::Summarize => {
                    run.summary = self.summarize(topic, &run.content).await;
                    Step::Evaluate
                }
                Step::Evaluate => {
                    let reference = Some(run.context.as_str()).filter(|c| !c.is_empty());
                    let evaluation = self
                        .judge
                        .evaluate_against(&run.content, topic, reference, request.quality_threshold)
                        .await;
                    let next = if evaluation.passed {
                        Step::Store
                    } else if run.regeneration_count >= request.max_regenerations {
                        info!(
                            topic,
                            overall = evaluation.overall_score,
                            "Regeneration budget spent, storing best effort"
                        );
                        Step::Store
                    } else {
                        Step::Regenerate
                    };
                    run.evaluation = Some(evaluation);
                    next
                }
                Step::Regenerate => {
                    run.regeneration_count += 1;
                    let feedback = run
                        .evaluation
                        .as_ref()
                        .map(|e| e.feedback(self.criterion_threshold))
                        .unwrap_or_default();
                    info!(topic, attempt = run.regeneration_count, "Regenerating with feedback");
                    run.content = self
                        .write_article(topic, &run.context, Some(&feedback))
                        .await;
                    run.summary = self.summarize(topic, &run.content).await;
                    Step::Evaluate
                }
                Step::Store => {
                    match self
                        .storage
                        .save(topic, &run.content, &run.summary, &self.tuning.author)
                        .await
                    {
                        Ok(id) => {
                            run.content_id = Some(id);
                            Step::Done
                        }
                        Err(e) => {
                            warn!(topic, error = %e, "Storing content failed");
                            run.failure = Some((e.to_string(), e.is_consistency()));
                            Step::Failed
                        }
                    }
                }
                Step::Done | Step::Failed => break,
            };
        }

        run.into_outcome()
    }

    async fn search(&self, topic: &str) -> String {
        let results = bounded(
            self.timeouts.search(),
            "web search",
            self.searcher.search(topic, self.tuning.search_results),
        )
        .await;
        match results {
            Ok(results) => results
                .iter()
                .map(|r| r.content.trim())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => {
                warn!(topic, error = %e, "Search failed, continuing without context");
                String::new()
            }
        }
    }

    async fn write_article(&self, topic: &str, context: &str, feedback: Option<&str>) -> String {
        let prompt = prompts::article(topic, context, feedback);
        self.generate_or_empty(topic, "article", &prompt, &self.tuning.article_sampling)
            .await
    }

    async fn summarize(&self, topic: &str, content: &str) -> String {
        if content.trim().is_empty() {
            return String::new();
        }
        let prompt = prompts::vocabulary_summary(content);
        self.generate_or_empty(topic, "summary", &prompt, &self.tuning.summary_sampling)
            .await
    }

    async fn generate_or_empty(
        &self,
        topic: &str,
        what: &str,
        prompt: &str,
        params: &skillpath_common::SamplingParams,
    ) -> String {
        match bounded(self.timeouts.llm(), what, self.generator.generate(prompt, params)).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(topic, what, error = %e, "Generation failed, substituting empty text");
                String::new()
            }
        }
    }

    /// Ask the generator for `n` article topics.
    pub async fn suggest_topics(&self, n: usize) -> Result<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let raw = bounded(
            self.timeouts.llm(),
            "topic suggestion",
            self.generator
                .generate(&prompts::topic_suggestions(n), &self.tuning.topic_sampling),
        )
        .await
        .map_err(|e| SkillpathError::transient("generation", e))?;
        let topics = parse_topic_list(&raw, n);
        info!(requested = n, parsed = topics.len(), "Suggested topics");
        Ok(topics)
    }
}

fn finish(outcomes: Vec<GenerationOutcome>, cancelled: usize, started: Instant) -> BatchReport {
    let report = BatchReport::from_outcomes(outcomes, cancelled, started.elapsed().as_millis() as u64);
    info!(
        generated = report.generated,
        skipped = report.skipped,
        failed = report.failed,
        cancelled = report.cancelled,
        total_regenerations = report.total_regenerations,
        average_quality = ?report.average_quality,
        duration_ms = report.duration_ms,
        "Generation batch complete"
    );
    report
}

static RE_NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s*(.+)$").expect("valid regex"));

/// Pull topics out of a numbered list. Single-word entries are dropped.
fn parse_topic_list(raw: &str, n: usize) -> Vec<String> {
    RE_NUMBERED_LINE
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .trim_matches(|ch: char| matches!(ch, ' ' | '-' | '*' | '_' | '"'))
                .to_string()
        })
        .filter(|t| t.split_whitespace().count() > 1)
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_topics() {
        let raw = "Here you go:\n1. **The Future of Renewable Energy**\n2) Quantum Computing Basics\n3. AI\n4. \"Ethics in Medicine\"\n";
        let topics = parse_topic_list(raw, 5);
        assert_eq!(
            topics,
            vec![
                "The Future of Renewable Energy",
                "Quantum Computing Basics",
                "Ethics in Medicine"
            ]
        );
    }

    #[test]
    fn topic_list_is_capped() {
        let raw = "1. Alpha beta\n2. Gamma delta\n3. Epsilon zeta";
        assert_eq!(parse_topic_list(raw, 2).len(), 2);
    }

    #[test]
    fn request_validation() {
        let ok = BatchRequest::builder().topics(vec!["A topic".into()]).build();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.max_regenerations, 2);

        let empty = BatchRequest::builder().topics(vec![]).build();
        assert!(matches!(empty.validate(), Err(SkillpathError::Validation(_))));

        let blank = BatchRequest::builder().topics(vec!["x".into(), "  ".into()]).build();
        assert!(matches!(blank.validate(), Err(SkillpathError::Validation(_))));

        let bad = BatchRequest::builder()
            .topics(vec!["x".into()])
            .quality_threshold(101.0)
            .build();
        assert!(matches!(bad.validate(), Err(SkillpathError::Validation(_))));
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
    }
}
