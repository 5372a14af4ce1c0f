use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ai_client::{extract_json_object, strip_code_blocks, truncate_to_char_boundary};
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use skillpath_common::config::JudgeTuning;
use skillpath_common::{
    AlignmentReport, CriterionScore, EvaluationResult, PerformanceReport, SamplingParams,
};

use crate::prompts;
use crate::timeout::bounded;
use crate::traits::JudgeBackend;

/// Raw judge output kept in logs when it can't be parsed.
const RAW_LOG_BYTES: usize = 500;

// =============================================================================
// CooldownGate
// =============================================================================

/// Minimum spacing between consecutive calls to one backend.
///
/// One gate exists per judge backend and is shared by everything that calls
/// it, so spacing holds across topics even when they run concurrently.
pub struct CooldownGate {
    spacing: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl CooldownGate {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_finished: Mutex::new(None),
        }
    }

    /// Wait out the cooldown, then run `fut` while holding the gate.
    pub async fn run<T, F>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last = self.last_finished.lock().await;
        if let Some(finished) = *last {
            let ready_at = finished + self.spacing;
            if ready_at > Instant::now() {
                debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "Judge cooldown");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        let out = fut.await;
        *last = Some(Instant::now());
        out
    }
}

// =============================================================================
// Judge response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct WireCriterion {
    score: f64,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    style_strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    questionable_claims: Vec<String>,
    #[serde(default)]
    off_topic_sections: Vec<String>,
    #[serde(default)]
    tone_issues: Vec<String>,
    #[serde(default)]
    style_issues: Vec<String>,
    #[serde(default)]
    vocabulary_level: Option<String>,
}

impl WireCriterion {
    fn into_score(self) -> CriterionScore {
        let issues: Vec<String> = [
            self.errors,
            self.questionable_claims,
            self.weaknesses,
            self.off_topic_sections,
            self.tone_issues,
            self.style_issues,
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
        let strengths = self
            .strengths
            .into_iter()
            .chain(self.style_strengths)
            .filter(|s| !s.trim().is_empty())
            .collect();
        CriterionScore::new(self.score, self.explanation)
            .with_issues(issues)
            .with_strengths(strengths)
    }
}

#[derive(Debug, Deserialize)]
struct WirePerformance {
    usefulness: WireCriterion,
    factuality: WireCriterion,
    relevance: WireCriterion,
}

#[derive(Debug, Deserialize)]
struct WireAlignment {
    tone: WireCriterion,
    style: WireCriterion,
}

/// Parse a judge response, tolerating code fences and stray prose around the JSON object.
fn parse_judge_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let stripped = strip_code_blocks(raw);
    match serde_json::from_str(stripped) {
        Ok(v) => Ok(v),
        Err(first) => match extract_json_object(stripped) {
            Some(object) => Ok(serde_json::from_str(object)?),
            None => Err(first.into()),
        },
    }
}

fn parse_performance(raw: &str) -> Result<PerformanceReport> {
    let w: WirePerformance = parse_judge_json(raw)?;
    Ok(PerformanceReport::new(
        w.usefulness.into_score(),
        w.factuality.into_score(),
        w.relevance.into_score(),
    ))
}

fn parse_alignment(raw: &str) -> Result<AlignmentReport> {
    let w: WireAlignment = parse_judge_json(raw)?;
    let vocabulary_level = w.style.vocabulary_level.clone();
    let mut report = AlignmentReport::new(w.tone.into_score(), w.style.into_score());
    report.vocabulary_level = vocabulary_level;
    Ok(report)
}

// =============================================================================
// QualityJudge
// =============================================================================

/// Scores content with two judge calls (task performance, then alignment)
/// and folds them into a weighted [`EvaluationResult`].
///
/// Never fails: unusable or missing judge output becomes neutral scores
/// with `fallback` set, so the generation loop always has a number to act on.
pub struct QualityJudge {
    backend: Arc<dyn JudgeBackend>,
    gate: Arc<CooldownGate>,
    tuning: JudgeTuning,
    call_timeout: Duration,
}

impl QualityJudge {
    pub fn new(
        backend: Arc<dyn JudgeBackend>,
        gate: Arc<CooldownGate>,
        tuning: JudgeTuning,
        call_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            gate,
            tuning,
            call_timeout,
        }
    }

    pub fn tuning(&self) -> &JudgeTuning {
        &self.tuning
    }

    /// Evaluate against the configured quality threshold.
    pub async fn evaluate(&self, content: &str, topic: &str, reference: Option<&str>) -> EvaluationResult {
        self.evaluate_against(content, topic, reference, self.tuning.quality_threshold)
            .await
    }

    pub async fn evaluate_against(
        &self,
        content: &str,
        topic: &str,
        reference: Option<&str>,
        quality_threshold: f64,
    ) -> EvaluationResult {
        if self.tuning.initial_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.tuning.initial_delay_ms)).await;
        }

        let reference = reference
            .map(|r| truncate_to_char_boundary(r, self.tuning.reference_context_chars));

        let mut fallback = false;
        let perf_prompt = prompts::performance_evaluation(content, topic, reference);
        let performance = match self
            .call(
                "performance",
                &perf_prompt,
                prompts::PERFORMANCE_SYSTEM_PROMPT,
                &self.tuning.performance_sampling,
            )
            .await
            .and_then(|raw| parse_or_log("performance", &raw, parse_performance))
        {
            Some(report) => report,
            None => {
                warn!(topic, "Performance evaluation unusable, applying neutral scores");
                fallback = true;
                PerformanceReport::neutral()
            }
        };

        let align_prompt = prompts::alignment_evaluation(
            content,
            &self.tuning.target_audience,
            &self.tuning.expected_tone,
            &self.tuning.expected_style,
        );
        let alignment = match self
            .call(
                "alignment",
                &align_prompt,
                prompts::ALIGNMENT_SYSTEM_PROMPT,
                &self.tuning.alignment_sampling,
            )
            .await
            .and_then(|raw| parse_or_log("alignment", &raw, parse_alignment))
        {
            Some(report) => report,
            None => {
                warn!(topic, "Alignment evaluation unusable, applying neutral scores");
                fallback = true;
                AlignmentReport::neutral()
            }
        };

        let result = EvaluationResult::from_reports(
            performance,
            alignment,
            self.tuning.performance_weight,
            self.tuning.alignment_weight,
            quality_threshold,
            fallback,
        );
        info!(
            topic,
            overall = result.overall_score,
            performance = result.performance.average,
            alignment = result.alignment.average,
            passed = result.passed,
            fallback = result.fallback,
            "Evaluation complete"
        );
        result
    }

    /// One gated, bounded judge call. Transport failures and timeouts are
    /// logged and reported as `None`.
    async fn call(
        &self,
        group: &str,
        prompt: &str,
        system_prompt: &str,
        params: &SamplingParams,
    ) -> Option<String> {
        let what = format!("{group} judge call");
        let outcome = self
            .gate
            .run(bounded(
                self.call_timeout,
                &what,
                self.backend.judge(prompt, system_prompt, params),
            ))
            .await;
        match outcome {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!(group, error = %e, "Judge call failed");
                None
            }
        }
    }
}

fn parse_or_log<T>(group: &str, raw: &str, parse: impl Fn(&str) -> Result<T>) -> Option<T> {
    match parse(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(
                group,
                error = %e,
                raw = truncate_to_char_boundary(raw, RAW_LOG_BYTES),
                "Failed to parse judge response"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERF: &str = r#"{
        "usefulness": {"score": 82, "explanation": "clear", "strengths": ["examples"], "weaknesses": []},
        "factuality": {"score": 64, "explanation": "one slip", "errors": ["wrong year"]},
        "relevance": {"score": 91, "explanation": "focused"},
        "average_score": 79
    }"#;

    #[test]
    fn parses_fenced_performance_json() {
        let raw = format!("```json\n{PERF}\n```");
        let r = parse_performance(&raw).unwrap();
        assert_eq!(r.usefulness.score, 82.0);
        assert_eq!(r.factuality.issues, vec!["wrong year".to_string()]);
        assert_eq!(r.average, 79.0);
    }

    #[test]
    fn recomputes_average_instead_of_trusting_judge() {
        let raw = PERF.replace("\"average_score\": 79", "\"average_score\": 12");
        assert_eq!(parse_performance(&raw).unwrap().average, 79.0);
    }

    #[test]
    fn finds_json_inside_prose() {
        let raw = r#"Here is my evaluation: {"tone": {"score": 70, "explanation": "ok"},
            "style": {"score": 90, "explanation": "good", "vocabulary_level": "appropriate"}} Thanks!"#;
        let r = parse_alignment(raw).unwrap();
        assert_eq!(r.average, 80.0);
        assert_eq!(r.vocabulary_level.as_deref(), Some("appropriate"));
    }

    #[test]
    fn rejects_missing_criteria() {
        assert!(parse_alignment(r#"{"tone": {"score": 70}}"#).is_err());
        assert!(parse_performance("not json at all").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn gate_spaces_consecutive_calls() {
        let gate = CooldownGate::new(Duration::from_secs(7));
        let start = Instant::now();
        gate.run(async {}).await;
        assert!(start.elapsed() < Duration::from_secs(1));
        gate.run(async {}).await;
        assert!(start.elapsed() >= Duration::from_secs(7));
    }
}
