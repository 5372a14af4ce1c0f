use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::types::round2;

/// Score every criterion gets when the judge response cannot be used.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Default overall score required to accept generated content.
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 70.0;

/// Criteria scoring below this are folded into regeneration feedback.
pub const DEFAULT_CRITERION_THRESHOLD: f64 = 70.0;

// --- Criteria ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionGroup {
    /// Usefulness, factuality, relevance.
    Performance,
    /// Tone, style.
    Alignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Usefulness,
    Factuality,
    Relevance,
    Tone,
    Style,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Usefulness,
        Criterion::Factuality,
        Criterion::Relevance,
        Criterion::Tone,
        Criterion::Style,
    ];

    pub fn group(&self) -> CriterionGroup {
        match self {
            Criterion::Usefulness | Criterion::Factuality | Criterion::Relevance => {
                CriterionGroup::Performance
            }
            Criterion::Tone | Criterion::Style => CriterionGroup::Alignment,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Usefulness => "Usefulness",
            Criterion::Factuality => "Factuality",
            Criterion::Relevance => "Relevance",
            Criterion::Tone => "Tone",
            Criterion::Style => "Style",
        }
    }

    /// Corrective instruction for a criterion that fell below threshold.
    /// Issue lists are preferred over the prose explanation when the judge gave any.
    fn feedback_line(&self, s: &CriterionScore) -> String {
        let detail = if s.issues.is_empty() {
            s.explanation.clone()
        } else {
            s.issues.join(", ")
        };
        match self {
            Criterion::Usefulness => format!("Improve usefulness: {}", s.explanation),
            Criterion::Factuality => format!("Fix factual errors: {detail}"),
            Criterion::Relevance => format!("Improve relevance: {}", s.explanation),
            Criterion::Tone => format!("Adjust tone: {detail}"),
            Criterion::Style => format!("Improve style: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    /// Clamped to [0, 100].
    pub score: f64,
    pub explanation: String,
    /// Weaknesses, factual errors, tone or style issues reported by the judge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
}

impl CriterionScore {
    pub fn new(score: f64, explanation: impl Into<String>) -> Self {
        Self {
            score: clamp_score(score),
            explanation: explanation.into(),
            issues: Vec::new(),
            strengths: Vec::new(),
        }
    }

    pub fn neutral() -> Self {
        Self::new(NEUTRAL_SCORE, "Evaluation failed")
    }

    pub fn with_issues(mut self, issues: Vec<String>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_strengths(mut self, strengths: Vec<String>) -> Self {
        self.strengths = strengths;
        self
    }
}

pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return NEUTRAL_SCORE;
    }
    score.clamp(0.0, 100.0)
}

// --- Group reports ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub usefulness: CriterionScore,
    pub factuality: CriterionScore,
    pub relevance: CriterionScore,
    pub average: f64,
}

impl PerformanceReport {
    pub fn new(usefulness: CriterionScore, factuality: CriterionScore, relevance: CriterionScore) -> Self {
        let average = round2((usefulness.score + factuality.score + relevance.score) / 3.0);
        Self {
            usefulness,
            factuality,
            relevance,
            average,
        }
    }

    pub fn neutral() -> Self {
        Self::new(
            CriterionScore::neutral(),
            CriterionScore::neutral(),
            CriterionScore::neutral(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub tone: CriterionScore,
    pub style: CriterionScore,
    pub average: f64,
    /// Judge's read on vocabulary level ("appropriate", "too simple", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary_level: Option<String>,
}

impl AlignmentReport {
    pub fn new(tone: CriterionScore, style: CriterionScore) -> Self {
        let average = round2((tone.score + style.score) / 2.0);
        Self {
            tone,
            style,
            average,
            vocabulary_level: None,
        }
    }

    pub fn neutral() -> Self {
        Self::new(CriterionScore::neutral(), CriterionScore::neutral())
    }
}

// --- Tiers ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Poor,
    BelowStandard,
    Acceptable,
    Good,
    Excellent,
}

impl QualityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            QualityTier::Excellent
        } else if score >= 80.0 {
            QualityTier::Good
        } else if score >= 70.0 {
            QualityTier::Acceptable
        } else if score >= 60.0 {
            QualityTier::BelowStandard
        } else {
            QualityTier::Poor
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            QualityTier::Excellent => "Excellent quality - Ready to publish",
            QualityTier::Good => "Good quality - Minor improvements recommended",
            QualityTier::Acceptable => "Acceptable quality - Some improvements needed",
            QualityTier::BelowStandard => "Below standard - Significant improvements required",
            QualityTier::Poor => "Poor quality - Regeneration strongly recommended",
        }
    }
}

// --- EvaluationResult -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub performance: PerformanceReport,
    pub alignment: AlignmentReport,
    pub overall_score: f64,
    pub passed: bool,
    pub tier: QualityTier,
    /// At least one judge call fell back to neutral scores.
    pub fallback: bool,
}

impl EvaluationResult {
    pub fn from_reports(
        performance: PerformanceReport,
        alignment: AlignmentReport,
        performance_weight: f64,
        alignment_weight: f64,
        quality_threshold: f64,
        fallback: bool,
    ) -> Self {
        let overall_score =
            round2(performance_weight * performance.average + alignment_weight * alignment.average);
        Self {
            performance,
            alignment,
            overall_score,
            passed: overall_score >= quality_threshold,
            tier: QualityTier::from_score(overall_score),
            fallback,
        }
    }

    pub fn criterion(&self, c: Criterion) -> &CriterionScore {
        match c {
            Criterion::Usefulness => &self.performance.usefulness,
            Criterion::Factuality => &self.performance.factuality,
            Criterion::Relevance => &self.performance.relevance,
            Criterion::Tone => &self.alignment.tone,
            Criterion::Style => &self.alignment.style,
        }
    }

    /// Criteria scoring strictly below `threshold`, in fixed criterion order.
    pub fn weak_criteria(&self, threshold: f64) -> Vec<Criterion> {
        Criterion::ALL
            .into_iter()
            .filter(|c| self.criterion(*c).score < threshold)
            .collect()
    }

    /// Corrective feedback block appended to a regeneration prompt.
    /// Empty when no criterion is below `threshold`.
    pub fn feedback(&self, threshold: f64) -> String {
        let lines: Vec<String> = self
            .weak_criteria(threshold)
            .into_iter()
            .map(|c| format!("- {}", c.feedback_line(self.criterion(c))))
            .collect();
        if lines.is_empty() {
            return String::new();
        }
        format!("IMPROVEMENT NEEDED:\n{}", lines.join("\n"))
    }

    /// Human-readable multi-section report.
    pub fn render_report(&self) -> String {
        let rule = "=".repeat(80);
        let thin = "-".repeat(80);
        let mut out = String::new();

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "CONTENT QUALITY EVALUATION REPORT");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Overall Score: {}/100", self.overall_score);
        let _ = writeln!(out, "Recommendation: {}", self.tier.recommendation());
        if self.fallback {
            let _ = writeln!(out, "Note: judge output was unusable, neutral scores applied");
        }

        for (title, criteria) in [
            (
                "TASK PERFORMANCE",
                &[Criterion::Usefulness, Criterion::Factuality, Criterion::Relevance][..],
            ),
            ("ALIGNMENT", &[Criterion::Tone, Criterion::Style][..]),
        ] {
            let _ = writeln!(out, "\n{thin}\n{title}\n{thin}");
            for (i, c) in criteria.iter().enumerate() {
                let s = self.criterion(*c);
                let _ = writeln!(out, "\n{}. {}: {}/100", i + 1, c.label(), s.score);
                if !s.explanation.is_empty() {
                    let _ = writeln!(out, "   {}", s.explanation);
                }
                if !s.strengths.is_empty() {
                    let _ = writeln!(out, "   Strengths: {}", s.strengths.join(", "));
                }
                if !s.issues.is_empty() {
                    let _ = writeln!(out, "   Issues: {}", s.issues.join(", "));
                }
            }
        }
        if let Some(level) = &self.alignment.vocabulary_level {
            let _ = writeln!(out, "\n   Vocabulary Level: {level}");
        }
        let _ = write!(out, "\n{rule}");
        out
    }
}
