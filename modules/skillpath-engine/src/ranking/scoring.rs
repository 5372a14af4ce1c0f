use std::collections::HashMap;

use chrono::{DateTime, Utc};

use skillpath_common::config::RankingTuning;
use skillpath_common::{ComponentScores, SignalSource};

use super::candidates::Candidate;

/// Component value used when a signal is absent for a candidate.
const NEUTRAL_COMPONENT: f64 = 0.5;

/// Ranking weights rescaled to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub similarity: f64,
    pub topic: f64,
    pub rating: f64,
    pub recency: f64,
}

impl Weights {
    pub fn from_tuning(t: &RankingTuning) -> Self {
        let raw = [t.similarity_weight, t.topic_weight, t.rating_weight, t.recency_weight]
            .map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            return Self {
                similarity: 0.25,
                topic: 0.25,
                rating: 0.25,
                recency: 0.25,
            };
        }
        Self {
            similarity: raw[0] / total,
            topic: raw[1] / total,
            rating: raw[2] / total,
            recency: raw[3] / total,
        }
    }

    pub fn combine(&self, c: &ComponentScores) -> f64 {
        self.similarity * c.similarity
            + self.topic * c.topic
            + self.rating * c.rating
            + self.recency * c.recency
    }
}

/// Normalized per-candidate signals in [0, 1].
pub fn components(
    candidate: &Candidate,
    affinities: &HashMap<String, f64>,
    tuning: &RankingTuning,
    now: DateTime<Utc>,
) -> ComponentScores {
    let similarity = if candidate.has(SignalSource::Similarity) {
        candidate.similarity.unwrap_or(0.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let topic = if candidate.has(SignalSource::Topic) {
        match affinities.get(&candidate.content.topic) {
            Some(count) => (count / tuning.affinity_saturation).clamp(0.0, 1.0),
            None => NEUTRAL_COMPONENT,
        }
    } else {
        0.0
    };

    let rating = match (candidate.has(SignalSource::Rating), candidate.rating) {
        (true, Some((avg, count))) => {
            let confidence = (count as f64 / tuning.rating_confidence_count).min(1.0);
            ((avg / 5.0) * confidence + NEUTRAL_COMPONENT * (1.0 - confidence)).clamp(0.0, 1.0)
        }
        _ => NEUTRAL_COMPONENT,
    };

    let recency = recency_decay(candidate.content.created_at, tuning.recency_decay_days, now);

    ComponentScores {
        similarity,
        topic,
        rating,
        recency,
    }
}

/// `exp(-age_days / decay_days)`; neutral for a missing timestamp.
pub fn recency_decay(created_at: Option<DateTime<Utc>>, decay_days: f64, now: DateTime<Utc>) -> f64 {
    match created_at {
        Some(ts) => (-age_days(ts, now) / decay_days).exp(),
        None => NEUTRAL_COMPONENT,
    }
}

/// Age in fractional days, never negative.
pub fn age_days(ts: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - ts).num_seconds() as f64 / 86_400.0).max(0.0)
}
