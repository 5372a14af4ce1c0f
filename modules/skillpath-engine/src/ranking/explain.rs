use skillpath_common::{ComponentScores, PopularityRow, SignalSource};

use super::candidates::Candidate;

const SIMILARITY_DISPLAY: f64 = 0.7;
const TOPIC_DISPLAY: f64 = 0.6;
const RATING_DISPLAY: f64 = 0.7;
const RECENCY_DISPLAY: f64 = 0.8;
const HIGH_RATING: f64 = 4.0;

/// One sentence naming the signals that pushed a personalized item up.
pub fn personalized(candidate: &Candidate, scores: &ComponentScores) -> String {
    let mut reasons = Vec::new();
    if scores.similarity > SIMILARITY_DISPLAY {
        reasons.push("it's similar to articles you've read".to_string());
    }
    if scores.topic > TOPIC_DISPLAY && candidate.has(SignalSource::Topic) {
        reasons.push(format!("you enjoy {}", candidate.content.topic));
    }
    if scores.rating > RATING_DISPLAY {
        if let Some((avg, _)) = candidate.rating.filter(|(avg, _)| *avg >= HIGH_RATING) {
            reasons.push(format!("it's highly rated by other users ({avg:.1}/5)"));
        }
    }
    if scores.recency > RECENCY_DISPLAY {
        reasons.push("it was recently published".to_string());
    }

    if reasons.is_empty() {
        "Recommended for you".to_string()
    } else {
        format!("Recommended because {}", reasons.join(" and "))
    }
}

pub fn cold_start(row: &PopularityRow) -> String {
    if row.read_count > 10 {
        format!("Recommended because it's popular ({} reads)", row.read_count)
    } else if row.read_count > 5 {
        format!("Recommended because it's trending ({} reads)", row.read_count)
    } else if let Some(avg) = row.avg_rating.filter(|a| row.rating_count > 0 && *a >= HIGH_RATING) {
        format!("Recommended because it's highly rated ({avg:.1}/5)")
    } else {
        "Recommended for new users".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use skillpath_common::ContentRef;
    use uuid::Uuid;

    use super::*;

    fn candidate(sources: &[SignalSource], rating: Option<(f64, u32)>) -> Candidate {
        Candidate {
            content: ContentRef {
                id: Uuid::new_v4(),
                title: "Patent law".into(),
                topic: "Patent law".into(),
                created_at: None,
            },
            sources: sources.iter().copied().collect::<BTreeSet<_>>(),
            similarity: None,
            rating,
        }
    }

    #[test]
    fn names_every_strong_signal() {
        let c = candidate(&[SignalSource::Similarity, SignalSource::Topic], None);
        let s = ComponentScores {
            similarity: 0.85,
            topic: 0.9,
            rating: 0.5,
            recency: 0.2,
        };
        assert_eq!(
            personalized(&c, &s),
            "Recommended because it's similar to articles you've read and you enjoy Patent law"
        );
    }

    #[test]
    fn mentions_rating_only_when_high() {
        let s = ComponentScores {
            similarity: 0.0,
            topic: 0.0,
            rating: 0.9,
            recency: 0.0,
        };
        let high = candidate(&[SignalSource::Rating], Some((4.6, 12)));
        assert!(personalized(&high, &s).contains("highly rated by other users (4.6/5)"));
        let middling = candidate(&[SignalSource::Rating], Some((3.5, 12)));
        assert_eq!(personalized(&middling, &s), "Recommended for you");
    }

    #[test]
    fn cold_start_prefers_popularity_then_rating() {
        let mut row = PopularityRow {
            content: candidate(&[], None).content,
            read_count: 11,
            avg_rating: Some(4.5),
            rating_count: 2,
        };
        assert_eq!(cold_start(&row), "Recommended because it's popular (11 reads)");
        row.read_count = 6;
        assert_eq!(cold_start(&row), "Recommended because it's trending (6 reads)");
        row.read_count = 1;
        assert_eq!(cold_start(&row), "Recommended because it's highly rated (4.5/5)");
        row.avg_rating = None;
        assert_eq!(cold_start(&row), "Recommended for new users");
    }
}
