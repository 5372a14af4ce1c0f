use chrono::{DateTime, Utc};

use skillpath_common::PopularityRow;

use super::scoring::age_days;

/// Rating assumed for items nobody has rated yet.
const UNRATED_AVERAGE: f64 = 3.0;

/// Popularity blend for users without history:
/// `reads * 0.4 + avg_rating * 0.4 + recency * 10 * 0.2`,
/// with `recency = 1 / (1 + age_days / decay_days)`.
pub fn popularity_score(row: &PopularityRow, decay_days: f64, now: DateTime<Utc>) -> f64 {
    let avg = match row.avg_rating {
        Some(avg) if row.rating_count > 0 => avg,
        _ => UNRATED_AVERAGE,
    };
    let recency = match row.content.created_at {
        Some(ts) => 1.0 / (1.0 + age_days(ts, now) / decay_days),
        None => 0.5,
    };
    row.read_count as f64 * 0.4 + avg * 0.4 + recency * 10.0 * 0.2
}

/// Rows ordered by popularity score, best first. Ties keep the newer item first.
pub fn rank(rows: Vec<PopularityRow>, decay_days: f64, now: DateTime<Utc>) -> Vec<(PopularityRow, f64)> {
    let mut scored: Vec<(PopularityRow, f64)> = rows
        .into_iter()
        .map(|row| {
            let score = popularity_score(&row, decay_days, now);
            (row, score)
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| b.0.content.created_at.cmp(&a.0.content.created_at))
    });
    scored
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use skillpath_common::ContentRef;
    use uuid::Uuid;

    use super::*;

    fn row(reads: u64, avg: Option<f64>, ratings: u64, age: Option<i64>, now: DateTime<Utc>) -> PopularityRow {
        PopularityRow {
            content: ContentRef {
                id: Uuid::new_v4(),
                title: "t".into(),
                topic: "t".into(),
                created_at: age.map(|d| now - Duration::days(d)),
            },
            read_count: reads,
            avg_rating: avg,
            rating_count: ratings,
        }
    }

    #[test]
    fn blends_reads_rating_and_recency() {
        let now = Utc::now();
        // 10 * 0.4 + 4 * 0.4 + (1 / (1 + 1)) * 10 * 0.2
        let s = popularity_score(&row(10, Some(4.0), 2, Some(30), now), 30.0, now);
        assert!((s - 6.6).abs() < 1e-9);
    }

    #[test]
    fn unrated_and_undated_items_get_defaults() {
        let now = Utc::now();
        // 0 + 3 * 0.4 + 0.5 * 10 * 0.2
        let s = popularity_score(&row(0, None, 0, None, now), 30.0, now);
        assert!((s - 2.2).abs() < 1e-9);
    }

    #[test]
    fn ranks_popular_items_first() {
        let now = Utc::now();
        let ranked = rank(
            vec![
                row(0, None, 0, Some(1), now),
                row(12, Some(4.5), 4, Some(90), now),
                row(3, Some(2.0), 1, Some(5), now),
            ],
            30.0,
            now,
        );
        assert_eq!(ranked[0].0.read_count, 12);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
