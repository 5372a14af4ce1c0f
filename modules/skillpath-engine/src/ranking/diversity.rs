use skillpath_common::vector::{dot, normalize};

/// Maximal Marginal Relevance over `(relevance, embedding)` pairs.
///
/// Picks the most relevant item first, then repeatedly the item maximizing
/// `lambda * relevance - (1 - lambda) * max_similarity_to_selected` until
/// `k` items are chosen. Returns indices into `items` in selection order.
pub fn mmr_select(items: &[(f64, &[f32])], k: usize, lambda: f64) -> Vec<usize> {
    let vectors: Vec<Vec<f32>> = items.iter().map(|(_, v)| normalize(v)).collect();
    let mut remaining: Vec<usize> = (0..items.len()).collect();
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(items.len()));
    // Highest similarity of each remaining item to anything already selected.
    let mut max_sim = vec![0.0f64; items.len()];

    while selected.len() < k && !remaining.is_empty() {
        let (pos, _) = remaining
            .iter()
            .enumerate()
            .map(|(pos, &i)| {
                let score = if selected.is_empty() {
                    items[i].0
                } else {
                    lambda * items[i].0 - (1.0 - lambda) * max_sim[i]
                };
                (pos, score)
            })
            // Ties go to the earlier item.
            .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

        let chosen = remaining.remove(pos);
        selected.push(chosen);
        for &i in &remaining {
            if vectors[i].len() == vectors[chosen].len() {
                max_sim[i] = max_sim[i].max(dot(&vectors[i], &vectors[chosen]));
            }
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_duplicate_loses_second_slot_to_diverse_item() {
        let a = [1.0f32, 0.0];
        let a_dup = [0.99f32, 0.05];
        let diverse = [0.0f32, 1.0];
        let items: Vec<(f64, &[f32])> = vec![(0.9, &a[..]), (0.88, &a_dup[..]), (0.6, &diverse[..])];
        assert_eq!(mmr_select(&items, 2, 0.7), vec![0, 2]);
    }

    #[test]
    fn pure_relevance_when_lambda_is_one() {
        let a = [1.0f32, 0.0];
        let b = [1.0f32, 0.0];
        let c = [0.0f32, 1.0];
        let items: Vec<(f64, &[f32])> = vec![(0.5, &a[..]), (0.9, &b[..]), (0.7, &c[..])];
        assert_eq!(mmr_select(&items, 3, 1.0), vec![1, 2, 0]);
    }

    #[test]
    fn stops_when_items_run_out() {
        let a = [1.0f32];
        let items: Vec<(f64, &[f32])> = vec![(0.5, &a[..])];
        assert_eq!(mmr_select(&items, 4, 0.7), vec![0]);
        assert!(mmr_select(&[], 3, 0.7).is_empty());
    }
}
