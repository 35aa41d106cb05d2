/// Computes the arithmetic mean of a slice of values. Returns `None` for
/// empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Rounds half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Sorts `(key, count)` pairs by count descending, then key ascending, and
/// keeps the first `n`.
pub fn top_n<K: Ord + Copy>(counts: impl IntoIterator<Item = (K, u64)>, n: usize) -> Vec<(K, u64)> {
    let mut ranked: Vec<(K, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0, 30.0, 5.0, 5.0, 5.0]), Some(12.5));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345_6, 2), 12.35);
        assert_eq!(round_to(3.0, 2), 3.0);
        assert_eq!(round_to(-1.005_1, 2), -1.01);
    }

    #[test]
    fn test_top_n_tie_break() {
        let ranked = top_n(vec![(20, 5), (5, 3), (10, 5)], 5);
        assert_eq!(ranked, vec![(10, 5), (20, 5), (5, 3)]);
    }

    #[test]
    fn test_top_n_truncates() {
        let ranked = top_n((0..10).map(|k| (k, 10 - k as u64)), 5);
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0], (0, 10));
        assert_eq!(ranked[4], (4, 6));
    }
}
