use std::collections::HashSet;

/// Dice coefficient over the de-duplicated character bigrams of both strings.
///
/// Returns a value between 0.0 (nothing in common) and 1.0 (identical). An
/// empty input always scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let bigrams_a = bigrams(a);
    let bigrams_b = bigrams(b);

    let total = bigrams_a.len() + bigrams_b.len();
    if total == 0 {
        // Both are single characters and differ
        return 0.0;
    }

    let intersection = bigrams_a.intersection(&bigrams_b).count();

    2.0 * intersection as f64 / total as f64
}

fn bigrams(s: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|pair| (pair[0], pair[1])).collect()
}
