use crate::errors::PayloadError;

fn normalize(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

fn distance(input: &str, candidate: &str) -> Option<usize> {
    let a = normalize(input);
    let b = normalize(candidate);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b {
        return Some(0);
    }
    if a.contains(&b) || b.contains(&a) {
        return Some(1);
    }
    let allowed = match a.len() {
        0..=4 => 1,
        5..=8 => 2,
        n => (n as f32 * 0.35).floor().max(3.0) as usize,
    };
    Some(levenshtein(&a, &b)).filter(|d| *d <= allowed)
}

/// Closest known names to `input`, best first.
pub fn suggest(input: &str, candidates: &[&str], limit: usize) -> Vec<String> {
    let mut scored: Vec<(&str, usize)> = candidates
        .iter()
        .filter_map(|c| distance(input, c).map(|d| (*c, d)))
        .collect();
    scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(limit.max(1))
        .map(|(c, _)| c.to_string())
        .collect()
}

/// Invalid-params error for a name outside a closed set, with "did you mean" help.
pub fn unknown_name_error(kind: &str, input: &str, known: &[&str]) -> PayloadError {
    let suggestions = suggest(input, known, crate::constants::limits::MAX_SUGGESTIONS);
    let mut hint = format!("Use one of: {}.", known.join(", "));
    if !suggestions.is_empty() {
        hint = format!("Did you mean: {}? {}", suggestions.join(", "), hint);
    }
    PayloadError::invalid_params(format!("Unknown {}: {}", kind, input))
        .with_hint(hint)
        .with_details(serde_json::json!({ "known": known, "did_you_mean": suggestions }))
}

#[cfg(test)]
mod tests {
    use super::{suggest, unknown_name_error};

    #[test]
    fn suggests_near_misses() {
        let known = ["find", "findById", "create", "count"];
        assert_eq!(suggest("fnd", &known, 3), vec!["find"]);
        assert_eq!(suggest("findbyid", &known, 3)[0], "findById");
        assert!(suggest("zzzzzz", &known, 3).is_empty());
    }

    #[test]
    fn unknown_name_error_lists_candidates() {
        let err = unknown_name_error("collection operation", "delet", &["delete", "deleteById"]);
        assert!(err.message.contains("delet"));
        assert!(err.hint.unwrap().starts_with("Did you mean: delete"));
    }
}
