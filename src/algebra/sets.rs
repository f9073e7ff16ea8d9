//! Categorical value sets such as `{a, b, c}`.

use std::collections::HashMap;

use crate::report::ValueGroup;

/// Values of a `{a, b}` literal, or the bare token itself.
pub fn set_values(token: &str) -> Vec<String> {
    let t = token.trim();
    match t.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
        Some(inner) => inner
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect(),
        None if t.is_empty() => Vec::new(),
        None => vec![t.to_string()],
    }
}

/// Union of categorical tokens as a single `{..}` token.
///
/// Values keep the order of their first appearance; empty tokens are ignored.
pub fn merge_categorical_sets<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for token in tokens {
        for value in set_values(token.as_ref()) {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
    }
    vec![format!("{{{}}}", seen.join(", "))]
}

/// Concatenate value groups into one group named `cluster`.
///
/// A value present in several groups is kept once with summed frequency.
pub fn union_value_groups(cluster: &str, groups: &[&ValueGroup], sort_by_frequency: bool) -> ValueGroup {
    let mut values: Vec<String> = Vec::new();
    let mut frequencies: Vec<u64> = Vec::new();
    let mut typicalities: Vec<f64> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for group in groups {
        for (i, value) in group.values.iter().enumerate() {
            let frequency = group.value_frequencies.get(i).copied().unwrap_or(0);
            let typicality = group.value_typicalities.get(i).copied().unwrap_or(0.0);
            match position.get(value) {
                Some(&at) => frequencies[at] += frequency,
                None => {
                    position.insert(value.clone(), values.len());
                    values.push(value.clone());
                    frequencies.push(frequency);
                    typicalities.push(typicality);
                }
            }
        }
    }

    if sort_by_frequency {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| frequencies[b].cmp(&frequencies[a]));
        values = order.iter().map(|&i| values[i].clone()).collect();
        frequencies = order.iter().map(|&i| frequencies[i]).collect();
        typicalities = order.iter().map(|&i| typicalities[i]).collect();
    }

    let has_typicalities = groups.iter().any(|g| !g.value_typicalities.is_empty());
    ValueGroup {
        cluster: cluster.to_string(),
        values,
        value_frequencies: frequencies,
        value_typicalities: if has_typicalities { typicalities } else { Vec::new() },
    }
}
