//! Interval tokens such as `]10;20]`, `]-inf;0]` or `]20;+inf[`.

use std::cmp::Ordering;

use crate::report::Interval;

/// Parse one bound, accepting `inf`, `+inf`, `-inf` and unicode minus variants.
pub fn parse_bound(text: &str) -> Option<f64> {
    let t = text.trim();
    let t = t
        .strip_prefix('\u{2212}')
        .or_else(|| t.strip_prefix('\u{2013}'))
        .map(|rest| format!("-{rest}"))
        .unwrap_or_else(|| t.to_string());
    match t.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" | "+infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        other => other.parse::<f64>().ok(),
    }
}

/// A parsed interval token keeping its textual pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalToken {
    /// Opening bracket, `]` or `[`.
    pub open: char,
    /// Lower bound text.
    pub lower_text: String,
    /// Upper bound text.
    pub upper_text: String,
    /// Closing bracket, `]` or `[`.
    pub close: char,
    /// Parsed lower bound.
    pub lower: f64,
    /// Parsed upper bound.
    pub upper: f64,
}

impl IntervalToken {
    /// Parse `]a;b]`-style text. Either `;` or `,` separates the bounds and a
    /// leading `*` (missing values) is ignored.
    pub fn parse(token: &str) -> Option<Self> {
        let t = token.trim().trim_start_matches('*').trim();
        let mut chars = t.chars();
        let open = chars.next().filter(|c| *c == '[' || *c == ']')?;
        let close = chars.next_back().filter(|c| *c == '[' || *c == ']')?;
        let inner = chars.as_str();
        let (lower_text, upper_text) = inner
            .split_once(';')
            .or_else(|| inner.split_once(','))?;
        Some(Self {
            open,
            lower: parse_bound(lower_text)?,
            upper: parse_bound(upper_text)?,
            lower_text: lower_text.trim().to_string(),
            upper_text: upper_text.trim().to_string(),
            close,
        })
    }

    fn render(&self) -> String {
        format!(
            "{}{};{}{}",
            self.open, self.lower_text, self.upper_text, self.close
        )
    }

    fn cmp_bounds(&self, other: &Self) -> Ordering {
        self.lower
            .total_cmp(&other.lower)
            .then(self.upper.total_cmp(&other.upper))
    }
}

/// Parse bracketed interval text into `(lower, upper)`.
pub fn parse_interval(token: &str) -> Option<(f64, f64)> {
    IntervalToken::parse(token).map(|t| (t.lower, t.upper))
}

/// Sort interval tokens by lower bound, then upper bound.
///
/// `-inf` sorts first and `+inf` last. Tokens that are not intervals keep
/// their relative order after the intervals.
pub fn sort_intervals<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let (mut parsed, rest) = split_tokens(tokens);
    parsed.sort_by(|a, b| a.1.cmp_bounds(&b.1));
    parsed
        .into_iter()
        .map(|(raw, _)| raw)
        .chain(rest)
        .collect()
}

/// Sort and merge touching or overlapping intervals.
///
/// Two neighbours merge when the first upper bound is within `epsilon` of,
/// or beyond, the next lower bound. Tokens that are not intervals pass
/// through unmerged after the intervals.
pub fn simplify_intervals<S: AsRef<str>>(tokens: &[S], epsilon: f64) -> Vec<String> {
    let (mut parsed, rest) = split_tokens(tokens);
    parsed.sort_by(|a, b| a.1.cmp_bounds(&b.1));

    let mut runs: Vec<IntervalToken> = Vec::new();
    for (_, token) in parsed {
        match runs.last_mut() {
            Some(run) if run.upper + epsilon >= token.lower => {
                if token.upper.total_cmp(&run.upper) == Ordering::Greater {
                    run.upper = token.upper;
                    run.upper_text = token.upper_text;
                    run.close = token.close;
                }
            }
            _ => runs.push(token),
        }
    }
    runs.iter().map(IntervalToken::render).chain(rest).collect()
}

/// Indexes of bounds wholly contained in another entry.
///
/// Bounds closer than `epsilon` count as equal; of two identical entries
/// the later one is reported.
pub fn find_included_intervals(bounds: &[(f64, f64)], epsilon: f64) -> Vec<usize> {
    let mut included = Vec::new();
    for (i, &(lo, hi)) in bounds.iter().enumerate() {
        let inside = bounds.iter().enumerate().any(|(j, &(olo, ohi))| {
            if i == j {
                return false;
            }
            let covers = olo <= lo + epsilon && hi <= ohi + epsilon;
            let same = (olo - lo).abs() <= epsilon && (ohi - hi).abs() <= epsilon;
            covers && (!same || j < i)
        });
        if inside {
            included.push(i);
        }
    }
    included
}

/// Order for partition intervals: missing-value part first, then by bounds.
pub(crate) fn cmp_parts(a: &Interval, b: &Interval) -> Ordering {
    match (a.bounds, b.bounds) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some((alo, ahi)), Some((blo, bhi))) => alo.total_cmp(&blo).then(ahi.total_cmp(&bhi)),
    }
}

fn split_tokens<S: AsRef<str>>(tokens: &[S]) -> (Vec<(String, IntervalToken)>, Vec<String>) {
    let mut parsed = Vec::with_capacity(tokens.len());
    let mut rest = Vec::new();
    for token in tokens {
        let raw = token.as_ref();
        match IntervalToken::parse(raw) {
            Some(t) => parsed.push((raw.to_string(), t)),
            None => rest.push(raw.to_string()),
        }
    }
    (parsed, rest)
}
