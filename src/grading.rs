//! Answer normalization, similarity scoring and text grading.
//!
//! Everything here is pure and total: no input string can fail. The state
//! layer (`state::scoring`) dispatches by question type and calls into
//! these helpers for every free-text comparison.

/// Lowercase, strip all non-word/non-space characters, collapse whitespace
/// runs to single spaces, trim. Idempotent.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `normalize` plus stripping one leading English article
pub fn normalize_for_comparison(s: &str) -> String {
    let n = normalize(s);
    for article in ["the ", "a ", "an "] {
        if let Some(rest) = n.strip_prefix(article) {
            return rest.to_string();
        }
    }
    n
}

/// Confidence in [0, 1] that two free-text strings are the same answer.
///
/// Check order matters: exact match, then substring containment, then
/// word overlap, all on the comparison-normalized strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    let s1 = normalize_for_comparison(a);
    let s2 = normalize_for_comparison(b);

    if s1 == s2 {
        return 1.0;
    }

    if s1.contains(&s2) || s2.contains(&s1) {
        return 0.9;
    }

    let words1: Vec<&str> = s1.split(' ').collect();
    let words2: Vec<&str> = s2.split(' ').collect();
    let common = words1.iter().filter(|w| words2.contains(w)).count();

    if common > 0 {
        common as f64 / words1.len().max(words2.len()) as f64
    } else {
        0.0
    }
}

/// Outcome of grading one submitted string against one candidate answer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub score: f64,
    pub needs_review: bool,
}

/// Map a similarity score onto (points, review flag):
/// >= 0.95 confident correct, 0.70..0.95 probably correct (confirm),
/// 0.40..0.70 ambiguous (default wrong, flag), < 0.40 confidently wrong.
pub fn grade_text_field(submitted: &str, correct: &str, points: f64) -> Grade {
    let similarity = similarity(submitted, correct);

    if similarity >= 0.95 {
        Grade {
            score: points,
            needs_review: false,
        }
    } else if similarity >= 0.7 {
        Grade {
            score: points,
            needs_review: true,
        }
    } else if similarity >= 0.4 {
        Grade {
            score: 0.0,
            needs_review: true,
        }
    } else {
        Grade {
            score: 0.0,
            needs_review: false,
        }
    }
}

/// Grade against the primary answer plus any accepted alternates, keeping
/// the best-scoring candidate's result. Short-circuits as soon as any
/// candidate reaches 0.95 similarity.
pub fn grade_text_field_with_accepted(
    submitted: &str,
    correct: &str,
    accepted: &[String],
    points: f64,
) -> Grade {
    let mut best = Grade {
        score: 0.0,
        needs_review: false,
    };
    let mut highest_similarity = 0.0_f64;

    let candidates = std::iter::once(correct).chain(accepted.iter().map(String::as_str));
    for candidate in candidates {
        let similarity = similarity(submitted, candidate);

        if similarity > highest_similarity {
            highest_similarity = similarity;
            best = grade_text_field(submitted, candidate, points);
        }

        if similarity >= 0.95 {
            return Grade {
                score: points,
                needs_review: false,
            };
        }
    }

    best
}
