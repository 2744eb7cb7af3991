//! Lexical (keyword overlap) relevance.

use std::collections::HashSet;

/// Document term count at which the length factor saturates.
const LENGTH_SATURATION_TERMS: usize = 100;

/// Splits text on whitespace into a set of lower-cased terms.
#[must_use]
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Scores how well `document` covers the terms of `query`, in `[0, 1]`.
///
/// The score is the fraction of distinct query terms present in the
/// document, scaled by `0.5 + 0.5 * min(terms, 100) / 100` where `terms` is
/// the number of distinct document terms. Short documents are damped; the
/// factor saturates at 100 terms.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn lexical_score(query: &str, document: &str) -> f32 {
    let query_terms = tokenize(query);
    if query_terms.is_empty() {
        return 0.0;
    }
    let document_terms = tokenize(document);

    let matched = query_terms
        .iter()
        .filter(|term| document_terms.contains(*term))
        .count();
    let overlap = matched as f32 / query_terms.len() as f32;

    let saturation = document_terms.len().min(LENGTH_SATURATION_TERMS) as f32
        / LENGTH_SATURATION_TERMS as f32;
    overlap * 0.5f32.mul_add(saturation, 0.5)
}
