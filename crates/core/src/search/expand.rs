//! Query variants for broadening recall against one relevance ranker.

const STOP_WORDS: [&str; 8] = ["the", "a", "an", "and", "of", "or", "in", "on"];

/// Derive query variants, original first.
///
/// Multi-word queries add the last word (usually a surname) and the first
/// word. If dropping stop words shortens the query without emptying it, the
/// filtered phrase is added too. Duplicates are kept: callers track results
/// by identifier, not by variant string.
pub fn expand_query(query: &str) -> Vec<String> {
    let trimmed = query.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.is_empty() {
        return vec![query.to_string()];
    }

    let mut variants = vec![trimmed.to_string()];

    if let [first, .., last] = tokens.as_slice() {
        variants.push((*last).to_string());
        variants.push((*first).to_string());
    }

    let filtered: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| !STOP_WORDS.contains(&t.to_lowercase().as_str()))
        .collect();
    if !filtered.is_empty() && filtered.len() < tokens.len() {
        variants.push(filtered.join(" "));
    }

    variants
}
