/// Prepositions and conjunctions that never count as search keys
pub const STOP_WORDS: [&str; 12] = [
    "DE", "DA", "DO", "COM", "SEM", "PARA", "POR", "EM", "UMA", "UM", "E", "OU",
];

/// Upper-cases a term, splits on whitespace and keeps the tokens that carry meaning.
/// An empty result means the term contributes nothing to a search.
pub fn tokenize(term: &str) -> Vec<String> {
    term.to_uppercase()
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}
