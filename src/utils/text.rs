// Text helpers for model replies and user-supplied search input
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;

lazy_static! {
    static ref JSON_FENCE: Regex = Regex::new(r"(?i)```json").expect("valid fence pattern");
    static ref KEYWORD_SEPARATORS: Regex = Regex::new(r"[,;]+").expect("valid separator pattern");
}

/// Removes markdown code fences (```` ```json ```` and ```` ``` ````) and trims.
pub fn strip_code_fences(text: &str) -> String {
    JSON_FENCE.replace_all(text, "").replace("```", "").trim().to_string()
}

/// Strips fences and parses the remainder as JSON.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(&strip_code_fences(text))
}

/// Splits a comma/semicolon separated keyword reply into trimmed, non-empty keywords.
pub fn split_keywords(text: &str) -> Vec<String> {
    let flattened = text.replace('\n', " ");

    KEYWORD_SEPARATORS
        .split(flattened.trim())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Escapes user input so it matches literally inside a MongoDB `$regex`.
pub fn literal_pattern(input: &str) -> String {
    regex::escape(input.trim())
}
