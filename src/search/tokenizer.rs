use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[\w']+").unwrap();
}

/// Split text into lowercase word tokens.
///
/// A token is a maximal run of word characters and apostrophes; everything
/// else separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}
