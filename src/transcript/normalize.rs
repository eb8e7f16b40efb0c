//! Deterministic clean-up of recognizer output.
//!
//! Recognition engines stutter under noise ("the the the"), and joining
//! segments leaves stray spaces before punctuation.  [`TextNormalizer`]
//! fixes both:
//!
//! 1. collapse every run of identical consecutive whitespace-delimited
//!    tokens into one occurrence;
//! 2. join the tokens with single spaces;
//! 3. drop a space directly before `?`, `.`, `!` or `"` when the mark is
//!    followed by whitespace or the end of the text;
//! 4. trim.
//!
//! Step 3 can bring two identical tokens together (`"hi . hi ."` becomes
//! `"hi. hi."` only after the space goes), so the pass repeats until the
//! text stops changing.  The result is a fixed point, which makes
//! normalization idempotent.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static SPACE_BEFORE_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s([?.!"](?:\s|$))"#).unwrap());

/// Pure text normalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize `text`.
    ///
    /// ```rust
    /// use session_transcriber::transcript::TextNormalizer;
    ///
    /// let n = TextNormalizer::new();
    /// assert_eq!(n.normalize("the the quick quick quick fox"), "the quick fox");
    /// assert_eq!(n.normalize("hello  world !"), "hello world!");
    /// ```
    pub fn normalize(&self, text: &str) -> String {
        let mut current = self.pass(text);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let joined = dedup_tokens(text);
        let fixed: Cow<'_, str> = SPACE_BEFORE_MARK.replace_all(&joined, "$1");
        fixed.trim().to_string()
    }
}

/// Collapse runs of identical consecutive tokens and join with one space.
fn dedup_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<&str> = None;

    for token in text.split_whitespace() {
        if prev == Some(token) {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
        prev = Some(token);
    }
    out
}
