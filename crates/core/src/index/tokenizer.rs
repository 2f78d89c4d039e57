//! Tokenizers for the two lexical channels.
//!
//! The word channel lowercases, splits on non-alphanumeric characters, and
//! removes common English stop words; single-byte tokens are discarded. It
//! uses a zero-per-token allocation design via byte spans. The character
//! channel emits word-bounded character n-grams (each token padded with a
//! leading and trailing space), which is what makes agglutinative legal text
//! match on subword units — `저작권` and `저작물은` share no whitespace token
//! but do share the `저작` bigram.

use std::collections::HashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
        "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
        "these", "they", "this", "to", "was", "will", "with",
    ]
    .into_iter()
    .collect()
});

/// Tokenized text: owns the lowercased buffer, provides `&str` slices via
/// byte spans. Only one heap allocation (the lowercased String) instead of
/// N per-token Strings.
pub struct Tokens {
    buffer: String,
    spans: Vec<(u32, u32)>, // (start, end) byte offsets into buffer
}

impl Tokens {
    /// Returns an iterator over the token `&str` slices.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.spans
            .iter()
            .map(|&(s, e)| &self.buffer[s as usize..e as usize])
    }

    /// Returns the number of tokens.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns `true` if there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Tokenize text: lowercase, split on non-alphanumeric, remove stop words.
pub fn tokenize(text: &str) -> Tokens {
    let buffer = text.to_lowercase();
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in buffer.char_indices() {
        if c.is_alphanumeric() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start {
            let token = &buffer[s..i];
            if token.len() > 1 && !STOP_WORDS.contains(token) {
                spans.push((s as u32, i as u32));
            }
            start = None;
        }
    }
    // Handle last token (no trailing separator)
    if let Some(s) = start {
        let token = &buffer[s..];
        if token.len() > 1 && !STOP_WORDS.contains(token) {
            spans.push((s as u32, buffer.len() as u32));
        }
    }

    Tokens { buffer, spans }
}

/// Word-bounded character n-grams of sizes `min..=max`.
///
/// Each alphanumeric run is lowercased and padded with one space on each
/// side before extraction, so n-grams never cross word boundaries and edge
/// grams (`" 저"`, `"권 "`) carry positional signal.
pub fn char_ngrams(text: &str, min: usize, max: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut grams = Vec::new();

    for run in lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(run.chars())
            .chain(std::iter::once(' '))
            .collect();
        for n in min..=max {
            if padded.len() < n {
                continue;
            }
            for window in padded.windows(n) {
                grams.push(window.iter().collect());
            }
        }
    }

    grams
}
