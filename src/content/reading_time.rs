//! Reading-time estimate for post content

use lazy_static::lazy_static;
use regex::Regex;

use super::post::ContentBlock;

/// Average human reading speed
pub const WORDS_PER_MINUTE: usize = 200;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w|\s]").unwrap();
}

/// Words in every heading plus every body's plain text, punctuation stripped
pub fn count_words(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            let body = block.body.as_text();
            let body = PUNCTUATION.replace_all(&body, "");
            block.heading.split_whitespace().count() + body.split_whitespace().count()
        })
        .sum()
}

/// Minutes needed to read `content`, rounded up; zero for empty content
pub fn reading_time(content: &[ContentBlock]) -> usize {
    count_words(content).div_ceil(WORDS_PER_MINUTE)
}
