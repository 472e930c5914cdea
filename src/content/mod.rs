//! Content models: posts, rich text and reading time

pub mod post;
pub mod reading_time;
pub mod richtext;

pub use post::{Banner, ContentBlock, DetailFields, PostDetail, PostSummary, SummaryFields};
pub use reading_time::{count_words, reading_time, WORDS_PER_MINUTE};
pub use richtext::RichText;
