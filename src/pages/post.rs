//! A single post page, including its fallback (not yet generated) state

use serde::Serialize;

use super::ViewContext;
use crate::client::{ContentClient, Predicate, QueryOptions, Result, MAX_PAGE_SIZE};
use crate::config::SiteConfig;
use crate::content::{reading_time, PostDetail, PostSummary};
use crate::helpers::{html_escape, SafeHtml};

pub const LOADING_TITLE: &str = "Loading...";
pub const TITLE_PLACEHOLDER: &str = "Title";
pub const AUTHOR_PLACEHOLDER: &str = "Author";
pub const READING_TIME_PLACEHOLDER: &str = "Reading time";
pub const BANNER_ALT: &str = "Banner";

/// Slugs of every published post
pub async fn static_paths(client: &ContentClient, config: &SiteConfig) -> Result<Vec<String>> {
    let predicates = [Predicate::at(
        "document.type",
        config.api.document_type.as_str(),
    )];
    let options = QueryOptions::new().page_size(MAX_PAGE_SIZE);
    let documents: Vec<PostSummary> = client.query_all(&predicates, &options).await?;
    Ok(documents.into_iter().filter_map(|d| d.uid).collect())
}

/// Fetch a post by slug; `None` when the store has no such post
pub async fn fetch_post(
    client: &ContentClient,
    config: &SiteConfig,
    slug: &str,
) -> Result<Option<PostDetail>> {
    client.get_by_uid(&config.api.document_type, slug).await
}

/// Post page state
///
/// Starts either hydrated with a post or as a fallback placeholder. The
/// reading time is computed when a post is attached and cached until the
/// next one replaces it.
#[derive(Debug, Clone, Default)]
pub struct PostPage {
    post: Option<PostDetail>,
    is_fallback: bool,
    reading_time: usize,
}

impl PostPage {
    pub fn new(post: PostDetail) -> Self {
        let mut page = Self::default();
        page.hydrate(post);
        page
    }

    /// Placeholder served while the real page is being generated
    pub fn fallback() -> Self {
        Self {
            post: None,
            is_fallback: true,
            reading_time: 0,
        }
    }

    pub fn hydrate(&mut self, post: PostDetail) {
        self.reading_time = reading_time(&post.data.content);
        self.post = Some(post);
        self.is_fallback = false;
    }

    pub fn post(&self) -> Option<&PostDetail> {
        self.post.as_ref()
    }

    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    /// Minutes, zero when there is nothing to read
    pub fn reading_time(&self) -> usize {
        self.reading_time
    }

    pub fn view(&self, ctx: &ViewContext) -> PostView {
        let data = self.post.as_ref().map(|p| &p.data);
        let raw_date = self
            .post
            .as_ref()
            .and_then(|p| p.first_publication_date.as_deref());
        let author = data
            .and_then(|d| d.author.as_deref())
            .filter(|a| !a.is_empty());

        let title = if self.is_fallback {
            LOADING_TITLE.to_string()
        } else {
            data.and_then(|d| d.title.as_deref())
                .filter(|t| !t.is_empty())
                .unwrap_or(TITLE_PLACEHOLDER)
                .to_string()
        };

        let reading_time = if self.reading_time > 0 {
            format!("{} min", self.reading_time)
        } else {
            READING_TIME_PLACEHOLDER.to_string()
        };

        let blocks = data
            .map(|d| {
                d.content
                    .iter()
                    .map(|block| BlockView {
                        heading: block.heading.clone(),
                        body: block.body.as_html(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        PostView {
            title,
            date: ctx.dates().publication_date(raw_date),
            datetime: ctx.dates().datetime_attr(raw_date),
            author: author.unwrap_or(AUTHOR_PLACEHOLDER).to_string(),
            reading_time,
            banner_url: self
                .post
                .as_ref()
                .and_then(PostDetail::banner_url)
                .map(html_escape),
            banner_alt: author.unwrap_or(BANNER_ALT).to_string(),
            blocks,
            is_fallback: self.is_fallback,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub title: String,
    pub date: String,
    pub datetime: Option<String>,
    pub author: String,
    pub reading_time: String,
    /// Pre-escaped
    pub banner_url: Option<String>,
    pub banner_alt: String,
    pub blocks: Vec<BlockView>,
    pub is_fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockView {
    pub heading: String,
    pub body: SafeHtml,
}
