//! The post listing and its incremental "load more" state

use serde::Serialize;

use super::ViewContext;
use crate::client::{ContentClient, Predicate, QueryOptions, Result, SearchResponse};
use crate::config::SiteConfig;
use crate::content::PostSummary;

/// Label of the control that fetches the next batch
pub const LOAD_MORE_LABEL: &str = "Load more posts";

/// Newest posts of the configured type, projected to the summary fields
pub fn first_page_query(config: &SiteConfig) -> (Vec<Predicate>, QueryOptions) {
    let doc_type = &config.api.document_type;
    let predicates = vec![Predicate::at("document.type", doc_type.as_str())];
    let options = QueryOptions::new()
        .fetch(
            ["title", "subtitle", "author"]
                .iter()
                .map(|field| format!("{}.{}", doc_type, field)),
        )
        .orderings("[document.first_publication_date desc]")
        .page_size(config.per_page.max(1));
    (predicates, options)
}

/// Posts shown so far plus the cursor for the next batch
///
/// Posts are only ever appended, in arrival order. While a load is pending
/// the listing refuses to start another one.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
    loading: bool,
}

impl Listing {
    /// Build-time query for the first batch
    pub async fn fetch_first(client: &ContentClient, config: &SiteConfig) -> Result<Self> {
        let (predicates, options) = first_page_query(config);
        let response = client.query(&predicates, &options).await?;
        Ok(Self::from_response(response))
    }

    pub fn from_response(response: SearchResponse<PostSummary>) -> Self {
        Self {
            next_page: response.cursor().map(str::to_owned),
            posts: response.results,
            loading: false,
        }
    }

    /// An empty listing that continues from `cursor`
    pub fn resume(cursor: impl Into<String>) -> Self {
        let cursor = cursor.into();
        Self {
            posts: Vec::new(),
            next_page: (!cursor.trim().is_empty()).then_some(cursor),
            loading: false,
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether the "load more" control should be offered
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Claim the cursor for a fetch; `None` when there is nothing to load or
    /// a load is already pending
    pub fn begin_load(&mut self) -> Option<String> {
        if self.loading {
            return None;
        }
        let cursor = self.next_page.clone()?;
        self.loading = true;
        Some(cursor)
    }

    /// Append a fetched batch and take over its cursor
    pub fn finish_load(&mut self, response: SearchResponse<PostSummary>) -> usize {
        let added = response.results.len();
        self.next_page = response.cursor().map(str::to_owned);
        self.posts.extend(response.results);
        self.loading = false;
        added
    }

    /// Release the in-flight flag after a failed fetch; nothing else changes
    pub fn abort_load(&mut self) {
        self.loading = false;
    }

    /// Fetch the next batch and append it; returns how many posts arrived
    pub async fn load_more(&mut self, client: &ContentClient) -> Result<usize> {
        let Some(cursor) = self.begin_load() else {
            return Ok(0);
        };

        match client.fetch_page::<PostSummary>(&cursor).await {
            Ok(response) => Ok(self.finish_load(response)),
            Err(e) => {
                self.abort_load();
                Err(e)
            }
        }
    }

    pub fn views(&self, ctx: &ViewContext) -> Vec<SummaryView> {
        self.posts.iter().map(|post| SummaryView::new(post, ctx)).collect()
    }
}

/// One entry of the listing as the template sees it
#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    /// Pre-escaped; absent when the post has no slug
    pub href: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub datetime: Option<String>,
    pub author: String,
}

impl SummaryView {
    pub fn new(post: &PostSummary, ctx: &ViewContext) -> Self {
        let raw_date = post.first_publication_date.as_deref();
        Self {
            href: post.uid.as_deref().map(|uid| ctx.post_href(uid)),
            title: post.data.title.clone().unwrap_or_default(),
            subtitle: post.data.subtitle.clone().unwrap_or_default(),
            date: ctx.dates().publication_date(raw_date),
            datetime: ctx.dates().datetime_attr(raw_date),
            author: post.data.author.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::testing::MockApi;

    fn summary(uid: &str) -> PostSummary {
        PostSummary {
            uid: Some(uid.to_string()),
            ..PostSummary::default()
        }
    }

    fn response(uids: &[&str], next_page: Option<&str>) -> SearchResponse<PostSummary> {
        SearchResponse {
            page: 1,
            results_per_page: uids.len(),
            total_results_size: uids.len(),
            total_pages: 1,
            next_page: next_page.map(str::to_owned),
            prev_page: None,
            results: uids.iter().map(|uid| summary(uid)).collect(),
        }
    }

    fn uids(listing: &Listing) -> Vec<&str> {
        listing
            .posts()
            .iter()
            .filter_map(|p| p.uid.as_deref())
            .collect()
    }

    #[test]
    fn test_first_page_query() {
        let (predicates, options) = first_page_query(&SiteConfig::default());
        assert_eq!(predicates, vec![Predicate::at("document.type", "post")]);
        assert_eq!(options.fetch, ["post.title", "post.subtitle", "post.author"]);
        assert_eq!(
            options.orderings.as_deref(),
            Some("[document.first_publication_date desc]")
        );
        assert_eq!(options.page_size, Some(2));
    }

    #[test]
    fn test_append_preserves_order() {
        let mut listing = Listing::from_response(response(&["a", "b"], Some("https://api/2")));
        assert_eq!(listing.begin_load().as_deref(), Some("https://api/2"));

        let added = listing.finish_load(response(&["c", "d"], Some("https://api/3")));
        assert_eq!(added, 2);
        assert_eq!(uids(&listing), ["a", "b", "c", "d"]);
        assert_eq!(listing.next_page(), Some("https://api/3"));
        assert!(!listing.loading);
    }

    #[test]
    fn test_empty_cursor_disables_load_more() {
        let mut listing = Listing::from_response(response(&["a"], Some("")));
        assert!(!listing.has_more());
        assert!(listing.begin_load().is_none());

        let listing = Listing::resume("  ");
        assert!(!listing.has_more());
    }

    #[test]
    fn test_in_flight_guard() {
        let mut listing = Listing::from_response(response(&["a"], Some("https://api/2")));
        assert!(listing.begin_load().is_some());
        assert!(listing.loading);
        assert!(listing.begin_load().is_none());

        listing.abort_load();
        assert_eq!(uids(&listing), ["a"]);
        assert_eq!(listing.next_page(), Some("https://api/2"));
        assert!(listing.begin_load().is_some());
    }

    #[test]
    fn test_last_page_clears_cursor() {
        let mut listing = Listing::from_response(response(&["a"], Some("https://api/2")));
        listing.begin_load();
        listing.finish_load(response(&["b"], None));
        assert!(!listing.has_more());
    }

    #[test]
    fn test_summary_view_placeholders() {
        let ctx = ViewContext::new(&SiteConfig::default());
        let view = SummaryView::new(&summary("hello"), &ctx);
        assert_eq!(view.href.as_deref(), Some("/post/hello"));
        assert_eq!(view.date, "Publication Date");
        assert_eq!(view.title, "");

        let view = SummaryView::new(&PostSummary::default(), &ctx);
        assert!(view.href.is_none());
    }

    #[tokio::test]
    async fn test_load_more_against_api() {
        let api = MockApi::start(MockApi::sample_posts(5)).await;
        let config = SiteConfig {
            api: ApiConfig {
                endpoint: api.endpoint.clone(),
                ..ApiConfig::default()
            },
            ..SiteConfig::default()
        };
        let client = ContentClient::new(&config.api).unwrap();

        let mut listing = Listing::fetch_first(&client, &config).await.unwrap();
        assert_eq!(uids(&listing), ["post-1", "post-2"]);

        assert_eq!(listing.load_more(&client).await.unwrap(), 2);
        assert_eq!(listing.load_more(&client).await.unwrap(), 1);
        assert_eq!(uids(&listing), ["post-1", "post-2", "post-3", "post-4", "post-5"]);
        assert!(!listing.has_more());

        // Nothing left: no request is made
        let searches = api.searches();
        assert_eq!(listing.load_more(&client).await.unwrap(), 0);
        assert_eq!(api.searches(), searches);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_state_unchanged() {
        let api = MockApi::start(MockApi::sample_posts(1)).await;
        let client = ContentClient::new(&ApiConfig {
            endpoint: api.endpoint.clone(),
            ..ApiConfig::default()
        })
        .unwrap();

        // No `ref` parameter: the API rejects it
        let cursor = format!("{}/documents/search?page=2", api.endpoint);
        let mut listing = Listing::resume(cursor.clone());
        assert!(listing.load_more(&client).await.is_err());
        assert!(listing.posts().is_empty());
        assert_eq!(listing.next_page(), Some(cursor.as_str()));
        assert!(!listing.loading);
    }
}
