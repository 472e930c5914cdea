//! Content API client
//!
//! A thin handle to a Prismic-style document repository: predicate search
//! with projection, ordering and paging, single-document lookup by UID, and
//! plain GETs of the opaque `next_page` cursors the API hands out.

mod error;
mod predicate;

pub use error::{ContentError, Result};
pub use predicate::{to_query, Predicate, QueryOptions};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ApiConfig;

/// Largest page size the search endpoint accepts
pub const MAX_PAGE_SIZE: usize = 100;

const ACCESS_TOKEN_PARAM: &str = "access_token";

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub results_per_page: usize,
    #[serde(default)]
    pub total_results_size: usize,
    #[serde(default)]
    pub total_pages: usize,
    /// Cursor for the following page
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> SearchResponse<T> {
    /// The next cursor, with empty strings treated as absent
    pub fn cursor(&self) -> Option<&str> {
        self.next_page.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// API entry point document
#[derive(Debug, Clone, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Authenticated handle to the document API
#[derive(Clone, Debug)]
pub struct ContentClient {
    http: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl ContentClient {
    /// Build a client from the `api` section of the site config
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let raw = config.endpoint.trim();
        if raw.is_empty() {
            return Err(ContentError::MissingEndpoint);
        }
        let endpoint = Url::parse(raw)?;
        if endpoint.cannot_be_a_base() {
            return Err(ContentError::InvalidEndpoint(raw.to_string()));
        }

        let http = Client::builder().user_agent(Self::user_agent()).build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("spacetraveling/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The ref every query must be pinned to
    pub async fn master_ref(&self) -> Result<String> {
        let mut url = self.endpoint.clone();
        self.authorize(&mut url);

        let info: ApiInfo = self.get_json(url).await?;
        info.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(ContentError::NoMasterRef)
    }

    /// Run a predicate search against the master ref
    pub async fn query<T: DeserializeOwned>(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse<T>> {
        let reference = self.master_ref().await?;
        let mut url = self.search_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", &reference);
            if !predicates.is_empty() {
                pairs.append_pair("q", &to_query(predicates));
            }
            for (key, value) in options.to_params() {
                pairs.append_pair(key, &value);
            }
        }
        self.authorize(&mut url);

        tracing::debug!("Querying {} ({} predicates)", url.path(), predicates.len());
        self.get_page(url).await
    }

    /// Run a search and follow every cursor until the results run out
    pub async fn query_all<T: DeserializeOwned>(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Vec<T>> {
        let mut response: SearchResponse<T> = self.query(predicates, options).await?;
        let mut documents = std::mem::take(&mut response.results);

        while let Some(cursor) = response.cursor().map(str::to_owned) {
            response = self.fetch_page(&cursor).await?;
            documents.append(&mut response.results);
        }

        Ok(documents)
    }

    /// Look up one document of `doc_type` by its UID
    pub async fn get_by_uid<T: DeserializeOwned>(
        &self,
        doc_type: &str,
        uid: &str,
    ) -> Result<Option<T>> {
        let predicates = [Predicate::at(format!("my.{}.uid", doc_type), uid)];
        let options = QueryOptions::new().page_size(1);
        let response: SearchResponse<T> = self.query(&predicates, &options).await?;
        Ok(response.results.into_iter().next())
    }

    /// Dereference a `next_page` cursor
    pub async fn fetch_page<T: DeserializeOwned>(&self, cursor: &str) -> Result<SearchResponse<T>> {
        let mut url = without_token(&self.check_cursor(cursor)?);
        self.authorize(&mut url);
        tracing::debug!("Following cursor to page {:?}", page_param(&url));
        self.get_page(url).await
    }

    /// Cursors are only followed when they point back at the API origin
    pub fn check_cursor(&self, cursor: &str) -> Result<Url> {
        let url = Url::parse(cursor.trim())?;
        let same_origin = url.scheme() == self.endpoint.scheme()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default();
        if !same_origin {
            return Err(ContentError::ForeignCursor(cursor.to_string()));
        }
        Ok(url)
    }

    fn search_url(&self) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| ContentError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["documents", "search"]);
        Ok(url)
    }

    fn authorize(&self, url: &mut Url) {
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
        }
    }

    /// Cursors leave the client without the access token; `fetch_page` adds
    /// it back
    async fn get_page<T: DeserializeOwned>(&self, url: Url) -> Result<SearchResponse<T>> {
        let mut response: SearchResponse<T> = self.get_json(url).await?;
        for cursor in [&mut response.next_page, &mut response.prev_page] {
            if let Some(url) = cursor.as_deref().and_then(|c| Url::parse(c).ok()) {
                *cursor = Some(without_token(&url).to_string());
            }
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(ContentError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn without_token(url: &Url) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != ACCESS_TOKEN_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut clean = url.clone();
    clean.set_query(None);
    if !pairs.is_empty() {
        clean.query_pairs_mut().extend_pairs(&pairs);
    }
    clean
}

fn page_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .map(|(_, v)| v.into_owned())
}
