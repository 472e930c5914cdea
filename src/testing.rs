//! In-process mock of the content API used by unit tests

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

const MASTER_REF: &str = "master-ref";

lazy_static! {
    static ref UID_PREDICATE: Regex = Regex::new(r#"at\(my\.\w+\.uid, "([^"]*)"\)"#).unwrap();
}

struct MockState {
    endpoint: String,
    /// When set, every request must carry this `access_token`
    token: Option<String>,
    documents: RwLock<Vec<Value>>,
    searches: AtomicUsize,
}

/// A running mock repository; documents are served in the given order
pub struct MockApi {
    pub endpoint: String,
    state: Arc<MockState>,
}

impl MockApi {
    pub async fn start(documents: Vec<Value>) -> Self {
        Self::launch(documents, None).await
    }

    /// A private repository; like the real API, its cursors repeat the token
    pub async fn start_with_token(documents: Vec<Value>, token: &str) -> Self {
        Self::launch(documents, Some(token.to_string())).await
    }

    async fn launch(documents: Vec<Value>, token: Option<String>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let endpoint = format!("http://{}/api/v2", addr);

        let state = Arc::new(MockState {
            endpoint: endpoint.clone(),
            token,
            documents: RwLock::new(documents),
            searches: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/v2", get(api_info))
            .route("/api/v2/documents/search", get(search))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { endpoint, state }
    }

    /// Replace the repository contents
    pub fn set_documents(&self, documents: Vec<Value>) {
        *self.state.documents.write().unwrap() = documents;
    }

    /// Number of search requests served so far
    pub fn searches(&self) -> usize {
        self.state.searches.load(Ordering::SeqCst)
    }

    /// `count` posts, newest first, uids `post-1..=post-count`
    pub fn sample_posts(count: usize) -> Vec<Value> {
        (1..=count).map(|i| Self::post(&format!("post-{}", i), &format!("Post {}", i))).collect()
    }

    pub fn post(uid: &str, title: &str) -> Value {
        json!({
            "id": format!("id-{}", uid),
            "uid": uid,
            "type": "post",
            "first_publication_date": "2021-03-25T19:25:28+0000",
            "last_publication_date": "2021-03-25T19:25:28+0000",
            "data": {
                "title": title,
                "subtitle": format!("About {}", title),
                "author": "Joseph Oliveira",
                "banner": { "url": format!("https://images.example/{}.png", uid) },
                "content": [
                    {
                        "heading": "Proin et varius",
                        "body": [
                            { "type": "paragraph", "text": "Lorem ipsum dolor sit amet.", "spans": [] }
                        ]
                    }
                ]
            }
        })
    }
}

fn authorized(state: &MockState, params: &HashMap<String, String>) -> bool {
    state.token.is_none() || params.get("access_token") == state.token.as_ref()
}

async fn api_info(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&state, &params) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    Json(json!({
        "refs": [
            { "id": "master", "ref": MASTER_REF, "label": "Master", "isMasterRef": true }
        ]
    }))
    .into_response()
}

async fn search(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&state, &params) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    if params.get("ref").map(String::as_str) != Some(MASTER_REF) {
        return (StatusCode::BAD_REQUEST, "missing ref").into_response();
    }
    state.searches.fetch_add(1, Ordering::SeqCst);

    let q = params.get("q").cloned();
    let uid = q
        .as_deref()
        .and_then(|q| UID_PREDICATE.captures(q))
        .map(|c| c[1].to_string());

    let documents: Vec<Value> = state
        .documents
        .read()
        .unwrap()
        .iter()
        .filter(|d| uid.as_deref().map_or(true, |uid| d["uid"] == uid))
        .cloned()
        .collect();

    let page_size: usize = params
        .get("pageSize")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(20)
        .max(1);
    let page: usize = params.get("page").and_then(|v| v.parse::<usize>().ok()).unwrap_or(1).max(1);
    let total_pages = documents.len().div_ceil(page_size);

    let results: Vec<Value> = documents
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    let next_page = (page < total_pages).then(|| {
        let mut pairs = vec![
            ("ref", MASTER_REF.to_string()),
            ("pageSize", page_size.to_string()),
            ("page", (page + 1).to_string()),
        ];
        if let Some(q) = &q {
            pairs.push(("q", q.clone()));
        }
        if let Some(token) = params.get("access_token") {
            pairs.push(("access_token", token.clone()));
        }
        url::Url::parse_with_params(&format!("{}/documents/search", state.endpoint), &pairs)
            .unwrap()
            .to_string()
    });

    Json(json!({
        "page": page,
        "results_per_page": page_size,
        "total_results_size": documents.len(),
        "total_pages": total_pages,
        "next_page": next_page,
        "prev_page": null,
        "results": results,
    }))
    .into_response()
}
