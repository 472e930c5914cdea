//! Preview and production server with incremental regeneration
//!
//! Generated pages are served from the public dir. A page older than the
//! revalidate interval is still served, and a background task replaces it.
//! Posts that were never generated get the fallback page while they build.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{self, CacheEntry, MissCache, PageCache};
use crate::client::ContentError;
use crate::generator::{is_valid_slug, Generator, MorePosts, Route, NOT_FOUND_DESTINATION};
use crate::helpers;
use crate::pages::LOAD_MORE_PATH;
use crate::Site;

/// Most not-found slugs remembered at once
const MISSING_ROUTES_CAPACITY: usize = 1024;

/// A build every concurrent request for the route waits on; `None` once it
/// has failed
type Build = Arc<OnceCell<Option<CacheEntry>>>;

/// Server state
pub struct ServerState {
    generator: Arc<Generator>,
    cache: Mutex<PageCache>,
    missing: Mutex<MissCache>,
    in_flight: Mutex<HashMap<String, Build>>,
    revalidate: u64,
    base_dir: PathBuf,
    public_dir: PathBuf,
}

impl ServerState {
    /// Serve what an earlier `generate` left on disk
    pub fn new(generator: Generator) -> Arc<Self> {
        let site = generator.site();
        let cache = PageCache::load(&site.base_dir);
        Arc::new(Self {
            revalidate: site.config.revalidate,
            base_dir: site.base_dir.clone(),
            public_dir: site.public_dir.clone(),
            generator: Arc::new(generator),
            cache: Mutex::new(cache),
            missing: Mutex::new(MissCache::new(MISSING_ROUTES_CAPACITY)),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    fn cache(&self) -> MutexGuard<'_, PageCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn missing(&self) -> MutexGuard<'_, MissCache> {
        self.missing.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, Build>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Join the running build of a route, or start a new one
    fn join_build(&self, key: &str) -> Build {
        self.in_flight().entry(key.to_string()).or_default().clone()
    }

    fn finish_build(&self, key: &str, build: &Build) {
        let mut in_flight = self.in_flight();
        if in_flight.get(key).is_some_and(|b| Arc::ptr_eq(b, build)) {
            in_flight.remove(key);
        }
    }

    /// Record a finished build. A redirect is only persisted for a route
    /// that is already cached, which means it once had a page; other misses
    /// stay in the bounded in-memory set.
    fn store(&self, key: &str, entry: &CacheEntry) {
        let mut cache = self.cache();
        if entry.redirect.is_some() && cache.get(key).is_none() {
            self.missing().insert(key, entry.generated_at);
            return;
        }

        cache.record(key, entry.clone());
        self.missing().remove(key);
        if let Err(e) = cache.save(&self.base_dir) {
            tracing::warn!("Failed to save page cache: {}", e);
        }
    }

    fn site_url(&self, path: &str) -> String {
        helpers::url_for(&self.generator.site().config, path)
    }
}

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    let config = &state.generator.site().config;
    let post_route = format!("/{}/:slug", config.post_dir.trim_matches('/'));
    let root = config.root.trim_matches('/').to_string();

    let app = Router::new()
        .route("/", get(home_handler))
        .route(&post_route, get(post_handler))
        .route(&format!("/{}", LOAD_MORE_PATH), get(load_more_handler))
        .fallback_service(ServeDir::new(&state.public_dir).append_index_html_on_directories(true))
        .with_state(state);

    let app = if root.is_empty() {
        app
    } else {
        Router::new().nest(&format!("/{}", root), app)
    };

    app.layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn start(site: &Site, ip: &str, port: u16, open: bool) -> Result<()> {
    let generator = Generator::new(site)?;
    let state = ServerState::new(generator);
    if state.cache().routes.is_empty() {
        tracing::warn!("No generated pages found, pages will be built on first request");
    }
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!(
        "http://{}:{}{}",
        ip,
        port,
        helpers::url_for(&site.config, "/")
    );
    println!("Server running at {}", url);
    println!(
        "Pages revalidate every {}s. Press Ctrl+C to stop.",
        site.config.revalidate
    );

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn home_handler(State(state): State<Arc<ServerState>>) -> Response {
    serve_route(state, Route::Home).await
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    if !is_valid_slug(&slug) {
        return Redirect::temporary(&state.site_url(NOT_FOUND_DESTINATION)).into_response();
    }
    serve_route(state, Route::Post(slug)).await
}

#[derive(Debug, Deserialize)]
struct LoadMoreParams {
    #[serde(default)]
    cursor: String,
}

/// JSON endpoint behind the listing's "load more" control
async fn load_more_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<LoadMoreParams>,
) -> Response {
    if params.cursor.trim().is_empty() {
        return Json(MorePosts {
            html: String::new(),
            next_page: None,
            count: 0,
        })
        .into_response();
    }

    match state.generator.load_more(&params.cursor).await {
        Ok(more) => Json(more).into_response(),
        Err(e) => {
            tracing::warn!("Failed to load more posts: {}", e);
            let status = match e.downcast_ref::<ContentError>() {
                Some(ContentError::ForeignCursor(_)) | Some(ContentError::Url(_)) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, "Failed to load more posts").into_response()
        }
    }
}

async fn serve_route(state: Arc<ServerState>, route: Route) -> Response {
    let key = route.key();
    let mut entry = state.cache().get(&key).cloned();
    if entry.is_none() {
        entry = state
            .missing()
            .get(&key)
            .map(|checked_at| CacheEntry::redirect(NOT_FOUND_DESTINATION, checked_at));
    }

    let Some(entry) = entry else {
        return match route {
            // The listing has no fallback, build it while the client waits
            Route::Home => match regenerate(state.clone(), route).await {
                Some(entry) => respond(&state, &entry).await,
                None => (StatusCode::BAD_GATEWAY, "Failed to generate page").into_response(),
            },
            Route::Post(_) => {
                spawn_regeneration(state.clone(), route);
                fallback(&state)
            }
        };
    };

    let response = respond(&state, &entry).await;
    if entry.is_stale(cache::now_secs(), state.revalidate) {
        tracing::debug!("Served stale {}", key);
        spawn_regeneration(state, route);
    }
    response
}

async fn respond(state: &ServerState, entry: &CacheEntry) -> Response {
    if let Some(destination) = &entry.redirect {
        return Redirect::temporary(&state.site_url(destination)).into_response();
    }

    let path = state.public_dir.join(&entry.output_path);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!("Generated page {:?} is unreadable: {}", path, e);
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

fn fallback(state: &ServerState) -> Response {
    match state.generator.render_fallback() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render fallback page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

fn spawn_regeneration(state: Arc<ServerState>, route: Route) {
    tokio::spawn(async move {
        regenerate(state, route).await;
    });
}

/// Build a route and record it. Concurrent callers share one build; `None`
/// means the build failed and the previous page stays in place.
async fn regenerate(state: Arc<ServerState>, route: Route) -> Option<CacheEntry> {
    let key = route.key();
    let build = state.join_build(&key);

    let entry = build
        .get_or_init(|| async {
            match state.generator.build_route(&route).await {
                Ok(entry) => {
                    tracing::info!("Regenerated {}", key);
                    state.store(&key, &entry);
                    Some(entry)
                }
                Err(e) => {
                    tracing::warn!("Failed to regenerate {}: {}", key, e);
                    None
                }
            }
        })
        .await
        .clone();

    state.finish_build(&key, &build);
    entry
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
