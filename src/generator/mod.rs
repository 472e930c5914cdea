//! Generator module - renders pages from the content API into the public dir

use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use tera::Context;
use walkdir::WalkDir;

use crate::cache::{self, CacheEntry, PageCache};
use crate::client::ContentClient;
use crate::pages::{self, home::LOAD_MORE_LABEL, Listing, PostPage, SummaryView, ViewContext};
use crate::templates::TemplateRenderer;
use crate::Site;

/// Seconds before a fallback page reloads itself
pub const FALLBACK_REFRESH_SECS: u64 = 2;

/// Where a missing post sends the reader
pub const NOT_FOUND_DESTINATION: &str = "/";

/// A page the site can produce
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Post(String),
}

impl Route {
    /// Cache key
    pub fn key(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Post(slug) => format!("/post/{}", slug),
        }
    }
}

/// Slugs become directory names, so anything that could leave the post dir
/// is refused
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Result of generating a post page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Rendered(String),
    Redirect { destination: String, permanent: bool },
}

/// One "load more" batch, rendered for the listing script
#[derive(Debug, Clone, Serialize)]
pub struct MorePosts {
    pub html: String,
    pub next_page: Option<String>,
    pub count: usize,
}

/// Page generator backed by the content API
pub struct Generator {
    site: Site,
    client: ContentClient,
    renderer: TemplateRenderer,
    views: ViewContext,
}

impl Generator {
    /// Create a new generator; fails when the API is not configured
    pub fn new(site: &Site) -> Result<Self> {
        let client = ContentClient::new(&site.config.api)?;
        let renderer = TemplateRenderer::new()?;

        Ok(Self {
            site: site.clone(),
            client,
            renderer,
            views: ViewContext::new(&site.config),
        })
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// Generate the listing root and every known post, then save the cache
    pub async fn generate(&self) -> Result<PageCache> {
        fs::create_dir_all(&self.site.public_dir)?;
        self.copy_source_assets()?;

        let mut cache = PageCache::new();

        let entry = self.build_route(&Route::Home).await?;
        cache.record(Route::Home.key(), entry);

        let slugs = self.static_paths().await?;
        tracing::info!("Found {} posts", slugs.len());

        for slug in slugs {
            if !is_valid_slug(&slug) {
                tracing::warn!("Skipping post with unusable slug {:?}", slug);
                continue;
            }
            let route = Route::Post(slug);
            let entry = self.build_route(&route).await?;
            cache.record(route.key(), entry);
        }

        cache.save(&self.site.base_dir)?;
        Ok(cache)
    }

    /// Render and write one route, returning its cache entry
    pub async fn build_route(&self, route: &Route) -> Result<CacheEntry> {
        let now = cache::now_secs();
        let relative = self.output_path(route);

        let outcome = match route {
            Route::Home => PageOutcome::Rendered(self.render_home().await?),
            Route::Post(slug) => self.render_post(slug).await?,
        };

        match outcome {
            PageOutcome::Rendered(html) => {
                self.write_output(&relative, &html)?;
                Ok(CacheEntry::page(relative, now))
            }
            PageOutcome::Redirect { destination, .. } => {
                // A post that disappeared must not keep serving its old page
                let stale = self.site.public_dir.join(&relative);
                if stale.exists() {
                    fs::remove_file(&stale)?;
                    tracing::debug!("Removed: {:?}", stale);
                }
                Ok(CacheEntry::redirect(destination, now))
            }
        }
    }

    /// The first batch of posts with the "load more" control
    pub async fn render_home(&self) -> Result<String> {
        let listing = Listing::fetch_first(&self.client, &self.site.config).await?;

        let mut context = self.base_context();
        context.insert("posts", &listing.views(&self.views));
        context.insert("next_page", &listing.next_page());
        context.insert("load_more_label", LOAD_MORE_LABEL);

        self.renderer.render("index.html", &context)
    }

    /// Listing entries without the surrounding page
    pub fn render_listing_fragment(&self, posts: &[SummaryView]) -> Result<String> {
        let mut context = Context::new();
        context.insert("posts", posts);
        self.renderer.render("partials/posts.html", &context)
    }

    /// Follow a cursor once and render what came back
    pub async fn load_more(&self, cursor: &str) -> Result<MorePosts> {
        let mut listing = Listing::resume(cursor);
        let count = listing.load_more(&self.client).await?;

        Ok(MorePosts {
            html: self.render_listing_fragment(&listing.views(&self.views))?,
            next_page: listing.next_page().map(str::to_owned),
            count,
        })
    }

    /// Slugs to generate at build time
    pub async fn static_paths(&self) -> Result<Vec<String>> {
        Ok(pages::post::static_paths(&self.client, &self.site.config).await?)
    }

    /// Render a post page, or redirect home when the slug is unknown
    pub async fn render_post(&self, slug: &str) -> Result<PageOutcome> {
        let Some(post) = pages::post::fetch_post(&self.client, &self.site.config, slug).await?
        else {
            tracing::info!("Post {:?} not found, redirecting", slug);
            return Ok(PageOutcome::Redirect {
                destination: NOT_FOUND_DESTINATION.to_string(),
                permanent: false,
            });
        };

        let html = self.render_post_page(&PostPage::new(post))?;
        Ok(PageOutcome::Rendered(html))
    }

    /// Placeholder served while a post is generated on demand
    pub fn render_fallback(&self) -> Result<String> {
        self.render_post_page(&PostPage::fallback())
    }

    fn render_post_page(&self, page: &PostPage) -> Result<String> {
        let mut context = self.base_context();
        context.insert("post", &page.view(&self.views));
        context.insert("refresh_secs", &FALLBACK_REFRESH_SECS);
        self.renderer.render("post.html", &context)
    }

    /// Output file of a route, relative to the public dir
    pub fn output_path(&self, route: &Route) -> String {
        match route {
            Route::Home => "index.html".to_string(),
            Route::Post(slug) => format!(
                "{}/{}/index.html",
                self.site.config.post_dir.trim_matches('/'),
                slug
            ),
        }
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.views.site());
        context
    }

    fn write_output(&self, relative: &str, html: &str) -> Result<()> {
        let output_path = self.site.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        // The server may be reading the previous version
        let partial = output_path.with_extension("html.partial");
        fs::write(&partial, html)
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", partial, e))?;
        fs::rename(&partial, &output_path)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Copy static assets (logo, images) from the source directory
    fn copy_source_assets(&self) -> Result<()> {
        let source_dir = &self.site.source_dir;
        if !source_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || is_hidden(path.strip_prefix(source_dir)?) {
                continue;
            }

            let dest: PathBuf = self.site.public_dir.join(path.strip_prefix(source_dir)?);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
        }

        Ok(())
    }
}

fn is_hidden(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, SiteConfig};
    use crate::testing::MockApi;
    use tempfile::TempDir;

    fn site(dir: &Path, endpoint: &str) -> Site {
        Site::with_config(
            dir,
            SiteConfig {
                api: ApiConfig {
                    endpoint: endpoint.to_string(),
                    ..ApiConfig::default()
                },
                ..SiteConfig::default()
            },
        )
    }

    #[test]
    fn test_route_keys_and_paths() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&site(dir.path(), "http://127.0.0.1:9/api/v2")).unwrap();

        assert_eq!(Route::Home.key(), "/");
        assert_eq!(Route::Post("hello".into()).key(), "/post/hello");
        assert_eq!(generator.output_path(&Route::Home), "index.html");
        assert_eq!(
            generator.output_path(&Route::Post("hello".into())),
            "post/hello/index.html"
        );
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("como-utilizar-hooks"));
        assert!(is_valid_slug("ação"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug(".."));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug("a\\b"));
    }

    #[test]
    fn test_missing_endpoint_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Generator::new(&site(dir.path(), "")).is_err());
    }

    #[tokio::test]
    async fn test_generate_site() {
        let api = MockApi::start(MockApi::sample_posts(3)).await;
        let dir = TempDir::new().unwrap();
        let site = site(dir.path(), &api.endpoint);
        fs::create_dir_all(site.source_dir.join("images")).unwrap();
        fs::write(site.source_dir.join("images/logo.svg"), "<svg/>").unwrap();

        let generator = Generator::new(&site).unwrap();
        let cache = generator.generate().await.unwrap();

        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(index.contains("Post 1"));
        assert!(index.contains("Post 2"));
        assert!(!index.contains("Post 3"));
        assert!(index.contains(r#"id="load-more""#));
        assert!(index.contains(r#"href="/post/post-1""#));
        assert!(index.contains("25 mar 2021"));

        for slug in ["post-1", "post-2", "post-3"] {
            let page = site.public_dir.join("post").join(slug).join("index.html");
            assert!(page.exists(), "missing {:?}", page);
            assert!(cache.get(&format!("/post/{}", slug)).is_some());
        }
        let post = fs::read_to_string(site.public_dir.join("post/post-3/index.html")).unwrap();
        assert!(post.contains("<p>Lorem ipsum dolor sit amet.</p>"));
        assert!(post.contains("1 min"));
        assert!(!post.contains("http-equiv"));

        assert!(site.public_dir.join("images/logo.svg").exists());
        assert_eq!(PageCache::load(dir.path()).routes, cache.routes);
    }

    #[tokio::test]
    async fn test_no_load_more_without_cursor() {
        let api = MockApi::start(MockApi::sample_posts(2)).await;
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&site(dir.path(), &api.endpoint)).unwrap();

        let html = generator.render_home().await.unwrap();
        assert!(html.contains("Post 2"));
        assert!(!html.contains("load-more"));
    }

    #[tokio::test]
    async fn test_unknown_post_redirects_home() {
        let api = MockApi::start(MockApi::sample_posts(1)).await;
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&site(dir.path(), &api.endpoint)).unwrap();

        assert_eq!(
            generator.render_post("nope").await.unwrap(),
            PageOutcome::Redirect {
                destination: "/".to_string(),
                permanent: false
            }
        );
    }

    #[tokio::test]
    async fn test_removed_post_drops_its_page() {
        let api = MockApi::start(MockApi::sample_posts(1)).await;
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&site(dir.path(), &api.endpoint)).unwrap();
        let route = Route::Post("post-1".to_string());

        let entry = generator.build_route(&route).await.unwrap();
        let page = generator.site().public_dir.join(&entry.output_path);
        assert!(page.exists());

        api.set_documents(Vec::new());
        let entry = generator.build_route(&route).await.unwrap();
        assert_eq!(entry.redirect.as_deref(), Some("/"));
        assert!(!page.exists());
    }

    #[tokio::test]
    async fn test_load_more_fragment() {
        let api = MockApi::start(MockApi::sample_posts(3)).await;
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&site(dir.path(), &api.endpoint)).unwrap();

        let listing = Listing::fetch_first(generator.client(), &generator.site().config)
            .await
            .unwrap();
        let cursor = listing.next_page().unwrap().to_string();

        let more = generator.load_more(&cursor).await.unwrap();
        assert_eq!(more.count, 1);
        assert!(more.html.contains("Post 3"));
        assert!(!more.html.contains("Post 1"));
        assert!(more.next_page.is_none());
    }

    #[tokio::test]
    async fn test_rendered_listing_hides_access_token() {
        let api = MockApi::start_with_token(MockApi::sample_posts(5), "s3cret").await;
        let dir = TempDir::new().unwrap();
        let mut site = site(dir.path(), &api.endpoint);
        site.config.api.access_token = Some("s3cret".to_string());
        let generator = Generator::new(&site).unwrap();

        let html = generator.render_home().await.unwrap();
        assert!(html.contains(r#"id="load-more""#));
        assert!(!html.contains("s3cret"));

        let listing = Listing::fetch_first(generator.client(), &generator.site().config)
            .await
            .unwrap();
        let cursor = listing.next_page().unwrap().to_string();
        assert!(!cursor.contains("s3cret"));

        let more = generator.load_more(&cursor).await.unwrap();
        assert!(more.html.contains("Post 3"));
        assert!(!more.next_page.unwrap().contains("s3cret"));
    }

    #[test]
    fn test_fallback_page() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&site(dir.path(), "http://127.0.0.1:9/api/v2")).unwrap();

        let html = generator.render_fallback().unwrap();
        assert!(html.contains("Loading..."));
        assert!(html.contains(r#"<meta http-equiv="refresh" content="2">"#));
    }
}
