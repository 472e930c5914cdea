//! Page components
//!
//! `home` is the post listing with its "load more" state, `post` is a single
//! post. Both turn content models into the serializable views the templates
//! render.

pub mod home;
pub mod post;

pub use home::{Listing, SummaryView};
pub use post::{BlockView, PostPage, PostView};

use serde::Serialize;

use crate::config::SiteConfig;
use crate::helpers::{self, html_escape, DateFormatter};

/// Route of the JSON endpoint the listing page calls for more posts
pub const LOAD_MORE_PATH: &str = "api/posts";

/// Site-wide values every template sees
#[derive(Debug, Clone, Serialize)]
pub struct SiteView {
    pub title: String,
    pub lang: String,
    /// Pre-escaped URLs
    pub root: String,
    pub logo: String,
    pub load_more_url: String,
}

/// Shared inputs for building views
#[derive(Debug, Clone)]
pub struct ViewContext {
    config: SiteConfig,
    dates: DateFormatter,
}

impl ViewContext {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            config: config.clone(),
            dates: DateFormatter::from_config(config),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn dates(&self) -> &DateFormatter {
        &self.dates
    }

    pub fn site(&self) -> SiteView {
        SiteView {
            title: self.config.title.clone(),
            lang: self.config.language.replace('_', "-"),
            root: html_escape(&helpers::url_for(&self.config, "/")),
            logo: html_escape(&helpers::url_for(&self.config, "images/logo.svg")),
            load_more_url: html_escape(&helpers::url_for(&self.config, LOAD_MORE_PATH)),
        }
    }

    /// Escaped link to a post page
    pub fn post_href(&self, slug: &str) -> String {
        html_escape(&helpers::post_url(&self.config, slug))
    }
}
