//! HTML helper functions

use ammonia::Builder;
use lazy_static::lazy_static;
use serde::Serialize;
use std::fmt;

lazy_static! {
    static ref SANITIZER: Builder<'static> = sanitizer();
}

/// An HTML fragment that has been through the sanitizer
///
/// The only way to build one is [`SafeHtml::sanitize`], so templates can emit
/// it unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn sanitize(raw: &str) -> Self {
        Self(SANITIZER.clean(raw).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitizer() -> Builder<'static> {
    let mut builder = Builder::default();
    builder
        .add_generic_attributes(&["class"])
        .add_tag_attributes("a", &["target"])
        .link_rel(Some("noopener noreferrer"));
    builder
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
