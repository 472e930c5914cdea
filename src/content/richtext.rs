//! Structured rich text
//!
//! The CMS stores formatted text as a list of blocks, each carrying plain
//! `text` plus `spans` that mark character ranges as bold, italic, links and
//! so on. This module turns such fragments into plain text (for word counts)
//! or into HTML. HTML output always passes through the sanitizer, so callers
//! only ever see a [`SafeHtml`].

use serde::{Deserialize, Serialize};

use super::post::nullable;
use crate::helpers::{html_escape, SafeHtml};

/// A rich-text fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Block>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, deserialize_with = "nullable")]
    pub text: String,
    #[serde(default, deserialize_with = "nullable")]
    pub spans: Vec<Span>,
    /// Image source
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub oembed: Option<Embed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

impl BlockKind {
    fn heading_level(self) -> Option<u8> {
        match self {
            Self::Heading1 => Some(1),
            Self::Heading2 => Some(2),
            Self::Heading3 => Some(3),
            Self::Heading4 => Some(4),
            Self::Heading5 => Some(5),
            Self::Heading6 => Some(6),
            _ => None,
        }
    }

    fn list_tag(self) -> Option<&'static str> {
        match self {
            Self::ListItem => Some("ul"),
            Self::OrderedListItem => Some("ol"),
            _ => None,
        }
    }
}

/// Inline formatting over `[start, end)` character offsets of a block's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl RichText {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain text of every block, joined by single spaces
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .map(|block| block.text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render to sanitized HTML
    pub fn as_html(&self) -> SafeHtml {
        SafeHtml::sanitize(&self.to_raw_html())
    }

    fn to_raw_html(&self) -> String {
        let mut out = String::new();
        let mut open_list: Option<&'static str> = None;

        for block in &self.0 {
            let list = block.kind.list_tag();
            if open_list != list {
                if let Some(tag) = open_list {
                    out.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    out.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }

            match block.kind {
                kind if kind.heading_level().is_some() => {
                    let level = kind.heading_level().unwrap_or(1);
                    out.push_str(&format!(
                        "<h{level}>{}</h{level}>",
                        render_spans(&block.text, &block.spans)
                    ));
                }
                BlockKind::Paragraph => {
                    out.push_str(&format!("<p>{}</p>", render_spans(&block.text, &block.spans)));
                }
                BlockKind::Preformatted => {
                    out.push_str(&format!(
                        "<pre>{}</pre>",
                        render_spans(&block.text, &block.spans)
                    ));
                }
                BlockKind::ListItem | BlockKind::OrderedListItem => {
                    out.push_str(&format!("<li>{}</li>", render_spans(&block.text, &block.spans)));
                }
                BlockKind::Image => {
                    if let Some(url) = block.url.as_deref() {
                        out.push_str(&format!(
                            r#"<p class="block-img"><img src="{}" alt="{}"></p>"#,
                            html_escape(url),
                            html_escape(block.alt.as_deref().unwrap_or(""))
                        ));
                    }
                }
                BlockKind::Embed => {
                    if let Some(url) = block.oembed.as_ref().and_then(|e| e.embed_url.as_deref()) {
                        let title = block
                            .oembed
                            .as_ref()
                            .and_then(|e| e.title.as_deref())
                            .unwrap_or(url);
                        out.push_str(&format!(
                            r#"<div class="embed"><a href="{}">{}</a></div>"#,
                            html_escape(url),
                            html_escape(title)
                        ));
                    }
                }
                _ => {}
            }
        }

        if let Some(tag) = open_list {
            out.push_str(&format!("</{}>", tag));
        }

        out
    }
}

/// Escape `text` and wrap span ranges in tags; overlapping spans are split
/// so the output always nests properly
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let end_of = |span: &Span| span.end.min(len);

    let mut spans: Vec<&Span> = spans
        .iter()
        .filter(|s| s.kind != SpanKind::Unknown && s.start < s.end && s.start < len)
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;

    for i in 0..=len {
        if open.iter().any(|s| end_of(s) == i) {
            let mut reopen = Vec::new();
            while open.iter().any(|s| end_of(s) == i) {
                let Some(span) = open.pop() else { break };
                out.push_str(&format!("</{}>", tag_name(span)));
                if end_of(span) != i {
                    reopen.push(span);
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&open_tag(span));
                open.push(span);
            }
        }

        while next < spans.len() && spans[next].start == i {
            out.push_str(&open_tag(spans[next]));
            open.push(spans[next]);
            next += 1;
        }

        if i < len {
            match chars[i] {
                '\n' => out.push_str("<br>"),
                c => out.push_str(&html_escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
    }

    out
}

fn link_url(span: &Span) -> Option<&str> {
    span.data.as_ref().and_then(|d| d.url.as_deref())
}

fn tag_name(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "strong",
        SpanKind::Em => "em",
        SpanKind::Hyperlink if link_url(span).is_some() => "a",
        _ => "span",
    }
}

fn open_tag(span: &Span) -> String {
    match (tag_name(span), span.kind) {
        ("a", _) => {
            let url = html_escape(link_url(span).unwrap_or_default());
            match span.data.as_ref().and_then(|d| d.target.as_deref()) {
                Some(target) => format!(r#"<a href="{}" target="{}">"#, url, html_escape(target)),
                None => format!(r#"<a href="{}">"#, url),
            }
        }
        (_, SpanKind::Label) => match span.data.as_ref().and_then(|d| d.label.as_deref()) {
            Some(label) => format!(r#"<span class="{}">"#, html_escape(label)),
            None => "<span>".to_string(),
        },
        (tag, _) => format!("<{}>", tag),
    }
}
