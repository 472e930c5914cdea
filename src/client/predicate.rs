//! Query predicates and options for the document search endpoint

use std::fmt;

/// Field equality predicate, rendered as `[at(document.type, "post")]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub path: String,
    pub value: String,
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[at({}, {})]", self.path, quote(&self.value))
    }
}

/// Render a predicate list as the `q` query parameter
pub fn to_query(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(ToString::to_string).collect();
    format!("[{}]", inner)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Search options: projection, ordering and page size
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub fetch: Vec<String>,
    pub orderings: Option<String>,
    pub page_size: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only return the listed fields (`post.title`, ...)
    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn orderings(mut self, orderings: impl Into<String>) -> Self {
        self.orderings = Some(orderings.into());
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Query parameters besides `ref`, `q` and `access_token`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if let Some(orderings) = &self.orderings {
            params.push(("orderings", orderings.clone()));
        }
        if let Some(page_size) = self.page_size {
            params.push(("pageSize", page_size.to_string()));
        }
        params
    }
}
