//! Post models, projected straight from API documents

use serde::{Deserialize, Deserializer, Serialize};

use super::richtext::RichText;

/// A post as shown on the listing page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Slug
    #[serde(default)]
    pub uid: Option<String>,

    /// Raw API timestamp, e.g. `2021-03-25T19:25:28+0000`
    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub data: SummaryFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// A full post as shown on its own page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub data: DetailFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub banner: Option<Banner>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: Option<String>,
}

/// One section of a post: a heading followed by a rich-text body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default, deserialize_with = "nullable")]
    pub heading: String,
    #[serde(default, deserialize_with = "nullable")]
    pub body: RichText,
}

impl PostDetail {
    pub fn banner_url(&self) -> Option<&str> {
        self.data
            .banner
            .as_ref()
            .and_then(|b| b.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Treat an explicit `null` like a missing field
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
