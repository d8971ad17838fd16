//! Upstream wire shapes and the endpoint catalogue.
//!
//! Field names follow the upstream API verbatim. Bodies are narrowed once into
//! [`Payload`] so the normalizer only ever sees one of a few known shapes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RevalidateConfig;
use crate::types::Resolution;

/// A JSON scalar the upstream sends as either a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Scalar::Int(n) => u32::try_from(*n).ok(),
            Scalar::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64 => Some(*f as u32),
            Scalar::Float(_) => None,
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// List endpoints (latest, recommended, movie, search results).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListItem {
    pub id: Option<Scalar>,
    pub url: Option<String>,
    pub judul: Option<String>,
    pub cover: Option<String>,
    pub lastch: Option<String>,
    pub lastup: Option<String>,
    pub genre: Option<Vec<String>>,
    pub sinopsis: Option<String>,
    pub studio: Option<String>,
    pub score: Option<Scalar>,
    pub status: Option<String>,
    pub rilis: Option<String>,
    pub total_episode: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetailItem {
    pub id: Option<Scalar>,
    pub series_id: Option<String>,
    pub cover: Option<String>,
    pub judul: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub rating: Option<Scalar>,
    pub published: Option<String>,
    /// Studio; the upstream labels it `author`.
    pub author: Option<String>,
    pub genre: Option<Vec<String>>,
    pub sinopsis: Option<String>,
    pub chapter: Option<Vec<RawChapter>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChapter {
    pub id: Option<Scalar>,
    /// Episode label: a number or the literal `Movie`.
    pub ch: Option<Scalar>,
    pub url: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawVideoRecord {
    pub episode_id: Option<Scalar>,
    pub reso: Option<Vec<String>>,
    pub stream: Option<Vec<RawStream>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStream {
    #[serde(default)]
    pub reso: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoResponse {
    #[serde(default)]
    pub data: Vec<RawVideoRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct SearchPage {
    result: Vec<RawListItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Bare(Vec<RawListItem>),
    Paged { data: Vec<SearchPage> },
    Wrapped { data: Vec<RawListItem> },
}

impl ListBody {
    fn into_items(self) -> Vec<RawListItem> {
        match self {
            ListBody::Bare(items) | ListBody::Wrapped { data: items } => items,
            ListBody::Paged { data } => data.into_iter().flat_map(|p| p.result).collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

#[derive(Deserialize)]
struct DetailBody {
    #[serde(default)]
    data: Option<OneOrMany<RawDetailItem>>,
}

/// Shape family an endpoint answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    List,
    Detail,
    Video,
}

/// A narrowed upstream body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    List(Vec<RawListItem>),
    Detail(Vec<RawDetailItem>),
    Video(VideoResponse),
}

impl Payload {
    pub fn parse(family: Family, body: &str) -> Result<Self, serde_json::Error> {
        Ok(match family {
            Family::List => Payload::List(serde_json::from_str::<ListBody>(body)?.into_items()),
            Family::Detail => {
                let items = match serde_json::from_str::<DetailBody>(body)?.data {
                    Some(OneOrMany::Many(v)) => v,
                    Some(OneOrMany::One(d)) => vec![d],
                    None => Vec::new(),
                };
                Payload::Detail(items)
            }
            Family::Video => Payload::Video(serde_json::from_str(body)?),
        })
    }
}

/// Upstream endpoint with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Latest { page: u32 },
    Recommended { page: u32 },
    Movies { page: u32 },
    Search { query: String },
    Detail { slug: String },
    Video { chapter: String, resolution: Resolution },
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Latest { .. } => "latest",
            Endpoint::Recommended { .. } => "recommended",
            Endpoint::Movies { .. } => "movie",
            Endpoint::Search { .. } => "search",
            Endpoint::Detail { .. } => "detail",
            Endpoint::Video { .. } => "getvideo",
        }
    }

    pub fn path(&self) -> String {
        format!("/anime/{}", self.name())
    }

    pub fn family(&self) -> Family {
        match self {
            Endpoint::Latest { .. } | Endpoint::Recommended { .. } | Endpoint::Movies { .. } | Endpoint::Search { .. } => Family::List,
            Endpoint::Detail { .. } => Family::Detail,
            Endpoint::Video { .. } => Family::Video,
        }
    }

    /// Query parameters in the order they are sent. Pages are clamped to >= 1.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::Latest { page } | Endpoint::Recommended { page } | Endpoint::Movies { page } => {
                vec![("page", (*page).max(1).to_string())]
            }
            Endpoint::Search { query } => vec![("query", query.clone())],
            Endpoint::Detail { slug } => vec![("urlId", slug.clone())],
            Endpoint::Video { chapter, resolution } => {
                vec![("chapterUrlId", chapter.clone()), ("reso", resolution.to_string())]
            }
        }
    }

    /// Exact cache identity: endpoint name plus every parameter.
    pub fn cache_key(&self) -> String {
        let params = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query())
            .finish();
        format!("{}|{}", self.name(), params)
    }

    /// Revalidation hint for cached responses; `None` means never cache.
    pub fn revalidate(&self, cfg: &RevalidateConfig) -> Option<Duration> {
        let secs = match self {
            Endpoint::Latest { .. } => cfg.latest_secs,
            Endpoint::Recommended { .. } => cfg.recommended_secs,
            Endpoint::Movies { .. } => cfg.movies_secs,
            Endpoint::Search { .. } => cfg.search_secs,
            Endpoint::Detail { .. } => cfg.detail_secs,
            Endpoint::Video { .. } => 0,
        };
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}
