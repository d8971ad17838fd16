use thiserror::Error;

/// Failures talking to the upstream catalog API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {status_code} - {message}")]
    Api { status_code: u16, message: String },

    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A raw record that cannot become a usable entity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record has no url slug (title: {})", title.as_deref().unwrap_or("<none>"))]
    MissingSlug { title: Option<String> },

    #[error("chapter {position} of {parent} has no url slug")]
    MissingChapterSlug { parent: String, position: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}
