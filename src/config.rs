use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::views::DedupPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.sansekai.my.id/api";

/// Library configuration. Loaded from defaults, then an optional TOML file,
/// then `BETAFLIX_*` environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub revalidate: RevalidateConfig,
    pub search: SearchConfig,
    pub catalog: CatalogConfig,
    pub home: HomeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("betaflix/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// sqlx database URL; `None` picks a SQLite file in the user cache dir.
    pub database_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, database_url: None }
    }
}

/// Per-endpoint cache lifetimes in seconds. Zero disables caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    pub latest_secs: u64,
    pub recommended_secs: u64,
    pub movies_secs: u64,
    pub search_secs: u64,
    pub detail_secs: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self { latest_secs: 60, recommended_secs: 300, movies_secs: 60, search_secs: 300, detail_secs: 30 }
    }
}

/// Listing scanned when the search endpoint fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackCatalog {
    #[default]
    Latest,
    Recommended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    /// Result cap for series-only catalogue searches, applied before filtering.
    pub series_limit: usize,
    pub fallback_pages: u32,
    pub fallback_delay_ms: u64,
    pub fallback_catalog: FallbackCatalog,
    pub dedup: DedupPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            series_limit: 50,
            fallback_pages: 5,
            fallback_delay_ms: 200,
            fallback_catalog: FallbackCatalog::Latest,
            dedup: DedupPolicy::KeepLast,
        }
    }
}

/// Catalogue browsing. A movie view is stitched together from several
/// upstream pages; a series page maps to one recommended page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub pages_per_view: u32,
    pub page_delay_ms: u64,
    /// Highest movie view served; larger requests are clamped.
    pub max_views: u32,
    /// Highest series catalogue page served; larger requests are clamped.
    pub max_series_pages: u32,
    pub dedup: DedupPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            pages_per_view: 10,
            page_delay_ms: 300,
            max_views: 15,
            max_series_pages: 150,
            dedup: DedupPolicy::KeepLast,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeConfig {
    pub trending: usize,
    pub recommendations: usize,
    pub movies: usize,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self { trending: 12, recommendations: 10, movies: 15 }
    }
}

impl Config {
    /// Defaults, overlaid by `path` when given, overlaid by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }

    /// Apply `BETAFLIX_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BETAFLIX_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.upstream.base_url = v.trim().to_string();
        }
        if let Some(v) = lookup("BETAFLIX_TIMEOUT_SECS") {
            self.upstream.timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var: "BETAFLIX_TIMEOUT_SECS", value: v.clone() })?;
        }
        if let Some(v) = lookup("BETAFLIX_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.cache.database_url = Some(v.trim().to_string());
        }
        if let Some(v) = lookup("BETAFLIX_CACHE") {
            self.cache.enabled = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => return Err(ConfigError::Env { var: "BETAFLIX_CACHE", value: v }),
            };
        }
        Ok(())
    }
}
