use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::api::{Endpoint, Payload, RawDetailItem, RawListItem, VideoResponse};
use crate::client::{Upstream, UpstreamClient};
use crate::config::{Config, FallbackCatalog};
use crate::error::UpstreamError;
use crate::mapping::{normalize_detail, normalize_list, select_stream};
use crate::storage::Storage;
use crate::types::{Anime, AnimeDetail, ContentType, ListSource, Resolution, VideoStream};
use crate::views::{self, ScanOptions};

/// Landing page rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeFeed {
    pub hero: Option<Anime>,
    pub latest: Vec<Anime>,
    pub trending: Vec<Anime>,
    pub movies: Vec<Anime>,
    pub recommendations: Vec<Anime>,
}

/// Aggregator owns the upstream transport + an optional response cache and
/// provides the public fetch helpers. Upstream failures are logged and
/// recovered here: list helpers return an empty list, single lookups `None`.
pub struct Aggregator {
    upstream: Arc<dyn Upstream>,
    cache: Option<Arc<dyn Storage>>,
    refresh: bool,
    config: Config,
}

impl Aggregator {
    pub fn new(config: Config) -> Result<Self> {
        let client = UpstreamClient::new(&config.upstream)?;
        Ok(Self::with_upstream(config, Arc::new(client)))
    }

    pub fn with_upstream(config: Config, upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream, cache: None, refresh: false, config }
    }

    /// Attach a response cache.
    pub fn with_cache(mut self, cache: Arc<dyn Storage>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Skip cache reads; fresh responses are still written back.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn config(&self) -> &Config { &self.config }

    /// Fetch and narrow, consulting the cache first. Bodies are cached only
    /// after they narrow successfully, under the endpoint's exact key.
    pub async fn fetch(&self, endpoint: &Endpoint) -> Result<Payload, UpstreamError> {
        let ttl = endpoint.revalidate(&self.config.revalidate);
        let key = endpoint.cache_key();
        let now = current_epoch();

        if let (Some(cache), Some(_), false) = (&self.cache, ttl, self.refresh) {
            match cache.get_cache(&key, now).await {
                Ok(Some(body)) => match Payload::parse(endpoint.family(), &body) {
                    Ok(p) => {
                        tracing::debug!(key = %key, "cache hit");
                        return Ok(p);
                    }
                    Err(e) => tracing::warn!(key = %key, error = %e, "discarding unreadable cache entry"),
                },
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "cache read failed"),
            }
        }

        let body = self.upstream.get(endpoint).await?;
        let payload = Payload::parse(endpoint.family(), &body)?;

        if let (Some(cache), Some(ttl)) = (&self.cache, ttl) {
            let expires_at = now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
            if let Err(e) = cache.put_cache(&key, &body, expires_at).await {
                tracing::warn!(key = %key, error = %e, "cache write failed");
            }
        }
        Ok(payload)
    }

    async fn fetch_list(&self, endpoint: &Endpoint) -> Result<Vec<RawListItem>, UpstreamError> {
        match self.fetch(endpoint).await? {
            Payload::List(items) => Ok(items),
            other => unreachable!("list endpoint narrowed to {other:?}"),
        }
    }

    async fn fetch_details(&self, endpoint: &Endpoint) -> Result<Vec<RawDetailItem>, UpstreamError> {
        match self.fetch(endpoint).await? {
            Payload::Detail(items) => Ok(items),
            other => unreachable!("detail endpoint narrowed to {other:?}"),
        }
    }

    async fn fetch_video(&self, endpoint: &Endpoint) -> Result<VideoResponse, UpstreamError> {
        match self.fetch(endpoint).await? {
            Payload::Video(v) => Ok(v),
            other => unreachable!("video endpoint narrowed to {other:?}"),
        }
    }

    async fn list_page(&self, endpoint: Endpoint, source: ListSource) -> Result<Vec<Anime>, UpstreamError> {
        let raw = self.fetch_list(&endpoint).await?;
        Ok(normalize_list(&raw, source))
    }

    fn recover<T: Default>(res: Result<T, UpstreamError>, what: &str) -> T {
        res.unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to fetch {what}");
            T::default()
        })
    }

    pub async fn latest(&self, page: u32) -> Vec<Anime> {
        Self::recover(self.list_page(Endpoint::Latest { page }, ListSource::Mixed).await, "latest anime")
    }

    pub async fn recommended(&self, page: u32) -> Vec<Anime> {
        Self::recover(self.list_page(Endpoint::Recommended { page }, ListSource::Mixed).await, "recommended anime")
    }

    /// Multi-episode titles from a latest page.
    pub async fn series_only(&self, page: u32, limit: usize) -> Vec<Anime> {
        let mut out = views::series_only(self.latest(page).await);
        out.truncate(limit);
        out
    }

    /// Movie endpoint page; when it fails, movies filtered out of the
    /// recommended page of the same number.
    pub async fn movies(&self, page: u32) -> Vec<Anime> {
        match self.list_page(Endpoint::Movies { page }, ListSource::Movies).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(page, error = %e, "movie endpoint failed, filtering recommended");
                let res = self
                    .list_page(Endpoint::Recommended { page }, ListSource::Mixed)
                    .await
                    .map(views::movies_only);
                Self::recover(res, "movies")
            }
        }
    }

    /// One catalogue view stitched from `pages_per_view` consecutive movie
    /// pages, fetched in order with a pause between requests. Views past
    /// `max_views` are clamped to the last one.
    pub async fn movie_catalog(&self, view_page: u32) -> Vec<Anime> {
        let c = &self.config.catalog;
        let per = c.pages_per_view.max(1);
        let view = view_page.clamp(1, c.max_views.max(1));
        let Some(first) = (view - 1).checked_mul(per).and_then(|n| n.checked_add(1)) else {
            tracing::warn!(view_page, per, "movie catalogue view out of range");
            return Vec::new();
        };
        let last = first.saturating_add(per - 1);
        let delay = Duration::from_millis(c.page_delay_ms);
        let mut all = Vec::new();
        for page in first..=last {
            if page > first && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            all.extend(self.movies(page).await);
        }
        views::dedup_by_slug(all, self.config.catalog.dedup)
    }

    /// One recommended page, deduplicated by slug. Pages past
    /// `max_series_pages` are clamped to the last one.
    pub async fn series_catalog(&self, page: u32) -> Vec<Anime> {
        let page = page.clamp(1, self.config.catalog.max_series_pages.max(1));
        views::dedup_by_slug(self.recommended(page).await, self.config.catalog.dedup)
    }

    /// Title search. Falls back to a bounded listing scan when the search
    /// endpoint fails.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Anime> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        match self.list_page(Endpoint::Search { query: query.to_string() }, ListSource::Mixed).await {
            Ok(mut items) => {
                views::sort_series_first(&mut items);
                items.truncate(limit);
                items
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "search endpoint failed, scanning listing pages");
                self.fallback_search(query, limit).await
            }
        }
    }

    /// Search restricted to series; `limit` caps the search before filtering.
    pub async fn search_series(&self, query: &str, limit: usize) -> Vec<Anime> {
        let mut out = self.search(query, limit).await;
        out.retain(|a| a.content_type == ContentType::Series);
        out
    }

    async fn fallback_search(&self, query: &str, limit: usize) -> Vec<Anime> {
        let s = &self.config.search;
        let opts = ScanOptions {
            max_pages: s.fallback_pages,
            threshold: limit,
            page_delay: Duration::from_millis(s.fallback_delay_ms),
            dedup: s.dedup,
        };
        let catalog = s.fallback_catalog;
        views::fallback_scan(query, opts, |page| {
            let endpoint = match catalog {
                FallbackCatalog::Latest => Endpoint::Latest { page },
                FallbackCatalog::Recommended => Endpoint::Recommended { page },
            };
            self.list_page(endpoint, ListSource::Mixed)
        })
        .await
    }

    pub async fn detail(&self, slug: &str) -> Option<AnimeDetail> {
        let raw = match self.fetch_details(&Endpoint::Detail { slug: slug.to_string() }).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(slug, error = %e, "failed to fetch anime detail");
                return None;
            }
        };
        let first = raw.first()?;
        normalize_detail(first)
            .map_err(|e| tracing::error!(slug, error = %e, "unusable anime detail"))
            .ok()
    }

    pub async fn video(&self, chapter: &str, resolution: Resolution) -> Option<VideoStream> {
        let endpoint = Endpoint::Video { chapter: chapter.to_string(), resolution };
        match self.fetch_video(&endpoint).await {
            Ok(resp) => {
                let stream = select_stream(&resp, resolution);
                if stream.is_none() {
                    tracing::warn!(chapter, %resolution, "no video streams available");
                }
                stream
            }
            Err(e) => {
                tracing::error!(chapter, error = %e, "failed to get video");
                None
            }
        }
    }

    pub async fn video_url(&self, chapter: &str, resolution: Resolution) -> Option<String> {
        self.video(chapter, resolution).await.map(|s| s.url)
    }

    /// Latest and movie rows are fetched concurrently.
    pub async fn home(&self) -> HomeFeed {
        let (latest, movies) = futures::join!(self.latest(1), self.movies(1));
        self.assemble_home(latest, movies, &mut StdRng::from_entropy())
    }

    pub async fn home_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> HomeFeed {
        let (latest, movies) = futures::join!(self.latest(1), self.movies(1));
        self.assemble_home(latest, movies, rng)
    }

    fn assemble_home<R: Rng + ?Sized>(&self, latest: Vec<Anime>, mut movies: Vec<Anime>, rng: &mut R) -> HomeFeed {
        let h = &self.config.home;
        movies.truncate(h.movies);
        HomeFeed {
            hero: latest.first().cloned(),
            trending: views::trending(&latest, h.trending),
            recommendations: views::recommendations(&latest, h.recommendations, rng),
            movies,
            latest,
        }
    }

    /// Drop expired cache entries.
    pub async fn purge_expired(&self) -> Result<u64> {
        match &self.cache {
            Some(c) => c.purge_expired(current_epoch()).await,
            None => Ok(0),
        }
    }

    pub async fn clear_cache(&self, prefix: Option<&str>) -> Result<u64> {
        match &self.cache {
            Some(c) => c.clear_cache_prefix(prefix).await,
            None => Ok(0),
        }
    }
}

fn current_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
