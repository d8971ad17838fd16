//! Display-oriented views over normalized lists.
//!
//! Everything here is a pure function of its inputs except
//! [`recommendations`], whose randomness comes from the caller's RNG, and
//! [`fallback_scan`], which only sequences the page fetches it is handed.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{Anime, ContentType};

/// Which entry survives when several share a slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    KeepFirst,
    /// Last-seen data wins, at the position the slug first appeared.
    #[default]
    KeepLast,
}

/// First `n` items, order kept.
pub fn trending(items: &[Anime], n: usize) -> Vec<Anime> {
    items.iter().take(n).cloned().collect()
}

/// `n` series picked uniformly at random; movies are never included.
pub fn recommendations<R: Rng + ?Sized>(items: &[Anime], n: usize, rng: &mut R) -> Vec<Anime> {
    let mut series: Vec<Anime> = items
        .iter()
        .filter(|a| a.content_type == ContentType::Series)
        .cloned()
        .collect();
    series.shuffle(rng);
    series.truncate(n);
    series
}

pub fn dedup_by_slug(items: Vec<Anime>, policy: DedupPolicy) -> Vec<Anime> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<Anime> = Vec::with_capacity(items.len());
    for item in items {
        match seen.get(&item.url_id) {
            Some(&idx) => {
                if policy == DedupPolicy::KeepLast {
                    out[idx] = item;
                }
            }
            None => {
                seen.insert(item.url_id.clone(), out.len());
                out.push(item);
            }
        }
    }
    out
}

/// Stable: series before movies, ties keep their relative order.
pub fn sort_series_first(items: &mut [Anime]) {
    items.sort_by_key(|a| a.content_type == ContentType::Movie);
}

/// Case-insensitive substring match on the title.
pub fn filter_by_title(items: Vec<Anime>, query: &str) -> Vec<Anime> {
    let q = query.trim().to_lowercase();
    items.into_iter().filter(|a| a.title.to_lowercase().contains(&q)).collect()
}

/// Titles with more than one episode.
pub fn series_only(items: Vec<Anime>) -> Vec<Anime> {
    items.into_iter().filter(|a| a.total_episodes.is_some_and(|n| n > 1)).collect()
}

/// Single-episode titles or anything classified as a movie.
pub fn movies_only(items: Vec<Anime>) -> Vec<Anime> {
    items
        .into_iter()
        .filter(|a| a.total_episodes == Some(1) || a.content_type == ContentType::Movie)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Upper bound on page requests.
    pub max_pages: u32,
    /// Stop once this many matches have been collected; also caps the result.
    pub threshold: usize,
    pub page_delay: Duration,
    pub dedup: DedupPolicy,
}

/// Bounded title search across listing pages `1..=max_pages`, requested in
/// order. Failed pages are logged and skipped. The result is deduplicated,
/// series first, at most `threshold` long.
pub async fn fallback_scan<F, Fut, E>(query: &str, opts: ScanOptions, mut fetch_page: F) -> Vec<Anime>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<Anime>, E>>,
    E: Display,
{
    let mut found: Vec<Anime> = Vec::new();
    for page in 1..=opts.max_pages {
        if page > 1 && !opts.page_delay.is_zero() {
            tokio::time::sleep(opts.page_delay).await;
        }
        match fetch_page(page).await {
            Ok(items) => found.extend(filter_by_title(items, query)),
            Err(e) => {
                tracing::warn!(page, error = %e, "fallback scan: page failed");
                continue;
            }
        }
        if found.len() >= opts.threshold {
            break;
        }
    }
    let mut unique = dedup_by_slug(found, opts.dedup);
    sort_series_first(&mut unique);
    unique.truncate(opts.threshold);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;

    fn anime(slug: &str, kind: ContentType) -> Anime {
        Anime {
            id: slug.to_string(),
            url_id: slug.to_string(),
            title: slug.replace('-', " "),
            poster: String::new(),
            content_type: kind,
            latest_episode: None,
            last_update: None,
            genres: None,
            synopsis: None,
            studio: None,
            score: None,
            status: None,
            release_date: None,
            total_episodes: None,
        }
    }

    fn slugs(items: &[Anime]) -> Vec<&str> {
        items.iter().map(|a| a.url_id.as_str()).collect()
    }

    fn mixed() -> Vec<Anime> {
        (0..20)
            .map(|i| anime(&format!("t-{i}"), if i % 3 == 0 { ContentType::Movie } else { ContentType::Series }))
            .collect()
    }

    #[test]
    fn trending_truncates_in_order() {
        let items = mixed();
        assert_eq!(slugs(&trending(&items, 3)), ["t-0", "t-1", "t-2"]);
        assert_eq!(trending(&items, 100).len(), 20);
        assert!(trending(&items, 0).is_empty());
    }

    #[test]
    fn recommendations_are_seeded_and_series_only() {
        let items = mixed();
        let a = recommendations(&items, 5, &mut StdRng::seed_from_u64(42));
        let b = recommendations(&items, 5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a.iter().all(|x| x.content_type == ContentType::Series));

        let all = recommendations(&items, 100, &mut StdRng::seed_from_u64(7));
        assert_eq!(all.len(), items.iter().filter(|x| x.content_type == ContentType::Series).count());
    }

    #[test]
    fn dedup_policies_choose_the_winner() {
        let mut first = anime("dup", ContentType::Series);
        first.score = Some("7.0".into());
        let mut last = anime("dup", ContentType::Series);
        last.score = Some("9.0".into());
        let items = vec![first, anime("other", ContentType::Series), last];

        let kept_last = dedup_by_slug(items.clone(), DedupPolicy::KeepLast);
        assert_eq!(slugs(&kept_last), ["dup", "other"]);
        assert_eq!(kept_last[0].score.as_deref(), Some("9.0"));

        let kept_first = dedup_by_slug(items, DedupPolicy::KeepFirst);
        assert_eq!(slugs(&kept_first), ["dup", "other"]);
        assert_eq!(kept_first[0].score.as_deref(), Some("7.0"));
    }

    #[test]
    fn series_first_sort_is_stable() {
        let mut items = vec![
            anime("m1", ContentType::Movie),
            anime("s1", ContentType::Series),
            anime("m2", ContentType::Movie),
            anime("s2", ContentType::Series),
        ];
        sort_series_first(&mut items);
        assert_eq!(slugs(&items), ["s1", "s2", "m1", "m2"]);
    }

    #[test]
    fn episode_count_filters() {
        let mut one = anime("one", ContentType::Series);
        one.total_episodes = Some(1);
        let mut many = anime("many", ContentType::Series);
        many.total_episodes = Some(12);
        let flagged = anime("flagged", ContentType::Movie);
        let unknown = anime("unknown", ContentType::Series);
        let items = vec![one, many, flagged, unknown];
        assert_eq!(slugs(&series_only(items.clone())), ["many"]);
        assert_eq!(slugs(&movies_only(items)), ["one", "flagged"]);
    }

    #[test]
    fn title_filter_ignores_case() {
        let items = vec![anime("One-Piece", ContentType::Series), anime("naruto", ContentType::Series)];
        assert_eq!(slugs(&filter_by_title(items, " PIECE ")), ["One-Piece"]);
    }

    fn opts(max_pages: u32, threshold: usize) -> ScanOptions {
        ScanOptions { max_pages, threshold, page_delay: Duration::ZERO, dedup: DedupPolicy::KeepLast }
    }

    #[tokio::test]
    async fn scan_never_exceeds_page_bound() {
        let calls = Cell::new(0u32);
        let out = fallback_scan("zzz", opts(5, 10), |page| {
            calls.set(calls.get() + 1);
            async move { Ok::<_, String>(vec![anime(&format!("p{page}"), ContentType::Series)]) }
        })
        .await;
        assert!(out.is_empty());
        assert_eq!(calls.get(), 5);
    }

    #[tokio::test]
    async fn scan_stops_at_threshold_in_page_order() {
        let pages = Cell::new(Vec::new());
        let out = fallback_scan("hit", opts(5, 2), |page| {
            let mut seen = pages.take();
            seen.push(page);
            pages.set(seen);
            async move { Ok::<_, String>(vec![anime(&format!("hit-{page}"), ContentType::Series)]) }
        })
        .await;
        assert_eq!(pages.take(), [1, 2]);
        assert_eq!(slugs(&out), ["hit-1", "hit-2"]);
    }

    #[tokio::test]
    async fn scan_skips_failed_pages_and_sorts() {
        let out = fallback_scan("x", opts(3, 10), |page| async move {
            match page {
                1 => Ok(vec![anime("x-movie", ContentType::Movie), anime("x-a", ContentType::Series)]),
                2 => Err("boom"),
                _ => Ok(vec![anime("x-a", ContentType::Series), anime("x-b", ContentType::Series)]),
            }
        })
        .await;
        assert_eq!(slugs(&out), ["x-a", "x-b", "x-movie"]);
    }
}
