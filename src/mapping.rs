use crate::api::{RawChapter, RawDetailItem, RawListItem, Scalar, VideoResponse};
use crate::error::NormalizeError;
use crate::types::{Anime, AnimeDetail, Chapter, ContentType, ListSource, Resolution, VideoStream, FALLBACK_POSTER};

const MOVIE_LABEL: &str = "Movie";

/// Trimmed, non-empty text or `None`.
fn text(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn scalar_text(v: Option<&Scalar>) -> Option<String> {
    text(v.map(ToString::to_string).as_deref())
}

fn genres(v: Option<&Vec<String>>) -> Option<Vec<String>> {
    let list: Vec<String> = v?.iter().filter_map(|g| text(Some(g.as_str()))).collect();
    (!list.is_empty()).then_some(list)
}

/// Human title from a slug: `"one-piece-ep-3"` becomes `"One Piece Ep 3"`.
pub fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut cs = w.chars();
            match cs.next() {
                Some(c) => c.to_uppercase().chain(cs).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Series vs movie for a list record. First matching rule wins.
pub fn classify_item(raw: &RawListItem, source: ListSource) -> ContentType {
    if source == ListSource::Movies {
        return ContentType::Movie;
    }
    if let Some(label) = raw.lastch.as_deref() {
        if label.to_lowercase().contains("movie") {
            return ContentType::Movie;
        }
        if label.contains("Ep") || label.contains("Episode") {
            return ContentType::Series;
        }
    }
    if raw.total_episode.as_ref().and_then(Scalar::as_u32) == Some(1) {
        return ContentType::Movie;
    }
    ContentType::Series
}

pub fn classify_detail(raw: &RawDetailItem) -> ContentType {
    if raw.kind.as_deref().is_some_and(|k| k.trim().eq_ignore_ascii_case("movie")) {
        return ContentType::Movie;
    }
    match raw.chapter.as_deref() {
        Some([only]) if chapter_label(only).as_deref() == Some(MOVIE_LABEL) => ContentType::Movie,
        _ => ContentType::Series,
    }
}

fn chapter_label(raw: &RawChapter) -> Option<String> {
    scalar_text(raw.ch.as_ref())
}

/// Display title for an episode label; the label is used verbatim.
pub fn chapter_title(label: &str) -> String {
    if label == MOVIE_LABEL {
        MOVIE_LABEL.to_string()
    } else {
        format!("Episode {label}")
    }
}

pub fn normalize_item(raw: &RawListItem, source: ListSource) -> Result<Anime, NormalizeError> {
    let url_id = text(raw.url.as_deref()).ok_or_else(|| NormalizeError::MissingSlug { title: text(raw.judul.as_deref()) })?;
    Ok(Anime {
        id: scalar_text(raw.id.as_ref()).unwrap_or_else(|| url_id.clone()),
        title: text(raw.judul.as_deref()).unwrap_or_else(|| title_from_slug(&url_id)),
        poster: text(raw.cover.as_deref()).unwrap_or_else(|| FALLBACK_POSTER.to_string()),
        content_type: classify_item(raw, source),
        latest_episode: text(raw.lastch.as_deref()),
        last_update: text(raw.lastup.as_deref()),
        genres: genres(raw.genre.as_ref()),
        synopsis: text(raw.sinopsis.as_deref()),
        studio: text(raw.studio.as_deref()),
        score: scalar_text(raw.score.as_ref()),
        status: text(raw.status.as_deref()),
        release_date: text(raw.rilis.as_deref()),
        total_episodes: raw.total_episode.as_ref().and_then(Scalar::as_u32),
        url_id,
    })
}

/// Normalize a page of records, logging and skipping the ones without identity.
pub fn normalize_list(raw: &[RawListItem], source: ListSource) -> Vec<Anime> {
    raw.iter()
        .filter_map(|r| match normalize_item(r, source) {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::warn!(error = %e, "skipping list record");
                None
            }
        })
        .collect()
}

/// `position` is 1-based and only used when the upstream label is missing.
pub fn normalize_chapter(raw: &RawChapter, parent: &str, position: usize) -> Result<Chapter, NormalizeError> {
    let chapter_url_id = text(raw.url.as_deref())
        .ok_or_else(|| NormalizeError::MissingChapterSlug { parent: parent.to_string(), position })?;
    let label = chapter_label(raw);
    Ok(Chapter {
        title: match label.as_deref() {
            Some(l) => chapter_title(l),
            None => format!("Episode {position}"),
        },
        chapter_url_id,
        date: text(raw.date.as_deref()),
        episode_number: label,
    })
}

pub fn normalize_detail(raw: &RawDetailItem) -> Result<AnimeDetail, NormalizeError> {
    let url_id = text(raw.series_id.as_deref()).ok_or_else(|| NormalizeError::MissingSlug { title: text(raw.judul.as_deref()) })?;
    let chapters = raw
        .chapter
        .as_deref()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .filter_map(|(i, c)| match normalize_chapter(c, &url_id, i + 1) {
            Ok(ch) => Some(ch),
            Err(e) => {
                tracing::warn!(error = %e, "skipping chapter");
                None
            }
        })
        .collect();
    Ok(AnimeDetail {
        id: scalar_text(raw.id.as_ref()).unwrap_or_else(|| url_id.clone()),
        title: text(raw.judul.as_deref()).unwrap_or_else(|| title_from_slug(&url_id)),
        poster: text(raw.cover.as_deref()).unwrap_or_else(|| FALLBACK_POSTER.to_string()),
        content_type: classify_detail(raw),
        status: text(raw.status.as_deref()),
        score: scalar_text(raw.rating.as_ref()),
        release_date: text(raw.published.as_deref()),
        studio: text(raw.author.as_deref()),
        genres: genres(raw.genre.as_ref()),
        synopsis: text(raw.sinopsis.as_deref()),
        chapters,
        url_id,
    })
}

/// Pick the stream for `resolution`, falling back to the first one offered.
/// `None` when the upstream reported an error or offered no streams at all.
pub fn select_stream(resp: &VideoResponse, resolution: Resolution) -> Option<VideoStream> {
    if let Some(err) = resp.error.as_deref() {
        tracing::warn!(error = err, "video lookup reported an error");
        return None;
    }
    let streams: Vec<_> = resp
        .data
        .first()?
        .stream
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|s| !s.link.trim().is_empty())
        .collect();
    let chosen = streams
        .iter()
        .find(|s| s.reso.trim().eq_ignore_ascii_case(resolution.as_str()))
        .or_else(|| streams.first())?;
    Some(VideoStream { resolution: chosen.reso.trim().to_string(), url: chosen.link.trim().to_string() })
}
