//! YouTube loader with tiered fallback.
//!
//! Tiers, tried in order until one produces text:
//!
//! 1. human-authored captions in the configured language → origin `transcript`
//! 2. auto-generated (`asr`) captions in that language → origin `transcript`
//! 3. video title + description → origin `metadata`
//!
//! If everything fails the result is a single placeholder segment with
//! origin `none`. This loader never returns an error; the origin tag is how
//! callers detect a degraded result.
//!
//! Captions and metadata come from the `ytInitialPlayerResponse` JSON that
//! the watch page embeds in a `<script>` tag.

use std::sync::LazyLock;

use anyhow::{bail, Context};
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ExtractConfig;
use crate::models::{Extraction, Origin};

static PLAYER_RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)ytInitialPlayerResponse\s*=\s*(\{.*?\})\s*;\s*(?:var\s|</script>)").unwrap()
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `Some("asr")` for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn matches_language(&self, lang: &str) -> bool {
        let code = self.language_code.to_ascii_lowercase();
        let lang = lang.to_ascii_lowercase();
        code == lang || code.starts_with(&format!("{}-", lang))
    }
}

/// Extracts the video id from the usual YouTube URL shapes.
pub fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let id = if host == "youtu.be" {
        segments.next().map(str::to_string)
    } else if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        Some(v.into_owned())
    } else {
        match segments.next() {
            Some("shorts" | "embed" | "live" | "v") => segments.next().map(str::to_string),
            _ => None,
        }
    };

    id.filter(|id| {
        !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Runs the caption → metadata → placeholder tiers for a video URL.
#[tracing::instrument(skip_all, fields(url = %url))]
pub async fn extract_video(http: &reqwest::Client, url: &Url, config: &ExtractConfig) -> Extraction {
    let player = match fetch_player_response(http, url, config).await {
        Ok(player) => player,
        Err(e) => {
            tracing::warn!(error = %e, "video page unavailable, degrading to placeholder");
            return placeholder(&format!("{:#}", e));
        }
    };

    let tracks = caption_tracks(&player);
    let lang = config.caption_language.as_str();

    for auto_generated in [false, true] {
        let Some(track) = select_track(&tracks, lang, auto_generated) else {
            continue;
        };
        match fetch_caption_text(http, &track.base_url).await {
            Ok(text) if !text.is_empty() => {
                tracing::info!(
                    language = %track.language_code,
                    auto_generated,
                    chars = text.len(),
                    "using video captions"
                );
                return Extraction::single(text, Origin::Transcript);
            }
            Ok(_) => tracing::debug!(auto_generated, "caption track was empty"),
            Err(e) => tracing::warn!(error = %e, auto_generated, "caption fetch failed"),
        }
    }

    match metadata_text(&player) {
        Some(text) => {
            tracing::info!("no usable captions, falling back to video metadata");
            Extraction::single(text, Origin::Metadata)
        }
        None => placeholder("no captions or metadata available"),
    }
}

fn placeholder(reason: &str) -> Extraction {
    Extraction::single(format!("Transcript not available: {}", reason), Origin::None)
}

async fn fetch_player_response(
    http: &reqwest::Client,
    url: &Url,
    config: &ExtractConfig,
) -> anyhow::Result<Value> {
    let id = video_id(url).with_context(|| format!("no video id in {}", url))?;
    let watch_url = Url::parse_with_params(
        &config.youtube_watch_url,
        &[("v", id.as_str()), ("hl", config.caption_language.as_str())],
    )
    .context("invalid extract.youtube_watch_url")?;

    let response = http
        .get(watch_url)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await?;
    if !response.status().is_success() {
        bail!("watch page returned {}", response.status());
    }
    let html = response.text().await?;

    parse_player_response(&html)
}

/// Pulls the `ytInitialPlayerResponse` object out of a watch page.
pub fn parse_player_response(html: &str) -> anyhow::Result<Value> {
    let captures = PLAYER_RESPONSE_RE
        .captures(html)
        .context("ytInitialPlayerResponse not found in watch page")?;
    let json = serde_json::from_str(&captures[1]).context("ytInitialPlayerResponse is not valid JSON")?;
    Ok(json)
}

pub fn caption_tracks(player: &Value) -> Vec<CaptionTrack> {
    player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"]
        .as_array()
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|t| serde_json::from_value::<CaptionTrack>(t.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// First track in `lang` of the requested kind; exact language codes win
/// over regional variants (`en` before `en-GB`).
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    lang: &str,
    auto_generated: bool,
) -> Option<&'a CaptionTrack> {
    let candidates = || {
        tracks
            .iter()
            .filter(move |t| t.is_auto_generated() == auto_generated && t.matches_language(lang))
    };
    candidates()
        .find(|t| t.language_code.eq_ignore_ascii_case(lang))
        .or_else(|| candidates().next())
}

async fn fetch_caption_text(http: &reqwest::Client, base_url: &str) -> anyhow::Result<String> {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    let url = format!("{}{}fmt=json3", base_url, separator);

    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        bail!("caption track returned {}", response.status());
    }
    let body = response.text().await?;
    parse_caption_payload(&body)
}

/// Flattens a caption payload into plain text.
///
/// Accepts the `json3` shape (`events[].segs[].utf8`) and a plain list of
/// `{ "text": … }` entries.
pub fn parse_caption_payload(body: &str) -> anyhow::Result<String> {
    let data: Value = serde_json::from_str(body).context("caption payload is not JSON")?;

    let pieces: Vec<&str> = if let Some(events) = data.get("events").and_then(Value::as_array) {
        events
            .iter()
            .filter_map(|e| e.get("segs").and_then(Value::as_array))
            .flatten()
            .filter_map(|seg| seg.get("utf8").and_then(Value::as_str))
            .collect()
    } else if let Some(entries) = data.as_array() {
        entries
            .iter()
            .filter_map(|e| e.get("text").and_then(Value::as_str))
            .collect()
    } else {
        Vec::new()
    };

    Ok(pieces
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" "))
}

/// `Title: …\nDescription: …` from `videoDetails`, or `None` if both are empty.
pub fn metadata_text(player: &Value) -> Option<String> {
    let details = &player["videoDetails"];
    let title = details["title"].as_str().unwrap_or_default().trim();
    let description = details["shortDescription"]
        .as_str()
        .unwrap_or_default()
        .trim();

    if title.is_empty() && description.is_empty() {
        return None;
    }
    Some(format!("Title: {}\nDescription: {}", title, description))
}
