//! Compound filters over normalized items.
//!
//! Each option is `Option<_>`: `None` imposes nothing, `Some` must hold. Present
//! options are AND-ed and the input order is preserved.
//!
//! Missing data is handled differently per group. Technical predicates
//! (resolution, audio format, file size, content rating, activity dates) exclude
//! items that lack the data. Analysis predicates (bpm, key, mood, acoustic ratio,
//! dynamic range, loudness) keep items that lack the field.

use chrono::{NaiveDate, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::types::{LibraryItem, Media, WatchedStatus};

pub const LOSSLESS_CODECS: &[&str] = &["flac", "alac", "ape", "wav", "dts", "truehd", "pcm", "aiff"];
pub const LOSSY_CODECS: &[&str] = &["mp3", "aac", "ac3", "eac3", "ogg", "vorbis", "opus", "wma"];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
pub enum Resolution {
    #[serde(rename = "4k", alias = "4K", alias = "2160", alias = "2160p")]
    UltraHd,
    #[serde(rename = "1080", alias = "1080p")]
    FullHd,
    #[serde(rename = "720", alias = "720p")]
    Hd,
    #[serde(rename = "sd", alias = "SD")]
    Sd,
}

impl Resolution {
    /// Rendition-level height and tag win; a rendition without them falls back
    /// to its first part that has one.
    fn matches(self, media: &Media) -> bool {
        let tag = media
            .video_resolution
            .as_deref()
            .or_else(|| media.parts.iter().find_map(|p| p.video_resolution.as_deref()))
            .map(|r| r.trim().to_ascii_lowercase());
        let height = media
            .height
            .or_else(|| media.parts.iter().find_map(|p| p.height))
            .or_else(|| tag.as_deref().and_then(height_from_tag));
        let Some(height) = height else {
            return false;
        };
        match self {
            Self::UltraHd => height >= 2160 || tag.as_deref() == Some("4k"),
            Self::FullHd => height >= 1080,
            Self::Hd => height >= 720,
            Self::Sd => height < 720,
        }
    }
}

/// Height implied by a Plex `videoResolution` tag ("4k", "1080", "sd", ...).
fn height_from_tag(tag: &str) -> Option<u32> {
    match tag {
        "4k" => Some(2160),
        "sd" => Some(480),
        other => other.trim_end_matches('p').parse().ok(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioFormat {
    Lossless,
    Lossy,
    Codec(String),
}

impl AudioFormat {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.as_str() {
            "lossless" => Self::Lossless,
            "lossy" => Self::Lossy,
            _ => Self::Codec(lower),
        }
    }

    fn matches(&self, codec: &str) -> bool {
        let codec = codec.trim().to_ascii_lowercase();
        match self {
            Self::Lossless => LOSSLESS_CODECS.contains(&codec.as_str()),
            Self::Lossy => LOSSY_CODECS.contains(&codec.as_str()),
            Self::Codec(name) => *name == codec,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct AdvancedFilters {
    #[schemars(description = "Exact content rating (e.g. 'PG-13', 'TV-MA'), case-sensitive")]
    pub content_rating: Option<String>,
    #[schemars(description = "Minimum video resolution: '4k', '1080', '720', or 'sd' (below 720)")]
    pub resolution: Option<Resolution>,
    #[schemars(
        description = "Audio format: 'lossless', 'lossy', or a codec name such as 'flac' or 'aac'"
    )]
    pub audio_format: Option<String>,
    #[schemars(description = "Minimum total file size in MB")]
    pub file_size_min: Option<f64>,
    #[schemars(description = "Maximum total file size in MB")]
    pub file_size_max: Option<f64>,
    #[schemars(description = "Minimum BPM (items without BPM are kept)")]
    pub bpm_min: Option<f64>,
    #[schemars(description = "Maximum BPM (items without BPM are kept)")]
    pub bpm_max: Option<f64>,
    #[schemars(description = "Musical key, e.g. 'Am' (items without a key are kept)")]
    pub musical_key: Option<String>,
    #[schemars(description = "Mood: energetic, aggressive, melancholic, calm")]
    pub mood: Option<String>,
    #[schemars(description = "Minimum acoustic ratio 0.0-1.0")]
    pub acoustic_ratio_min: Option<f64>,
    #[schemars(description = "Maximum acoustic ratio 0.0-1.0")]
    pub acoustic_ratio_max: Option<f64>,
    #[schemars(description = "Minimum dynamic range in dB")]
    pub dynamic_range_min: Option<f64>,
    #[schemars(description = "Maximum loudness in LUFS")]
    pub loudness_max: Option<f64>,
}

impl AdvancedFilters {
    pub fn is_empty(&self) -> bool {
        self.content_rating.is_none()
            && self.resolution.is_none()
            && self.audio_format.is_none()
            && self.file_size_min.is_none()
            && self.file_size_max.is_none()
            && self.bpm_min.is_none()
            && self.bpm_max.is_none()
            && self.musical_key.is_none()
            && self.mood.is_none()
            && self.acoustic_ratio_min.is_none()
            && self.acoustic_ratio_max.is_none()
            && self.dynamic_range_min.is_none()
            && self.loudness_max.is_none()
    }
}

/// Total size of every part of every rendition, in MB. `None` without parts.
fn total_size_mb(item: &LibraryItem) -> Option<f64> {
    let mut parts = item.parts().peekable();
    parts.peek()?;
    let bytes = parts.filter_map(|p| p.size).fold(0u64, u64::saturating_add);
    Some(bytes as f64 / BYTES_PER_MB)
}

/// `true` unless `value` is present and fails `check`.
fn pass_if_missing<T>(value: Option<T>, check: impl FnOnce(T) -> bool) -> bool {
    value.is_none_or(check)
}

pub fn matches_advanced(item: &LibraryItem, filters: &AdvancedFilters) -> bool {
    if let Some(ref rating) = filters.content_rating
        && item.content_rating.as_deref() != Some(rating.as_str())
    {
        return false;
    }

    if let Some(resolution) = filters.resolution
        && !item.media.iter().any(|m| resolution.matches(m))
    {
        return false;
    }

    if let Some(ref raw) = filters.audio_format {
        let format = AudioFormat::parse(raw);
        let any_part = item.media.iter().any(|m| {
            m.parts.iter().any(|p| {
                p.audio_codec
                    .as_deref()
                    .or(m.audio_codec.as_deref())
                    .is_some_and(|codec| format.matches(codec))
            })
        });
        if !any_part {
            return false;
        }
    }

    if filters.file_size_min.is_some() || filters.file_size_max.is_some() {
        let Some(size) = total_size_mb(item) else {
            return false;
        };
        if filters.file_size_min.is_some_and(|min| size < min)
            || filters.file_size_max.is_some_and(|max| size > max)
        {
            return false;
        }
    }

    if let Some(min) = filters.bpm_min
        && !pass_if_missing(item.bpm, |bpm| bpm >= min)
    {
        return false;
    }
    if let Some(max) = filters.bpm_max
        && !pass_if_missing(item.bpm, |bpm| bpm <= max)
    {
        return false;
    }
    if let Some(ref key) = filters.musical_key
        && !pass_if_missing(item.musical_key.as_deref(), |k| k.eq_ignore_ascii_case(key))
    {
        return false;
    }
    if let Some(ref mood) = filters.mood
        && !pass_if_missing(item.mood.as_deref(), |m| m.eq_ignore_ascii_case(mood))
    {
        return false;
    }
    if let Some(min) = filters.acoustic_ratio_min
        && !pass_if_missing(item.acoustic_ratio, |r| r >= min)
    {
        return false;
    }
    if let Some(max) = filters.acoustic_ratio_max
        && !pass_if_missing(item.acoustic_ratio, |r| r <= max)
    {
        return false;
    }
    if let Some(min) = filters.dynamic_range_min
        && !pass_if_missing(item.dynamic_range, |dr| dr >= min)
    {
        return false;
    }
    if let Some(max) = filters.loudness_max
        && !pass_if_missing(item.loudness, |l| l <= max)
    {
        return false;
    }

    true
}

pub fn apply_advanced_filters(items: Vec<LibraryItem>, filters: &AdvancedFilters) -> Vec<LibraryItem> {
    if filters.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| matches_advanced(item, filters))
        .collect()
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// Play activity of an entity, as read by the activity filters.
pub trait Activity {
    fn play_count(&self) -> u64;
    fn last_played_at(&self) -> Option<i64>;
}

impl Activity for LibraryItem {
    fn play_count(&self) -> u64 {
        self.view_count
    }

    fn last_played_at(&self) -> Option<i64> {
        self.last_viewed_at
    }
}

impl Activity for WatchedStatus {
    fn play_count(&self) -> u64 {
        self.view_count
    }

    fn last_played_at(&self) -> Option<i64> {
        self.last_viewed_at
    }
}

#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct ActivityFilters {
    #[schemars(description = "Minimum play count (inclusive)")]
    pub play_count_min: Option<u64>,
    #[schemars(description = "Maximum play count (inclusive)")]
    pub play_count_max: Option<u64>,
    #[schemars(description = "Only items that have never been played")]
    pub never_played: Option<bool>,
    #[schemars(description = "Last played on or after this date (YYYY-MM-DD, UTC)")]
    pub last_played_after: Option<String>,
    #[schemars(description = "Last played on or before this date (YYYY-MM-DD, UTC)")]
    pub last_played_before: Option<String>,
    #[schemars(description = "Last played within this many days (fractions allowed)")]
    pub played_in_last_days: Option<f64>,
}

impl ActivityFilters {
    pub fn is_empty(&self) -> bool {
        self.play_count_min.is_none()
            && self.play_count_max.is_none()
            && self.never_played.is_none()
            && self.last_played_after.is_none()
            && self.last_played_before.is_none()
            && self.played_in_last_days.is_none()
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok();
    if parsed.is_none() {
        tracing::warn!(date = raw, "ignoring unparseable activity date");
    }
    parsed
}

/// Epoch seconds of 00:00:00 UTC on `date`.
fn day_start(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Start of a "last `days` days" window. Negative or non-finite windows impose
/// no constraint.
fn window_start(days: f64, now: i64) -> Option<i64> {
    if !days.is_finite() || days < 0.0 {
        tracing::warn!(days, "ignoring invalid played_in_last_days");
        return None;
    }
    // `as` saturates, so huge windows reach back to the earliest timestamp.
    Some(now.saturating_sub((days * SECONDS_PER_DAY).round() as i64))
}

/// Resolved bounds, computed once per filter pass.
struct ActivityBounds {
    after: Option<i64>,
    before: Option<i64>,
    since: Option<i64>,
}

impl ActivityBounds {
    fn new(filters: &ActivityFilters, now: i64) -> Self {
        Self {
            after: filters
                .last_played_after
                .as_deref()
                .and_then(parse_date)
                .map(day_start),
            before: filters
                .last_played_before
                .as_deref()
                .and_then(parse_date)
                .map(|d| day_start(d) + SECONDS_PER_DAY as i64 - 1),
            since: filters.played_in_last_days.and_then(|days| window_start(days, now)),
        }
    }
}

fn matches_activity_bounds<T: Activity>(
    item: &T,
    filters: &ActivityFilters,
    bounds: &ActivityBounds,
) -> bool {
    let plays = item.play_count();
    if filters.play_count_min.is_some_and(|min| plays < min)
        || filters.play_count_max.is_some_and(|max| plays > max)
    {
        return false;
    }
    if filters.never_played == Some(true) && plays != 0 {
        return false;
    }

    let last = item.last_played_at();
    for (bound, holds) in [
        (bounds.after, last.zip(bounds.after).is_some_and(|(l, b)| l >= b)),
        (bounds.before, last.zip(bounds.before).is_some_and(|(l, b)| l <= b)),
        (bounds.since, last.zip(bounds.since).is_some_and(|(l, b)| l >= b)),
    ] {
        if bound.is_some() && !holds {
            return false;
        }
    }
    true
}

/// Activity match evaluated at `now` (epoch seconds).
pub fn matches_activity_at<T: Activity>(item: &T, filters: &ActivityFilters, now: i64) -> bool {
    matches_activity_bounds(item, filters, &ActivityBounds::new(filters, now))
}

pub fn apply_activity_filters_at<T: Activity>(
    items: Vec<T>,
    filters: &ActivityFilters,
    now: i64,
) -> Vec<T> {
    if filters.is_empty() {
        return items;
    }
    let bounds = ActivityBounds::new(filters, now);
    items
        .into_iter()
        .filter(|item| matches_activity_bounds(item, filters, &bounds))
        .collect()
}

pub fn apply_activity_filters<T: Activity>(items: Vec<T>, filters: &ActivityFilters) -> Vec<T> {
    apply_activity_filters_at(items, filters, Utc::now().timestamp())
}
