//! Raw Plex containers to canonical entities.
//!
//! Every function here is total: a missing container, a missing items array, or a
//! field of the wrong shape produces an empty sequence or an absent field, never an
//! error. Plex is inconsistent about stringified numbers and which keys exist per
//! media type, so each field is read through the tolerant helpers below.

use serde_json::Value;

use crate::types::{
    Hierarchy, Library, LibraryItem, Media, MediaType, OnDeckEntry, PLAYLIST_KIND, Part, Playlist,
    PlaylistType, WatchHistoryEntry, WatchedStatus,
};

const CONTAINER: &str = "MediaContainer";

/// Where the items of a raw response live.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RawContainer<'a> {
    /// `MediaContainer.<key>` is an array.
    Items(&'a [Value]),
    /// Hub search layout: `MediaContainer.Hub[].Metadata`.
    Hubs(&'a [Value]),
    Empty,
}

impl<'a> RawContainer<'a> {
    pub(crate) fn locate(raw: &'a Value, key: &str) -> Self {
        let Some(container) = raw.get(CONTAINER).filter(|c| c.is_object()) else {
            return Self::Empty;
        };
        if let Some(items) = container.get(key).and_then(Value::as_array) {
            return Self::Items(items);
        }
        match container.get("Hub").and_then(Value::as_array) {
            Some(hubs) => Self::Hubs(hubs),
            None => Self::Empty,
        }
    }

    /// Like `locate`, but never falls back to the hub layout.
    pub(crate) fn locate_flat(raw: &'a Value, key: &str) -> Self {
        match Self::locate(raw, key) {
            Self::Hubs(_) => Self::Empty,
            other => other,
        }
    }

    pub(crate) fn items(self) -> Vec<&'a Value> {
        match self {
            Self::Items(items) => items.iter().filter(|v| v.is_object()).collect(),
            Self::Hubs(hubs) => hubs
                .iter()
                .filter_map(|hub| hub.get("Metadata").and_then(Value::as_array))
                .flatten()
                .filter(|v| v.is_object())
                .collect(),
            Self::Empty => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

pub(crate) fn string(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn int(item: &Value, key: &str) -> Option<i64> {
    match item.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

pub(crate) fn float(item: &Value, key: &str) -> Option<f64> {
    match item.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn unsigned(item: &Value, key: &str) -> Option<u64> {
    int(item, key).and_then(|n| u64::try_from(n).ok())
}

fn small(item: &Value, key: &str) -> Option<u32> {
    int(item, key).and_then(|n| u32::try_from(n).ok())
}

fn year(item: &Value) -> Option<i32> {
    int(item, "year").and_then(|n| i32::try_from(n).ok())
}

fn count(item: &Value, key: &str) -> u64 {
    unsigned(item, key).unwrap_or(0)
}

/// Plex flags arrive as `true`, `1`, or `"1"`.
fn flag(item: &Value, key: &str) -> Option<bool> {
    match item.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Tag list from the Plex key (`Genre: [{tag}]`), falling back to the canonical
/// key (`genres: ["..."]`) so already-normalized records read back unchanged.
fn tags(item: &Value, plex_key: &str, canonical_key: &str) -> Vec<String> {
    let list = item
        .get(plex_key)
        .and_then(Value::as_array)
        .or_else(|| item.get(canonical_key).and_then(Value::as_array));
    let Some(list) = list else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => string(entry, "tag"),
            _ => None,
        })
        .collect()
}

fn hierarchy(item: &Value) -> Hierarchy {
    Hierarchy {
        parent_title: string(item, "parentTitle"),
        grandparent_title: string(item, "grandparentTitle"),
        parent_rating_key: string(item, "parentRatingKey"),
        grandparent_rating_key: string(item, "grandparentRatingKey"),
    }
}

fn media_type(item: &Value) -> MediaType {
    item.get("type")
        .and_then(Value::as_str)
        .map(MediaType::from_name)
        .unwrap_or_default()
}

fn array<'a>(item: &'a Value, key: &str) -> &'a [Value] {
    item.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn part(raw: &Value) -> Part {
    Part {
        audio_codec: string(raw, "audioCodec"),
        size: unsigned(raw, "size"),
        height: small(raw, "height"),
        video_resolution: string(raw, "videoResolution"),
        container: string(raw, "container"),
        file: string(raw, "file"),
    }
}

fn media(raw: &Value) -> Media {
    Media {
        bitrate: small(raw, "bitrate"),
        audio_codec: string(raw, "audioCodec"),
        audio_channels: small(raw, "audioChannels"),
        video_resolution: string(raw, "videoResolution"),
        height: small(raw, "height"),
        parts: array(raw, "Part")
            .iter()
            .filter(|p| p.is_object())
            .map(part)
            .collect(),
    }
}

fn library_item(item: &Value) -> LibraryItem {
    LibraryItem {
        title: string(item, "title").unwrap_or_default(),
        media_type: media_type(item),
        year: year(item),
        summary: string(item, "summary"),
        rating: float(item, "rating"),
        duration: int(item, "duration"),
        added_at: int(item, "addedAt"),
        last_viewed_at: int(item, "lastViewedAt"),
        view_count: count(item, "viewCount"),
        content_rating: string(item, "contentRating"),
        rating_key: string(item, "ratingKey").unwrap_or_default(),
        key: string(item, "key").unwrap_or_default(),
        hierarchy: hierarchy(item),
        genres: tags(item, "Genre", "genres"),
        directors: tags(item, "Director", "directors"),
        writers: tags(item, "Writer", "writers"),
        actors: tags(item, "Role", "actors"),
        media: array(item, "Media")
            .iter()
            .filter(|m| m.is_object())
            .map(media)
            .collect(),
        bpm: float(item, "bpm"),
        musical_key: string(item, "musicalKey"),
        mood: string(item, "mood"),
        acoustic_ratio: float(item, "acousticRatio"),
        dynamic_range: float(item, "dynamicRange"),
        loudness: float(item, "loudness"),
    }
}

fn history_entry(item: &Value) -> WatchHistoryEntry {
    WatchHistoryEntry {
        title: string(item, "title").unwrap_or_default(),
        media_type: media_type(item),
        rating_key: string(item, "ratingKey"),
        year: year(item),
        viewed_at: int(item, "viewedAt"),
        account_id: int(item, "accountID"),
        device_id: int(item, "deviceID"),
        view_offset: int(item, "viewOffset"),
        duration: int(item, "duration"),
        hierarchy: hierarchy(item),
    }
}

// ---------------------------------------------------------------------------
// Normalizers
// ---------------------------------------------------------------------------

/// Search results: `MediaContainer.Metadata`, or the hub layout of `/hubs/search`.
pub fn normalize_search_results(raw: &Value) -> Vec<LibraryItem> {
    RawContainer::locate(raw, "Metadata")
        .items()
        .into_iter()
        .map(library_item)
        .collect()
}

/// Contents of a library section, playlist, or metadata lookup.
pub fn normalize_library_content(raw: &Value) -> Vec<LibraryItem> {
    RawContainer::locate_flat(raw, "Metadata")
        .items()
        .into_iter()
        .map(library_item)
        .collect()
}

pub fn normalize_libraries(raw: &Value) -> Vec<Library> {
    RawContainer::locate_flat(raw, "Directory")
        .items()
        .into_iter()
        .map(|item| Library {
            key: string(item, "key").unwrap_or_default(),
            title: string(item, "title").unwrap_or_default(),
            library_type: string(item, "type").unwrap_or_default(),
            agent: string(item, "agent"),
            scanner: string(item, "scanner"),
            language: string(item, "language"),
            created_at: int(item, "createdAt"),
            updated_at: int(item, "updatedAt"),
            scanned_at: int(item, "scannedAt"),
            refreshing: flag(item, "refreshing"),
        })
        .collect()
}

pub fn normalize_playlists(raw: &Value) -> Vec<Playlist> {
    RawContainer::locate_flat(raw, "Metadata")
        .items()
        .into_iter()
        .map(|item| Playlist {
            rating_key: string(item, "ratingKey").unwrap_or_default(),
            key: string(item, "key").unwrap_or_default(),
            title: string(item, "title").unwrap_or_default(),
            kind: PLAYLIST_KIND.to_string(),
            playlist_type: item
                .get("playlistType")
                .and_then(Value::as_str)
                .and_then(PlaylistType::from_name),
            smart: flag(item, "smart").unwrap_or(false),
            duration: int(item, "duration"),
            leaf_count: count(item, "leafCount"),
            added_at: int(item, "addedAt"),
            updated_at: int(item, "updatedAt"),
        })
        .collect()
}

pub fn normalize_watch_history(raw: &Value) -> Vec<WatchHistoryEntry> {
    RawContainer::locate_flat(raw, "Metadata")
        .items()
        .into_iter()
        .map(history_entry)
        .collect()
}

pub fn normalize_on_deck(raw: &Value) -> Vec<OnDeckEntry> {
    RawContainer::locate_flat(raw, "Metadata")
        .items()
        .into_iter()
        .map(|item| OnDeckEntry {
            entry: history_entry(item),
            summary: string(item, "summary"),
            rating: float(item, "rating"),
            last_viewed_at: int(item, "lastViewedAt"),
        })
        .collect()
}

/// Watched status for a metadata lookup. Items without a `ratingKey` take
/// `fallback_key`, so every status refers back to the key that was requested.
pub fn normalize_watched_status(raw: &Value, fallback_key: &str) -> Vec<WatchedStatus> {
    RawContainer::locate_flat(raw, "Metadata")
        .items()
        .into_iter()
        .map(|item| {
            let view_count = count(item, "viewCount");
            let view_offset = int(item, "viewOffset").unwrap_or(0);
            WatchedStatus {
                rating_key: string(item, "ratingKey")
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| fallback_key.to_string()),
                title: string(item, "title").unwrap_or_default(),
                media_type: media_type(item),
                year: year(item),
                view_count,
                last_viewed_at: int(item, "lastViewedAt"),
                view_offset,
                duration: int(item, "duration"),
                watched: view_count > 0,
                partially_watched: view_count == 0 && view_offset > 0,
                hierarchy: hierarchy(item),
            }
        })
        .collect()
}

/// Lowercased words of `input`, split on anything that isn't alphanumeric and
/// joined by single spaces. "Drum & Bass!" becomes "drum bass".
pub fn normalize_for_matching(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
