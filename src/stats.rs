use std::collections::HashMap;

use crate::types::{
    LibraryItem, LibraryStats, ListeningStats, MediaType, NameCount, WatchHistoryEntry,
};

pub const DEFAULT_TOP_N: usize = 10;

const NO_GENRE: &str = "(none)";

/// Sort by count descending, then name ascending, and keep the first `top_n`.
fn ranked(counts: HashMap<String, u64>, top_n: usize) -> Vec<NameCount> {
    let mut ranked: Vec<NameCount> = counts
        .into_iter()
        .map(|(name, count)| NameCount { name, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(top_n);
    ranked
}

pub fn library_stats(items: &[LibraryItem], top_genres: usize) -> LibraryStats {
    let mut by_type: HashMap<String, u64> = HashMap::new();
    let mut genres: HashMap<String, u64> = HashMap::new();
    let mut unplayed_count = 0;
    let mut total_duration_ms: i64 = 0;
    let mut total_size_bytes: u64 = 0;

    for item in items {
        *by_type.entry(item.media_type.to_string()).or_insert(0) += 1;
        let genre = item.primary_genre().unwrap_or(NO_GENRE);
        *genres.entry(genre.to_string()).or_insert(0) += 1;
        if item.view_count == 0 {
            unplayed_count += 1;
        }
        total_duration_ms = total_duration_ms.saturating_add(item.duration.unwrap_or(0).max(0));
        total_size_bytes = item
            .parts()
            .filter_map(|p| p.size)
            .fold(total_size_bytes, u64::saturating_add);
    }

    LibraryStats {
        total_items: items.len() as u64,
        by_type: ranked(by_type, usize::MAX),
        genres: ranked(genres, top_genres),
        unplayed_count,
        total_duration_ms,
        total_size_bytes,
    }
}

/// Aggregates track plays. Non-track history entries are ignored.
pub fn listening_stats(history: &[WatchHistoryEntry], top_n: usize) -> ListeningStats {
    let mut artists: HashMap<String, u64> = HashMap::new();
    let mut albums: HashMap<String, u64> = HashMap::new();
    let mut tracks: HashMap<String, u64> = HashMap::new();
    let mut total_plays = 0;
    let mut listening_time_ms: i64 = 0;

    for entry in history.iter().filter(|e| e.media_type == MediaType::Track) {
        total_plays += 1;
        listening_time_ms = listening_time_ms.saturating_add(entry.duration.unwrap_or(0).max(0));
        if let Some(artist) = entry.hierarchy.grandparent_title.as_deref()
            && !artist.is_empty()
        {
            *artists.entry(artist.to_string()).or_insert(0) += 1;
        }
        if let Some(album) = entry.hierarchy.parent_title.as_deref()
            && !album.is_empty()
        {
            *albums.entry(album.to_string()).or_insert(0) += 1;
        }
        if !entry.title.is_empty() {
            let name = match entry.hierarchy.grandparent_title.as_deref() {
                Some(artist) if !artist.is_empty() => format!("{artist} - {}", entry.title),
                _ => entry.title.clone(),
            };
            *tracks.entry(name).or_insert(0) += 1;
        }
    }

    ListeningStats {
        total_plays,
        top_artists: ranked(artists, top_n),
        top_albums: ranked(albums, top_n),
        top_tracks: ranked(tracks, top_n),
        listening_time_ms,
    }
}
