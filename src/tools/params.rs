use schemars::JsonSchema;
use serde::Deserialize;

use crate::filters::{ActivityFilters, AdvancedFilters};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SearchMediaParams {
    #[schemars(description = "Search text (title, artist, album...)")]
    pub query: String,
    #[schemars(description = "Restrict to these library section ids")]
    pub library_ids: Option<Vec<String>>,
    #[schemars(description = "Media type: movie, show, episode, artist, album, track")]
    pub media_type: Option<String>,
    #[schemars(description = "Max results (default 50, max 500)")]
    pub limit: Option<u32>,
    #[serde(flatten)]
    pub filters: AdvancedFilters,
    #[serde(flatten)]
    pub activity: ActivityFilters,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct BrowseLibraryParams {
    #[schemars(description = "Library section id (see list_libraries)")]
    pub library_id: String,
    #[schemars(description = "Media type to list, e.g. 'track' in a music library")]
    pub media_type: Option<String>,
    #[schemars(description = "Plex sort expression, e.g. 'addedAt:desc' or 'titleSort'")]
    pub sort: Option<String>,
    #[schemars(description = "Max results after filtering (default 50, max 500)")]
    pub limit: Option<u32>,
    #[serde(flatten)]
    pub filters: AdvancedFilters,
    #[serde(flatten)]
    pub activity: ActivityFilters,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RecentlyAddedParams {
    #[schemars(description = "Library section id; omit for all libraries")]
    pub library_id: Option<String>,
    #[schemars(description = "Max results (default 50, max 500)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct OnDeckParams {
    #[schemars(description = "Max results (default 50, max 500)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WatchHistoryParams {
    #[schemars(description = "Only plays by this Plex account id")]
    pub account_id: Option<i64>,
    #[schemars(description = "Only plays from this library section id")]
    pub library_id: Option<String>,
    #[schemars(description = "Only entries of this media type, e.g. 'episode' or 'track'")]
    pub media_type: Option<String>,
    #[schemars(description = "Max entries, newest first (default 50, max 500)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RatingKeyParams {
    #[schemars(description = "Plex rating key of the item")]
    pub rating_key: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListPlaylistsParams {
    #[schemars(description = "Only playlists of this type: audio, video, photo")]
    pub playlist_type: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlaylistItemsParams {
    #[schemars(description = "Playlist rating key")]
    pub playlist_id: String,
    #[schemars(description = "Max items (default 50, max 500)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreatePlaylistParams {
    #[schemars(description = "Playlist title")]
    pub title: String,
    #[schemars(description = "audio (default), video or photo")]
    pub playlist_type: Option<String>,
    #[schemars(description = "Rating keys of the initial items (at least one)")]
    pub rating_keys: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddToPlaylistParams {
    #[schemars(description = "Playlist rating key")]
    pub playlist_id: String,
    #[schemars(description = "Rating keys of the items to append")]
    pub rating_keys: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveFromPlaylistParams {
    #[schemars(description = "Playlist rating key")]
    pub playlist_id: String,
    #[schemars(description = "Rating key of the item to remove")]
    pub rating_key: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlaylistIdParams {
    #[schemars(description = "Playlist rating key")]
    pub playlist_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LibraryStatsParams {
    #[schemars(description = "Library section id")]
    pub library_id: String,
    #[schemars(description = "Media type to count, e.g. 'track' (default: the library's top level)")]
    pub media_type: Option<String>,
    #[schemars(description = "How many genres to report (default 10)")]
    pub top_genres: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListeningStatsParams {
    #[schemars(description = "Only plays by this Plex account id")]
    pub account_id: Option<i64>,
    #[schemars(description = "Only plays within this many days (fractions allowed)")]
    pub days: Option<f64>,
    #[schemars(description = "Entries per ranking (default 10)")]
    pub top_n: Option<usize>,
    #[schemars(description = "History entries to scan (default 1000, max 5000)")]
    pub history_limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AudioAnalysisSearchParams {
    #[schemars(
        description = "Free-text request such as 'energetic electronic' or 'calm acoustic folk'"
    )]
    pub query: String,
    #[schemars(description = "Music library section ids; omit to use every music library")]
    pub library_ids: Option<Vec<String>>,
    #[schemars(description = "Max results (default 20)")]
    pub limit: Option<usize>,
}
