use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use serde_json::json;

use super::*;
use crate::analysis;
use crate::audio::{self, AudioTechnical};
use crate::error::PlexError;
use crate::genre;
use crate::normalize;
use crate::plex::{self, SearchRequest, id_segment};
use crate::stats;
use crate::types::type_code;

pub(super) async fn handle_search_media(
    server: &dyn MediaServer,
    params: SearchMediaParams,
) -> Result<CallToolResult, McpError> {
    let media_type = parse_media_type(params.media_type.as_deref())?;
    let limit = clamp_limit(params.limit);
    let filtered = !params.filters.is_empty() || !params.activity.is_empty();
    let request = SearchRequest {
        query: params.query,
        library_ids: params.library_ids.unwrap_or_default(),
        media_type,
        // Filters run locally, so the upstream page must not cut candidates short.
        limit: (!filtered).then_some(limit),
    };
    let raw = plex::search(server, &request).await?;
    let mut items = normalize::normalize_search_results(&raw);
    if let Some(media_type) = media_type {
        items.retain(|item| item.media_type == media_type);
    }
    let items = filter_items(items, &params.filters, &params.activity, limit);
    tracing::debug!(results = items.len(), "search_media");
    json_result(&items)
}

pub(super) async fn handle_list_libraries(
    server: &dyn MediaServer,
) -> Result<CallToolResult, McpError> {
    let raw = server.get("/library/sections", &Vec::new()).await?;
    json_result(&normalize::normalize_libraries(&raw))
}

pub(super) async fn handle_browse_library(
    server: &dyn MediaServer,
    params: BrowseLibraryParams,
) -> Result<CallToolResult, McpError> {
    parse_media_type(params.media_type.as_deref())?;
    let limit = clamp_limit(params.limit);
    let path = format!("/library/sections/{}/all", id_segment(&params.library_id)?);

    let mut query: Query = Vec::new();
    if let Some(code) = type_code(params.media_type.as_deref()) {
        query.push(("type", code.to_string()));
    }
    if let Some(sort) = params.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.push(("sort", sort.to_string()));
    }
    if params.filters.is_empty() && params.activity.is_empty() {
        container_window(&mut query, limit);
    }

    let raw = server.get(&path, &query).await?;
    let items = normalize::normalize_library_content(&raw);
    let total = items.len();
    let items = filter_items(items, &params.filters, &params.activity, limit);
    tracing::debug!(library = %params.library_id, total, kept = items.len(), "browse_library");
    json_result(&items)
}

pub(super) async fn handle_recently_added(
    server: &dyn MediaServer,
    params: RecentlyAddedParams,
) -> Result<CallToolResult, McpError> {
    let path = match params.library_id.as_deref() {
        Some(id) => format!("/library/sections/{}/recentlyAdded", id_segment(id)?),
        None => "/library/recentlyAdded".to_string(),
    };
    let limit = clamp_limit(params.limit);
    let mut query = Vec::new();
    container_window(&mut query, limit);
    let raw = server.get(&path, &query).await?;
    let mut items = normalize::normalize_library_content(&raw);
    items.truncate(limit as usize);
    json_result(&items)
}

async fn fetch_item(server: &dyn MediaServer, rating_key: &str) -> Result<LibraryItem, PlexError> {
    let path = format!("/library/metadata/{}", id_segment(rating_key)?);
    let raw = server.get(&path, &Vec::new()).await?;
    normalize::normalize_library_content(&raw)
        .into_iter()
        .next()
        .ok_or_else(|| PlexError::NotFound(format!("Item '{}' not found", rating_key.trim())))
}

pub(super) async fn handle_item_details(
    server: &dyn MediaServer,
    params: RatingKeyParams,
) -> Result<CallToolResult, McpError> {
    let item = fetch_item(server, &params.rating_key).await?;
    let quality = audio::audio_quality(AudioTechnical::from_item(&item).as_ref());
    let genre_name = item.primary_genre();
    let tempo = genre::estimate_tempo(genre_name);
    let mood = genre::estimate_mood(genre_name);
    let acoustic_ratio = genre::estimate_acoustic_ratio(genre_name);
    let result = json!({
        "item": item,
        "audio_quality": quality,
        "estimates": {
            "tempo": tempo,
            "mood": mood,
            "acoustic_ratio": acoustic_ratio,
        },
    });
    json_result(&result)
}

pub(super) async fn handle_library_stats(
    server: &dyn MediaServer,
    params: LibraryStatsParams,
) -> Result<CallToolResult, McpError> {
    parse_media_type(params.media_type.as_deref())?;
    let path = format!("/library/sections/{}/all", id_segment(&params.library_id)?);
    let mut query: Query = Vec::new();
    if let Some(code) = type_code(params.media_type.as_deref()) {
        query.push(("type", code.to_string()));
    }
    let raw = server.get(&path, &query).await?;
    let items = normalize::normalize_library_content(&raw);
    let summary = stats::library_stats(&items, params.top_genres.unwrap_or(stats::DEFAULT_TOP_N));
    json_result(&summary)
}

pub(super) async fn handle_audio_analysis_search(
    server: &dyn MediaServer,
    params: AudioAnalysisSearchParams,
) -> Result<CallToolResult, McpError> {
    let library_ids = params.library_ids.unwrap_or_default();
    let results =
        analysis::audio_analysis_search(server, &params.query, &library_ids, params.limit).await;
    json_result(&results)
}
