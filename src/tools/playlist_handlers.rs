use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use serde_json::json;

use super::*;
use crate::normalize;
use crate::plex::{self, id_segment};
use crate::types::PlaylistType;

fn parse_playlist_type(name: Option<&str>) -> Result<Option<PlaylistType>, McpError> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        None => Ok(None),
        Some(name) => PlaylistType::from_name(name).map(Some).ok_or_else(|| {
            McpError::invalid_params(
                format!("unknown playlist type '{name}' (expected audio, video or photo)"),
                None,
            )
        }),
    }
}

pub(super) async fn handle_list_playlists(
    server: &dyn MediaServer,
    params: ListPlaylistsParams,
) -> Result<CallToolResult, McpError> {
    let mut query: Query = Vec::new();
    if let Some(kind) = parse_playlist_type(params.playlist_type.as_deref())? {
        query.push(("playlistType", kind.as_str().to_string()));
    }
    let raw = server.get("/playlists", &query).await?;
    json_result(&normalize::normalize_playlists(&raw))
}

pub(super) async fn handle_playlist_items(
    server: &dyn MediaServer,
    params: PlaylistItemsParams,
) -> Result<CallToolResult, McpError> {
    let limit = clamp_limit(params.limit);
    let path = format!("/playlists/{}/items", id_segment(&params.playlist_id)?);
    let mut query = Vec::new();
    container_window(&mut query, limit);
    let raw = server.get(&path, &query).await?;
    let mut items = normalize::normalize_library_content(&raw);
    items.truncate(limit as usize);
    json_result(&items)
}

pub(super) async fn handle_create_playlist(
    server: &dyn MediaServer,
    params: CreatePlaylistParams,
) -> Result<CallToolResult, McpError> {
    let kind = parse_playlist_type(params.playlist_type.as_deref())?.unwrap_or(PlaylistType::Audio);
    let raw = plex::create_playlist(server, &params.title, kind, &params.rating_keys).await?;
    let created = normalize::normalize_playlists(&raw).into_iter().next();
    json_result(&json!({
        "created": created,
        "requested_items": params.rating_keys.len(),
    }))
}

pub(super) async fn handle_add_to_playlist(
    server: &dyn MediaServer,
    params: AddToPlaylistParams,
) -> Result<CallToolResult, McpError> {
    let added = plex::add_to_playlist(server, &params.playlist_id, &params.rating_keys).await?;
    json_result(&json!({
        "playlist_id": params.playlist_id,
        "added": added,
    }))
}

pub(super) async fn handle_remove_from_playlist(
    server: &dyn MediaServer,
    params: RemoveFromPlaylistParams,
) -> Result<CallToolResult, McpError> {
    let removed =
        plex::remove_from_playlist(server, &params.playlist_id, &params.rating_key).await?;
    if !removed {
        tracing::info!(
            playlist = %params.playlist_id,
            rating_key = %params.rating_key,
            "item not in playlist, nothing removed"
        );
    }
    json_result(&json!({
        "playlist_id": params.playlist_id,
        "rating_key": params.rating_key,
        "removed": removed,
    }))
}

pub(super) async fn handle_delete_playlist(
    server: &dyn MediaServer,
    params: PlaylistIdParams,
) -> Result<CallToolResult, McpError> {
    plex::delete_playlist(server, &params.playlist_id).await?;
    tracing::info!(playlist = %params.playlist_id, "deleted playlist");
    json_result(&json!({
        "playlist_id": params.playlist_id,
        "deleted": true,
    }))
}
