use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;

mod activity_handlers;
mod library_handlers;
mod params;
mod playlist_handlers;

use params::*;

use crate::filters::{self, ActivityFilters, AdvancedFilters};
use crate::plex::{MediaServer, Query};
use crate::types::{LibraryItem, MediaType};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

fn internal(msg: String) -> McpError {
    McpError::internal_error(msg, None)
}

fn json_result<T: Serialize + ?Sized>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| internal(format!("{e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Parse an optional media type name. Unknown names are rejected, not ignored.
fn parse_media_type(name: Option<&str>) -> Result<Option<MediaType>, McpError> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    match MediaType::from_name(name) {
        MediaType::Unknown => Err(McpError::invalid_params(
            format!(
                "unknown media type '{name}' (expected one of: {})",
                MediaType::all_names_csv()
            ),
            None,
        )),
        known => Ok(Some(known)),
    }
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Plex paging parameters for the first `size` entries of a container.
fn container_window(query: &mut Query, size: u32) {
    query.push(("X-Plex-Container-Start", "0".to_string()));
    query.push(("X-Plex-Container-Size", size.to_string()));
}

fn filter_items(
    items: Vec<LibraryItem>,
    advanced: &AdvancedFilters,
    activity: &ActivityFilters,
    limit: u32,
) -> Vec<LibraryItem> {
    let mut items = filters::apply_advanced_filters(items, advanced);
    items = filters::apply_activity_filters(items, activity);
    items.truncate(limit as usize);
    items
}

/// Inner shared state (not Clone).
struct ServerState {
    plex: Arc<dyn MediaServer>,
}

#[derive(Clone)]
pub struct PlexboxServer {
    state: Arc<ServerState>,
    tool_router: ToolRouter<Self>,
}

impl PlexboxServer {
    fn plex(&self) -> &dyn MediaServer {
        self.state.plex.as_ref()
    }
}

#[tool_router]
impl PlexboxServer {
    pub fn new(plex: Arc<dyn MediaServer>) -> Self {
        Self {
            state: Arc::new(ServerState { plex }),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Search the Plex server by text, optionally narrowed to libraries and a media type, then apply technical, analysis and activity filters"
    )]
    async fn search_media(
        &self,
        params: Parameters<SearchMediaParams>,
    ) -> Result<CallToolResult, McpError> {
        library_handlers::handle_search_media(self.plex(), params.0).await
    }

    #[tool(description = "List the library sections on the Plex server")]
    async fn list_libraries(&self) -> Result<CallToolResult, McpError> {
        library_handlers::handle_list_libraries(self.plex()).await
    }

    #[tool(
        description = "List the contents of one library, with optional type, sort, and compound filters (resolution, audio format, file size, BPM, key, mood, play counts, last played dates)"
    )]
    async fn browse_library(
        &self,
        params: Parameters<BrowseLibraryParams>,
    ) -> Result<CallToolResult, McpError> {
        library_handlers::handle_browse_library(self.plex(), params.0).await
    }

    #[tool(description = "Recently added items, for one library or the whole server")]
    async fn get_recently_added(
        &self,
        params: Parameters<RecentlyAddedParams>,
    ) -> Result<CallToolResult, McpError> {
        library_handlers::handle_recently_added(self.plex(), params.0).await
    }

    #[tool(description = "Items in progress or next up (On Deck)")]
    async fn get_on_deck(
        &self,
        params: Parameters<OnDeckParams>,
    ) -> Result<CallToolResult, McpError> {
        activity_handlers::handle_on_deck(self.plex(), params.0).await
    }

    #[tool(description = "Playback history, newest first")]
    async fn get_watch_history(
        &self,
        params: Parameters<WatchHistoryParams>,
    ) -> Result<CallToolResult, McpError> {
        activity_handlers::handle_watch_history(self.plex(), params.0).await
    }

    #[tool(description = "Watched / partially watched state of one item")]
    async fn get_watched_status(
        &self,
        params: Parameters<RatingKeyParams>,
    ) -> Result<CallToolResult, McpError> {
        activity_handlers::handle_watched_status(self.plex(), params.0).await
    }

    #[tool(description = "List playlists with item counts")]
    async fn list_playlists(
        &self,
        params: Parameters<ListPlaylistsParams>,
    ) -> Result<CallToolResult, McpError> {
        playlist_handlers::handle_list_playlists(self.plex(), params.0).await
    }

    #[tool(description = "List the items of a playlist")]
    async fn get_playlist_items(
        &self,
        params: Parameters<PlaylistItemsParams>,
    ) -> Result<CallToolResult, McpError> {
        playlist_handlers::handle_playlist_items(self.plex(), params.0).await
    }

    #[tool(description = "Create a regular (non-smart) playlist from item rating keys")]
    async fn create_playlist(
        &self,
        params: Parameters<CreatePlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        playlist_handlers::handle_create_playlist(self.plex(), params.0).await
    }

    #[tool(description = "Append items to an existing playlist")]
    async fn add_to_playlist(
        &self,
        params: Parameters<AddToPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        playlist_handlers::handle_add_to_playlist(self.plex(), params.0).await
    }

    #[tool(description = "Remove one item from a playlist by its rating key")]
    async fn remove_from_playlist(
        &self,
        params: Parameters<RemoveFromPlaylistParams>,
    ) -> Result<CallToolResult, McpError> {
        playlist_handlers::handle_remove_from_playlist(self.plex(), params.0).await
    }

    #[tool(description = "Delete a playlist. The library items themselves are not touched.")]
    async fn delete_playlist(
        &self,
        params: Parameters<PlaylistIdParams>,
    ) -> Result<CallToolResult, McpError> {
        playlist_handlers::handle_delete_playlist(self.plex(), params.0).await
    }

    #[tool(
        description = "Full metadata for one item, plus an audio quality rating and genre-based tempo/mood/acoustic estimates"
    )]
    async fn get_item_details(
        &self,
        params: Parameters<RatingKeyParams>,
    ) -> Result<CallToolResult, McpError> {
        library_handlers::handle_item_details(self.plex(), params.0).await
    }

    #[tool(
        description = "Library summary: item count per type, top genres, unplayed count, total duration and size"
    )]
    async fn get_library_stats(
        &self,
        params: Parameters<LibraryStatsParams>,
    ) -> Result<CallToolResult, McpError> {
        library_handlers::handle_library_stats(self.plex(), params.0).await
    }

    #[tool(description = "Listening summary from track history: top artists, albums and tracks")]
    async fn get_listening_stats(
        &self,
        params: Parameters<ListeningStatsParams>,
    ) -> Result<CallToolResult, McpError> {
        activity_handlers::handle_listening_stats(self.plex(), params.0).await
    }

    #[tool(
        description = "Find tracks by character ('energetic electronic', 'calm acoustic', 'fast', 'melancholic'). Results are ranked by how many requested traits the genre-based estimates match, each with its reasons."
    )]
    async fn audio_analysis_search(
        &self,
        params: Parameters<AudioAnalysisSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        library_handlers::handle_audio_analysis_search(self.plex(), params.0).await
    }
}

#[tool_handler]
impl ServerHandler for PlexboxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Plex Media Server library access. Search and browse libraries with compound \
                 filters, inspect watch activity, manage playlists, and find music by mood, \
                 tempo and acoustic character."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests;
