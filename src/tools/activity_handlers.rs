use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;

use super::*;
use crate::error::PlexError;
use crate::normalize;
use crate::plex::id_segment;
use crate::stats;

const HISTORY_PATH: &str = "/status/sessions/history/all";
const DEFAULT_HISTORY_SCAN: u32 = 1000;
const MAX_HISTORY_SCAN: u32 = 5000;

fn history_query(account_id: Option<i64>, library_id: Option<&str>, size: u32) -> Result<Query, PlexError> {
    let mut query: Query = vec![("sort", "viewedAt:desc".to_string())];
    if let Some(account_id) = account_id {
        query.push(("accountID", account_id.to_string()));
    }
    if let Some(library_id) = library_id {
        query.push(("librarySectionID", id_segment(library_id)?.to_string()));
    }
    container_window(&mut query, size);
    Ok(query)
}

pub(super) async fn handle_on_deck(
    server: &dyn MediaServer,
    params: OnDeckParams,
) -> Result<CallToolResult, McpError> {
    let limit = clamp_limit(params.limit);
    let mut query = Vec::new();
    container_window(&mut query, limit);
    let raw = server.get("/library/onDeck", &query).await?;
    let mut entries = normalize::normalize_on_deck(&raw);
    entries.truncate(limit as usize);
    json_result(&entries)
}

pub(super) async fn handle_watch_history(
    server: &dyn MediaServer,
    params: WatchHistoryParams,
) -> Result<CallToolResult, McpError> {
    let media_type = parse_media_type(params.media_type.as_deref())?;
    let limit = clamp_limit(params.limit);
    // Type filtering is local, so fetch a wider window when it applies.
    let window = if media_type.is_some() { MAX_LIMIT } else { limit };
    let query = history_query(params.account_id, params.library_id.as_deref(), window)?;
    let raw = server.get(HISTORY_PATH, &query).await?;

    let mut entries = normalize::normalize_watch_history(&raw);
    if let Some(media_type) = media_type {
        entries.retain(|e| e.media_type == media_type);
    }
    entries.truncate(limit as usize);
    json_result(&entries)
}

pub(super) async fn handle_watched_status(
    server: &dyn MediaServer,
    params: RatingKeyParams,
) -> Result<CallToolResult, McpError> {
    let rating_key = id_segment(&params.rating_key)?;
    let raw = server
        .get(&format!("/library/metadata/{rating_key}"), &Vec::new())
        .await?;
    let status = normalize::normalize_watched_status(&raw, rating_key)
        .into_iter()
        .next()
        .ok_or_else(|| PlexError::NotFound(format!("Item '{rating_key}' not found")))?;
    json_result(&status)
}

pub(super) async fn handle_listening_stats(
    server: &dyn MediaServer,
    params: ListeningStatsParams,
) -> Result<CallToolResult, McpError> {
    let scan = params
        .history_limit
        .unwrap_or(DEFAULT_HISTORY_SCAN)
        .clamp(1, MAX_HISTORY_SCAN);
    let query = history_query(params.account_id, None, scan)?;
    let raw = server.get(HISTORY_PATH, &query).await?;

    let mut entries = normalize::normalize_watch_history(&raw);
    if let Some(days) = params.days.filter(|d| *d > 0.0) {
        let cutoff = chrono::Utc::now().timestamp() - (days * 86_400.0) as i64;
        entries.retain(|e| e.viewed_at.is_some_and(|t| t >= cutoff));
    }
    let summary = stats::listening_stats(&entries, params.top_n.unwrap_or(stats::DEFAULT_TOP_N));
    json_result(&summary)
}
