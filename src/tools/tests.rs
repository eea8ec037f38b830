use super::*;

use std::sync::Arc;

use reqwest::Method;
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParams;
use serde_json::{Value, json};

use crate::plex::fixture::FixtureServer;

fn extract_json(result: &CallToolResult) -> Value {
    let text = result
        .content
        .first()
        .and_then(|content| content.as_text())
        .map(|text| text.text.as_str())
        .expect("tool result should include text content");

    serde_json::from_str(text).expect("tool text content should be valid JSON")
}

fn args(value: Value) -> Option<serde_json::Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

async fn call_tool_via_router(
    fixture: Arc<FixtureServer>,
    tool_name: &str,
    arguments: Option<serde_json::Map<String, Value>>,
) -> Result<CallToolResult, rmcp::ServiceError> {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_result, client_result) = tokio::join!(
        PlexboxServer::new(fixture).serve(server_io),
        ().serve(client_io)
    );
    let mut server = server_result.expect("server should start over in-memory transport");
    let mut client = client_result.expect("client should connect over in-memory transport");

    let result = client
        .call_tool(CallToolRequestParams {
            meta: None,
            name: tool_name.to_owned().into(),
            arguments,
            task: None,
        })
        .await;

    client
        .close()
        .await
        .expect("client should close cleanly after tool call");
    server
        .close()
        .await
        .expect("server should close cleanly after tool call");

    result
}

async fn call_ok(fixture: Arc<FixtureServer>, tool_name: &str, arguments: Value) -> Value {
    let result = call_tool_via_router(fixture, tool_name, args(arguments))
        .await
        .expect("tool call through router should succeed");
    extract_json(&result)
}

fn metadata(items: Value) -> Value {
    json!({ "MediaContainer": { "Metadata": items } })
}

fn music_tracks() -> Value {
    metadata(json!([
        {
            "ratingKey": "101",
            "title": "Flac Unplayed",
            "type": "track",
            "grandparentTitle": "Nick Drake",
            "Genre": [{"tag": "Folk"}],
            "Media": [{"bitrate": 1411, "audioCodec": "flac", "audioChannels": 2,
                       "Part": [{"audioCodec": "FLAC", "size": 52428800}]}]
        },
        {
            "ratingKey": "102",
            "title": "Mp3 Unplayed",
            "type": "track",
            "Genre": [{"tag": "Techno"}],
            "Media": [{"bitrate": 320, "audioCodec": "mp3",
                       "Part": [{"audioCodec": "mp3", "size": 10485760}]}]
        },
        {
            "ratingKey": "103",
            "title": "Flac Played",
            "type": "track",
            "viewCount": "4",
            "lastViewedAt": 1700000000,
            "Genre": [{"tag": "Jazz"}],
            "Media": [{"audioCodec": "alac", "Part": [{"audioCodec": "alac", "size": 1}]}]
        }
    ]))
}

#[tokio::test]
async fn router_lists_every_tool() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_result, client_result) = tokio::join!(
        PlexboxServer::new(Arc::new(FixtureServer::new())).serve(server_io),
        ().serve(client_io)
    );
    let mut server = server_result.expect("server should start");
    let mut client = client_result.expect("client should connect");

    let tools = client.list_all_tools().await.expect("tools should list");
    let mut names: Vec<String> = tools.iter().map(|t| t.name.to_string()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "add_to_playlist",
            "audio_analysis_search",
            "browse_library",
            "create_playlist",
            "delete_playlist",
            "get_item_details",
            "get_library_stats",
            "get_listening_stats",
            "get_on_deck",
            "get_playlist_items",
            "get_recently_added",
            "get_watch_history",
            "get_watched_status",
            "list_libraries",
            "list_playlists",
            "remove_from_playlist",
            "search_media",
        ]
    );

    client.close().await.expect("client should close");
    server.close().await.expect("server should close");
}

#[tokio::test]
async fn list_libraries_normalizes_directories() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/library/sections",
        json!({"MediaContainer": {"Directory": [
            {"key": "1", "title": "Movies", "type": "movie", "refreshing": false},
            {"key": "3", "title": "Music", "type": "artist"}
        ]}}),
    ));
    let payload = call_ok(fixture, "list_libraries", json!({})).await;
    let libraries = payload.as_array().expect("libraries array");
    assert_eq!(libraries.len(), 2);
    assert_eq!(libraries[1]["key"], "3");
    assert_eq!(libraries[1]["type"], "artist");
}

#[tokio::test]
async fn browse_library_applies_compound_filters_in_order() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/library/sections/3/all",
        music_tracks(),
    ));
    let payload = call_ok(
        fixture.clone(),
        "browse_library",
        json!({"library_id": "3", "media_type": "track", "audio_format": "lossless", "never_played": true}),
    )
    .await;
    let keys: Vec<&str> = payload
        .as_array()
        .expect("items array")
        .iter()
        .filter_map(|item| item["ratingKey"].as_str())
        .collect();
    assert_eq!(keys, vec!["101"]);

    let calls = fixture.calls();
    let (_, query) = &calls[0];
    assert!(query.contains(&("type", "10".to_string())));
    // Filtered browses fetch the whole section.
    assert!(!query.iter().any(|(k, _)| *k == "X-Plex-Container-Size"));
}

#[tokio::test]
async fn browse_library_file_size_bounds_exclude_items_without_parts() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/library/sections/3/all",
        music_tracks(),
    ));
    let payload = call_ok(
        fixture,
        "browse_library",
        json!({"library_id": "3", "file_size_min": 20.0}),
    )
    .await;
    let items = payload.as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["ratingKey"], "101");
}

#[tokio::test]
async fn browse_library_rejects_unknown_media_type() {
    let fixture = Arc::new(FixtureServer::new());
    let result = call_tool_via_router(
        fixture.clone(),
        "browse_library",
        args(json!({"library_id": "3", "media_type": "podcast"})),
    )
    .await;
    assert!(result.is_err());
    assert!(fixture.calls().is_empty());
}

#[tokio::test]
async fn search_media_forwards_text_and_limit() {
    let fixture = Arc::new(FixtureServer::new().route(Method::GET, "/search", music_tracks()));
    let payload = call_ok(
        fixture.clone(),
        "search_media",
        json!({"query": "flac", "media_type": "track", "limit": 2}),
    )
    .await;
    assert_eq!(payload.as_array().map(Vec::len), Some(2));

    let calls = fixture.calls();
    assert_eq!(calls[0].0, "GET /search");
    assert!(calls[0].1.contains(&("limit", "2".to_string())));
}

#[tokio::test]
async fn search_media_activity_filters_use_view_counts() {
    let fixture = Arc::new(FixtureServer::new().route(Method::GET, "/search", music_tracks()));
    let payload = call_ok(
        fixture,
        "search_media",
        json!({"query": "flac", "play_count_min": 1, "last_played_after": "2023-11-01"}),
    )
    .await;
    let items = payload.as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["ratingKey"], "103");
}

#[tokio::test]
async fn get_item_details_includes_quality_and_estimates() {
    let track = music_tracks()["MediaContainer"]["Metadata"][0].clone();
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/library/metadata/101",
        metadata(Value::Array(vec![track])),
    ));
    let payload = call_ok(fixture, "get_item_details", json!({"rating_key": "101"})).await;
    assert_eq!(payload["item"]["title"], "Flac Unplayed");
    assert_eq!(payload["audio_quality"]["score"], 65);
    assert_eq!(payload["audio_quality"]["rating"], "Good");
    assert_eq!(payload["estimates"]["tempo"], 80);
    assert_eq!(payload["estimates"]["mood"], "calm");
}

#[tokio::test]
async fn get_watched_status_reports_partial_progress() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/library/metadata/55",
        metadata(json!([{
            "title": "Pilot",
            "type": "episode",
            "viewOffset": 120000,
            "duration": 2400000,
            "grandparentTitle": "The Show"
        }])),
    ));
    let payload = call_ok(fixture, "get_watched_status", json!({"rating_key": "55"})).await;
    assert_eq!(payload["ratingKey"], "55");
    assert_eq!(payload["watched"], false);
    assert_eq!(payload["partiallyWatched"], true);
    assert_eq!(payload["grandparentTitle"], "The Show");
}

#[tokio::test]
async fn get_watched_status_missing_item_is_an_error() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/library/metadata/55",
        json!({"MediaContainer": {"size": 0}}),
    ));
    let result = call_tool_via_router(
        fixture,
        "get_watched_status",
        args(json!({"rating_key": "55"})),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn watch_history_filters_by_type_after_fetch() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/status/sessions/history/all",
        metadata(json!([
            {"title": "Song", "type": "track", "viewedAt": 10},
            {"title": "Episode", "type": "episode", "viewedAt": 9},
            {"title": "Other Song", "type": "track", "viewedAt": 8}
        ])),
    ));
    let payload = call_ok(
        fixture.clone(),
        "get_watch_history",
        json!({"media_type": "track", "limit": 1, "account_id": 1}),
    )
    .await;
    let entries = payload.as_array().expect("entries array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["title"], "Song");

    let (_, query) = &fixture.calls()[0];
    assert!(query.contains(&("accountID", "1".to_string())));
    assert!(query.contains(&("sort", "viewedAt:desc".to_string())));
}

#[tokio::test]
async fn create_playlist_returns_created_summary() {
    let fixture = Arc::new(
        FixtureServer::new()
            .route(
                Method::GET,
                "/",
                json!({"MediaContainer": {"machineIdentifier": "m1"}}),
            )
            .route(
                Method::POST,
                "/playlists",
                metadata(json!([{"ratingKey": "900", "title": "Road Trip",
                                 "playlistType": "audio", "leafCount": 2}])),
            ),
    );
    let payload = call_ok(
        fixture,
        "create_playlist",
        json!({"title": "Road Trip", "rating_keys": ["101", "102"]}),
    )
    .await;
    assert_eq!(payload["created"]["ratingKey"], "900");
    assert_eq!(payload["created"]["leafCount"], 2);
    assert_eq!(payload["requested_items"], 2);
}

#[tokio::test]
async fn create_playlist_rejects_unknown_type() {
    let fixture = Arc::new(FixtureServer::new());
    let result = call_tool_via_router(
        fixture,
        "create_playlist",
        args(json!({"title": "x", "playlist_type": "podcast", "rating_keys": ["1"]})),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn remove_from_playlist_reports_absent_item() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/playlists/7/items",
        metadata(json!([{"ratingKey": "1", "playlistItemID": 11}])),
    ));
    let payload = call_ok(
        fixture,
        "remove_from_playlist",
        json!({"playlist_id": "7", "rating_key": "2"}),
    )
    .await;
    assert_eq!(payload["removed"], false);
}

#[tokio::test]
async fn delete_playlist_surfaces_upstream_errors() {
    let fixture = Arc::new(FixtureServer::new());
    let result = call_tool_via_router(
        fixture,
        "delete_playlist",
        args(json!({"playlist_id": "7"})),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn library_stats_summarize_section() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/library/sections/3/all",
        music_tracks(),
    ));
    let payload = call_ok(
        fixture,
        "get_library_stats",
        json!({"library_id": "3", "media_type": "track"}),
    )
    .await;
    assert_eq!(payload["total_items"], 3);
    assert_eq!(payload["unplayed_count"], 2);
    assert_eq!(payload["total_size_bytes"], 52428800 + 10485760 + 1);
}

#[tokio::test]
async fn listening_stats_count_track_plays() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/status/sessions/history/all",
        metadata(json!([
            {"title": "A", "type": "track", "grandparentTitle": "X", "parentTitle": "LP"},
            {"title": "B", "type": "track", "grandparentTitle": "X", "parentTitle": "LP"},
            {"title": "Film", "type": "movie"}
        ])),
    ));
    let payload = call_ok(fixture, "get_listening_stats", json!({})).await;
    assert_eq!(payload["total_plays"], 2);
    assert_eq!(payload["top_artists"][0]["name"], "X");
    assert_eq!(payload["top_artists"][0]["count"], 2);
}

#[tokio::test]
async fn audio_analysis_search_ranks_tracks() {
    let fixture = Arc::new(FixtureServer::new().route(
        Method::GET,
        "/library/sections/3/all",
        music_tracks(),
    ));
    let payload = call_ok(
        fixture,
        "audio_analysis_search",
        json!({"query": "calm acoustic", "library_ids": ["3"], "limit": 2}),
    )
    .await;
    let results = payload.as_array().expect("results array");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["rating_key"], "101");
    assert_eq!(results[0]["score"], 2);
    assert_eq!(
        results[0]["reasons"],
        json!(["Calm track", "Acoustic track"])
    );
}

#[tokio::test]
async fn audio_analysis_search_upstream_failure_is_empty_result() {
    let fixture = Arc::new(FixtureServer::new());
    let payload = call_ok(
        fixture,
        "audio_analysis_search",
        json!({"query": "energetic", "library_ids": ["3"]}),
    )
    .await;
    assert_eq!(payload, json!([]));
}
