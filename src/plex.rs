//! Plex HTTP access.
//!
//! `MediaServer` is the seam between the tool layer and the network: the real
//! implementation is `PlexClient`, tests plug in canned JSON. Everything above
//! it works on raw `serde_json::Value` containers and the normalizers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

use crate::cli::PlexConfig;
use crate::error::PlexError;
use crate::normalize::{self, RawContainer};
use crate::types::{MediaType, PlaylistType};

pub type Query = Vec<(&'static str, String)>;

const RETRY_DELAY: Duration = Duration::from_millis(750);
const CLIENT_IDENTIFIER: &str = "plexbox";

#[async_trait]
pub trait MediaServer: Send + Sync {
    /// GET `path` and return the decoded JSON body.
    async fn get(&self, path: &str, query: &Query) -> Result<Value, PlexError> {
        self.send(Method::GET, path, query).await
    }

    /// Issue `method` on `path`. Empty bodies decode to `Value::Null`.
    async fn send(&self, method: Method, path: &str, query: &Query) -> Result<Value, PlexError>;
}

pub struct PlexClient {
    http: Client,
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(config: &PlexConfig) -> Result<Self, PlexError> {
        let http = Client::builder()
            .user_agent(concat!("plexbox/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| PlexError::Config(format!("failed to build HTTP client: {e}")))?;
        if !config.verify_ssl {
            tracing::warn!("TLS certificate verification disabled");
        }
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    async fn send_inner(&self, method: Method, path: &str, query: &Query) -> Result<Value, PlexError> {
        let url = format!("{}{}", self.base_url, path);
        let mut is_retry = false;

        let resp = loop {
            tracing::debug!(%method, path, retry = is_retry, "plex request");
            let resp = self
                .http
                .request(method.clone(), &url)
                .query(query)
                .header("X-Plex-Token", &self.token)
                .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
                .header("X-Plex-Product", CLIENT_IDENTIFIER)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|source| PlexError::Http {
                    path: path.to_string(),
                    source,
                })?;

            let status = resp.status();
            let retryable =
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && !is_retry {
                tracing::warn!(path, status = status.as_u16(), "plex request failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                is_retry = true;
                continue;
            }
            break resp;
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(PlexError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = resp.text().await.map_err(|source| PlexError::Http {
            path: path.to_string(),
            source,
        })?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| PlexError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl MediaServer for PlexClient {
    async fn send(&self, method: Method, path: &str, query: &Query) -> Result<Value, PlexError> {
        self.send_inner(method, path, query).await
    }
}

/// Path segment for a caller-supplied id. Plex ids are numeric; anything else is
/// rejected before it reaches a URL.
pub fn id_segment(id: &str) -> Result<&str, PlexError> {
    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(PlexError::InvalidArgument(format!("invalid id '{id}'")));
    }
    Ok(id)
}

/// Concatenate the items of several containers into one `MediaContainer.Metadata`.
pub fn merge_containers(containers: &[Value]) -> Value {
    let items: Vec<Value> = containers
        .iter()
        .flat_map(|raw| RawContainer::locate(raw, "Metadata").items())
        .cloned()
        .collect();
    json!({ "MediaContainer": { "size": items.len(), "Metadata": items } })
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    /// Free text; empty means "list everything in the libraries".
    pub query: String,
    pub library_ids: Vec<String>,
    pub media_type: Option<MediaType>,
    pub limit: Option<u32>,
}

fn search_query(request: &SearchRequest) -> Query {
    let mut query: Query = Vec::new();
    if !request.query.trim().is_empty() {
        query.push(("query", request.query.trim().to_string()));
    }
    if let Some(code) = request.media_type.and_then(MediaType::code) {
        query.push(("type", code.to_string()));
    }
    if let Some(limit) = request.limit {
        query.push(("limit", limit.to_string()));
    }
    query
}

/// Section keys of every music library, used when a search names no libraries.
async fn music_library_ids(server: &(impl MediaServer + ?Sized)) -> Result<Vec<String>, PlexError> {
    let raw = server.get("/library/sections", &Vec::new()).await?;
    Ok(normalize::normalize_libraries(&raw)
        .into_iter()
        .filter(|l| l.library_type == "artist")
        .map(|l| l.key)
        .collect())
}

/// Run a search and return one raw container in the `MediaContainer.Metadata` shape.
///
/// Text queries go to `/search` (or each section's `/search` when libraries are
/// given). An empty query lists `/all` of each library, defaulting to every music
/// library for track searches.
pub async fn search(
    server: &(impl MediaServer + ?Sized),
    request: &SearchRequest,
) -> Result<Value, PlexError> {
    let query = search_query(request);
    let has_text = !request.query.trim().is_empty();

    if has_text && request.library_ids.is_empty() {
        return server.get("/search", &query).await;
    }

    let library_ids = if request.library_ids.is_empty() {
        if request.media_type != Some(MediaType::Track) {
            return Err(PlexError::InvalidArgument(
                "a search without text needs at least one library id".into(),
            ));
        }
        music_library_ids(server).await?
    } else {
        request.library_ids.clone()
    };

    let mut containers = Vec::with_capacity(library_ids.len());
    for id in &library_ids {
        let endpoint = if has_text { "search" } else { "all" };
        let path = format!("/library/sections/{}/{endpoint}", id_segment(id)?);
        containers.push(server.get(&path, &query).await?);
    }
    Ok(merge_containers(&containers))
}

// ---------------------------------------------------------------------------
// Playlists
// ---------------------------------------------------------------------------

pub async fn machine_identifier(server: &(impl MediaServer + ?Sized)) -> Result<String, PlexError> {
    let raw = server.get("/", &Vec::new()).await?;
    raw.get("MediaContainer")
        .and_then(|c| normalize::string(c, "machineIdentifier"))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PlexError::NotFound("server did not report a machineIdentifier".into()))
}

/// Library URI Plex expects when adding items to a playlist.
pub fn items_uri(machine_id: &str, rating_keys: &[String]) -> String {
    format!(
        "server://{machine_id}/com.plexapp.plugins.library/library/metadata/{}",
        rating_keys.join(",")
    )
}

fn validated_keys(rating_keys: &[String]) -> Result<Vec<String>, PlexError> {
    if rating_keys.is_empty() {
        return Err(PlexError::InvalidArgument(
            "at least one rating key is required".into(),
        ));
    }
    rating_keys
        .iter()
        .map(|k| id_segment(k).map(str::to_string))
        .collect()
}

pub async fn create_playlist(
    server: &(impl MediaServer + ?Sized),
    title: &str,
    playlist_type: PlaylistType,
    rating_keys: &[String],
) -> Result<Value, PlexError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PlexError::InvalidArgument("playlist title is required".into()));
    }
    let keys = validated_keys(rating_keys)?;
    let machine_id = machine_identifier(server).await?;
    let query: Query = vec![
        ("type", playlist_type.as_str().to_string()),
        ("title", title.to_string()),
        ("smart", "0".to_string()),
        ("uri", items_uri(&machine_id, &keys)),
    ];
    let raw = server.send(Method::POST, "/playlists", &query).await?;
    tracing::info!(title, items = keys.len(), "created playlist");
    Ok(raw)
}

/// Returns how many items Plex reports as added.
pub async fn add_to_playlist(
    server: &(impl MediaServer + ?Sized),
    playlist_id: &str,
    rating_keys: &[String],
) -> Result<u64, PlexError> {
    let keys = validated_keys(rating_keys)?;
    let machine_id = machine_identifier(server).await?;
    let path = format!("/playlists/{}/items", id_segment(playlist_id)?);
    let query: Query = vec![("uri", items_uri(&machine_id, &keys))];
    let raw = server.send(Method::PUT, &path, &query).await?;
    let added = raw
        .get("MediaContainer")
        .and_then(|c| normalize::int(c, "leafCountAdded"))
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(keys.len() as u64);
    Ok(added)
}

/// `playlistItemID` of the entry holding `rating_key`, if present.
pub fn find_playlist_item_id(raw: &Value, rating_key: &str) -> Option<String> {
    RawContainer::locate_flat(raw, "Metadata")
        .items()
        .into_iter()
        .find(|item| normalize::string(item, "ratingKey").as_deref() == Some(rating_key))
        .and_then(|item| normalize::string(item, "playlistItemID"))
}

/// Removes the first entry for `rating_key`. `Ok(false)` when it isn't in the playlist.
pub async fn remove_from_playlist(
    server: &(impl MediaServer + ?Sized),
    playlist_id: &str,
    rating_key: &str,
) -> Result<bool, PlexError> {
    let playlist_id = id_segment(playlist_id)?;
    let items_path = format!("/playlists/{playlist_id}/items");
    let raw = server.get(&items_path, &Vec::new()).await?;
    let Some(item_id) = find_playlist_item_id(&raw, rating_key.trim()) else {
        return Ok(false);
    };
    let path = format!("{items_path}/{}", id_segment(&item_id)?);
    server.send(Method::DELETE, &path, &Vec::new()).await?;
    Ok(true)
}

pub async fn delete_playlist(
    server: &(impl MediaServer + ?Sized),
    playlist_id: &str,
) -> Result<(), PlexError> {
    let path = format!("/playlists/{}", id_segment(playlist_id)?);
    server.send(Method::DELETE, &path, &Vec::new()).await?;
    Ok(())
}
