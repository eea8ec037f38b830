//! Audio-analysis search: free-text mood/character queries ("energetic acoustic
//! folk") answered by searching the library, tagging each track with the genre
//! heuristics and ranking by how many requested characteristics it shows.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;

use crate::error::PlexError;
use crate::genre::{self, Mood};
use crate::normalize::{self, normalize_for_matching};
use crate::plex::{self, MediaServer, SearchRequest};
use crate::types::{LibraryItem, MediaType};

pub const DEFAULT_LIMIT: usize = 20;

const ACOUSTIC_THRESHOLD: f64 = 0.7;
const ELECTRONIC_THRESHOLD: f64 = 0.3;
const FAST_BPM: u32 = 120;
const SLOW_BPM: u32 = 90;

/// Source of raw search containers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Value, PlexError>;
}

#[async_trait]
impl<S: MediaServer + ?Sized> SearchProvider for S {
    async fn search(&self, request: &SearchRequest) -> Result<Value, PlexError> {
        plex::search(self, request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Energetic,
    Calm,
    Aggressive,
    Melancholic,
    Acoustic,
    Electronic,
    Fast,
    Slow,
}

/// Query words that request each category. Keys must be lowercase.
pub const QUERY_CATEGORIES: &[(Category, &[&str])] = &[
    (
        Category::Energetic,
        &["energetic", "energy", "upbeat", "party", "workout", "dance", "danceable"],
    ),
    (
        Category::Calm,
        &["calm", "chill", "relax", "relaxing", "mellow", "peaceful", "sleep"],
    ),
    (
        Category::Aggressive,
        &["aggressive", "heavy", "angry", "intense", "hard"],
    ),
    (
        Category::Melancholic,
        &["melancholic", "melancholy", "sad", "moody", "somber"],
    ),
    (Category::Acoustic, &["acoustic", "unplugged", "organic"]),
    (Category::Electronic, &["electronic", "synth", "edm", "electro"]),
    (Category::Fast, &["fast", "uptempo", "quick"]),
    (Category::Slow, &["slow", "downtempo"]),
];

/// Words that carry no search meaning once categories are removed.
const FILLER_WORDS: &[&str] = &["music", "songs", "song", "tracks", "track", "with", "some"];

/// Joins two category words ("calm and acoustic"). Elsewhere it belongs to the
/// text ("drum and bass").
const CONJUNCTION: &str = "and";

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub categories: Vec<Category>,
    /// Remaining words, sent to the search provider.
    pub text: String,
}

fn category_of(word: &str) -> Option<Category> {
    QUERY_CATEGORIES
        .iter()
        .find(|(_, words)| words.contains(&word))
        .map(|(category, _)| *category)
}

pub fn parse_query(query: &str) -> ParsedQuery {
    let normalized = normalize_for_matching(query);
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let mut categories = Vec::new();
    let mut remaining = Vec::new();
    for (i, &word) in words.iter().enumerate() {
        match category_of(word) {
            Some(category) => {
                if !categories.contains(&category) {
                    categories.push(category);
                }
            }
            None if FILLER_WORDS.contains(&word) => {}
            None if word == CONJUNCTION
                && i > 0
                && category_of(words[i - 1]).is_some()
                && words.get(i + 1).is_some_and(|next| category_of(next).is_some()) => {}
            None => remaining.push(word),
        }
    }
    ParsedQuery {
        categories,
        text: remaining.join(" "),
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AnalyzedTrack {
    pub rating_key: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_tempo: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_mood: Option<Mood>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_acoustic_ratio: Option<f64>,
    pub score: u32,
    pub reasons: Vec<String>,
}

fn mood_of(item: &LibraryItem) -> Option<Mood> {
    item.mood
        .as_deref()
        .and_then(Mood::from_name)
        .or_else(|| genre::estimate_mood(item.primary_genre()))
}

pub fn analyze_item(item: &LibraryItem, categories: &[Category]) -> AnalyzedTrack {
    let tempo = item
        .bpm
        .filter(|b| *b > 0.0)
        .map(|b| b.round() as u32)
        .or_else(|| genre::estimate_tempo(item.primary_genre()));
    let mood = mood_of(item);
    let acoustic = item
        .acoustic_ratio
        .or_else(|| genre::estimate_acoustic_ratio(item.primary_genre()));

    let mut reasons = Vec::new();
    for category in categories {
        let reason = match category {
            Category::Energetic if mood == Some(Mood::Energetic) => Some("Energetic track".into()),
            Category::Calm if mood == Some(Mood::Calm) => Some("Calm track".into()),
            Category::Aggressive if mood == Some(Mood::Aggressive) => {
                Some("Aggressive track".into())
            }
            Category::Melancholic if mood == Some(Mood::Melancholic) => {
                Some("Melancholic track".into())
            }
            Category::Acoustic if acoustic.is_some_and(|r| r >= ACOUSTIC_THRESHOLD) => {
                Some("Acoustic track".into())
            }
            Category::Electronic if acoustic.is_some_and(|r| r <= ELECTRONIC_THRESHOLD) => {
                Some("Electronic track".into())
            }
            Category::Fast => tempo
                .filter(|t| *t >= FAST_BPM)
                .map(|t| format!("Fast tempo (~{t} BPM)")),
            Category::Slow => tempo
                .filter(|t| *t <= SLOW_BPM)
                .map(|t| format!("Slow tempo (~{t} BPM)")),
            _ => None,
        };
        reasons.extend(reason);
    }

    AnalyzedTrack {
        rating_key: item.rating_key.clone(),
        title: item.title.clone(),
        artist: item.hierarchy.grandparent_title.clone(),
        album: item.hierarchy.parent_title.clone(),
        genre: item.primary_genre().map(str::to_string),
        estimated_tempo: tempo,
        estimated_mood: mood,
        estimated_acoustic_ratio: acoustic,
        score: reasons.len() as u32,
        reasons,
    }
}

/// Tag and rank already-normalized items. Stable: equal scores keep input order.
pub fn rank_items(items: &[LibraryItem], categories: &[Category], limit: usize) -> Vec<AnalyzedTrack> {
    let mut analyzed: Vec<AnalyzedTrack> = items
        .iter()
        .map(|item| analyze_item(item, categories))
        .collect();
    analyzed.sort_by(|a, b| b.score.cmp(&a.score));
    analyzed.truncate(limit);
    analyzed
}

/// Search, tag and rank. Provider failures are logged and produce an empty list.
pub async fn audio_analysis_search(
    provider: &(impl SearchProvider + ?Sized),
    query: &str,
    library_ids: &[String],
    limit: Option<usize>,
) -> Vec<AnalyzedTrack> {
    let parsed = parse_query(query);
    let request = SearchRequest {
        query: parsed.text.clone(),
        library_ids: library_ids.to_vec(),
        media_type: Some(MediaType::Track),
        limit: None,
    };

    let raw = match provider.search(&request).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, query, "audio analysis search failed");
            return Vec::new();
        }
    };

    let items: Vec<LibraryItem> = normalize::normalize_search_results(&raw)
        .into_iter()
        .filter(|item| matches!(item.media_type, MediaType::Track | MediaType::Unknown))
        .collect();
    tracing::debug!(
        candidates = items.len(),
        categories = parsed.categories.len(),
        "ranking audio analysis candidates"
    );
    rank_items(&items, &parsed.categories, limit.unwrap_or(DEFAULT_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CannedProvider(Result<Value, u16>);

    #[async_trait]
    impl SearchProvider for CannedProvider {
        async fn search(&self, _request: &SearchRequest) -> Result<Value, PlexError> {
            match &self.0 {
                Ok(raw) => Ok(raw.clone()),
                Err(status) => Err(PlexError::Status {
                    status: *status,
                    path: "/search".into(),
                }),
            }
        }
    }

    fn track(key: &str, genre: &str) -> Value {
        json!({
            "ratingKey": key,
            "title": format!("Track {key}"),
            "type": "track",
            "grandparentTitle": "Artist",
            "Genre": [{"tag": genre}],
        })
    }

    fn container(tracks: Vec<Value>) -> Value {
        json!({"MediaContainer": {"Metadata": tracks}})
    }

    #[test]
    fn parse_query_extracts_categories_and_text() {
        let parsed = parse_query("Energetic, acoustic songs by Bonobo");
        assert_eq!(parsed.categories, vec![Category::Energetic, Category::Acoustic]);
        assert_eq!(parsed.text, "by bonobo");

        let parsed = parse_query("chill chill music");
        assert_eq!(parsed.categories, vec![Category::Calm]);
        assert_eq!(parsed.text, "");
    }

    #[test]
    fn parse_query_keeps_and_inside_text() {
        let parsed = parse_query("drum and bass");
        assert!(parsed.categories.is_empty());
        assert_eq!(parsed.text, "drum and bass");

        let parsed = parse_query("Chill drum and bass");
        assert_eq!(parsed.categories, vec![Category::Calm]);
        assert_eq!(parsed.text, "drum and bass");

        let parsed = parse_query("calm and acoustic songs");
        assert_eq!(parsed.categories, vec![Category::Calm, Category::Acoustic]);
        assert_eq!(parsed.text, "");

        let parsed = parse_query("rock and");
        assert_eq!(parsed.text, "rock and");
    }

    #[test]
    fn query_category_words_are_lowercase() {
        for (_, words) in QUERY_CATEGORIES {
            for word in *words {
                assert_eq!(*word, word.to_lowercase());
            }
        }
    }

    #[test]
    fn analyze_item_explains_matches() {
        let item = LibraryItem {
            rating_key: "1".into(),
            genres: vec!["Folk".into()],
            ..Default::default()
        };
        let analyzed = analyze_item(&item, &[Category::Acoustic, Category::Calm, Category::Slow]);
        assert_eq!(
            analyzed.reasons,
            vec!["Acoustic track", "Calm track", "Slow tempo (~80 BPM)"]
        );
        assert_eq!(analyzed.score, 3);
        assert_eq!(analyzed.estimated_tempo, Some(80));
        assert_eq!(analyzed.estimated_mood, Some(Mood::Calm));
        assert_eq!(analyzed.estimated_acoustic_ratio, Some(0.9));
    }

    #[test]
    fn precomputed_fields_override_genre_estimates() {
        let item = LibraryItem {
            genres: vec!["Folk".into()],
            bpm: Some(140.4),
            mood: Some("Energetic".into()),
            acoustic_ratio: Some(0.2),
            ..Default::default()
        };
        let analyzed = analyze_item(
            &item,
            &[Category::Fast, Category::Energetic, Category::Electronic],
        );
        assert_eq!(analyzed.estimated_tempo, Some(140));
        assert_eq!(analyzed.estimated_mood, Some(Mood::Energetic));
        assert_eq!(analyzed.score, 3);
        assert_eq!(analyzed.reasons[0], "Fast tempo (~140 BPM)");
    }

    #[test]
    fn rank_is_stable_and_truncated() {
        let items: Vec<LibraryItem> = [("1", "Techno"), ("2", "Folk"), ("3", "Pop"), ("4", "Jazz")]
            .iter()
            .map(|(key, genre)| LibraryItem {
                rating_key: key.to_string(),
                genres: vec![genre.to_string()],
                ..Default::default()
            })
            .collect();
        let ranked = rank_items(&items, &[Category::Energetic], 3);
        let keys: Vec<_> = ranked.iter().map(|t| t.rating_key.as_str()).collect();
        // Pop is the only energetic genre; the rest keep input order.
        assert_eq!(keys, vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn search_ranks_provider_results() {
        let provider = CannedProvider(Ok(container(vec![
            track("1", "Death Metal"),
            track("2", "Acoustic Folk"),
            track("3", "Electronic"),
        ])));
        let results = audio_analysis_search(&provider, "acoustic", &[], Some(10)).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].rating_key, "2");
        assert_eq!(results[0].reasons, vec!["Acoustic track"]);
        assert_eq!(results[0].artist.as_deref(), Some("Artist"));
    }

    #[tokio::test]
    async fn search_failure_yields_empty_list() {
        let provider = CannedProvider(Err(500));
        let results = audio_analysis_search(&provider, "energetic", &[], None).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn malformed_provider_payload_yields_empty_list() {
        let provider = CannedProvider(Ok(json!({"unexpected": true})));
        assert!(audio_analysis_search(&provider, "calm", &[], None).await.is_empty());
    }

    #[tokio::test]
    async fn media_server_acts_as_search_provider() {
        use crate::plex::fixture::FixtureServer;
        use reqwest::Method;

        let server = FixtureServer::new().route(
            Method::GET,
            "/library/sections/3/all",
            container(vec![track("7", "Dance Pop")]),
        );
        let results =
            audio_analysis_search(&server, "fast dance music", &["3".to_string()], None).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reasons, vec!["Fast tempo (~120 BPM)", "Energetic track"]);
    }
}
