//! Genre-keyword heuristics: tempo, mood and acoustic character guessed from a
//! free-text genre tag. Tables are evaluated top to bottom and the first rule with a
//! keyword contained in the genre wins, so more specific genres sit above the
//! generic ones they contain ("drum and bass" above "house"/"pop").

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Energetic,
    Aggressive,
    Melancholic,
    Calm,
}

impl Mood {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Energetic => "energetic",
            Self::Aggressive => "aggressive",
            Self::Melancholic => "melancholic",
            Self::Calm => "calm",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "energetic" => Some(Self::Energetic),
            "aggressive" => Some(Self::Aggressive),
            "melancholic" => Some(Self::Melancholic),
            "calm" => Some(Self::Calm),
            _ => None,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated BPM per genre keyword. Keys must be lowercase.
pub const TEMPO_RULES: &[(&[&str], u32)] = &[
    (&["drum and bass", "drum & bass", "drum n bass", "dnb", "jungle"], 170),
    (&["techno"], 130),
    (&["house"], 125),
    (&["pop"], 120),
    (&["hip hop", "hip-hop", "rap"], 95),
    (&["folk"], 80),
    (&["ballad", "slow"], 70),
];

pub const MOOD_RULES: &[(&[&str], Mood)] = &[
    (&["dance", "electronic", "pop"], Mood::Energetic),
    (&["rock", "metal", "punk"], Mood::Aggressive),
    (&["jazz", "blues"], Mood::Melancholic),
    (&["ambient", "classical", "folk"], Mood::Calm),
];

/// Share of acoustic (non-synthesized) instrumentation, 0.0-1.0.
pub const ACOUSTIC_RULES: &[(&[&str], f64)] = &[
    (&["acoustic", "folk", "country"], 0.9),
    (&["classical", "jazz"], 0.8),
    (&["rock", "pop"], 0.5),
    (&["electronic", "synth", "techno"], 0.1),
];

/// First rule whose keyword occurs in `genre` (case-insensitive).
fn first_match<T: Copy>(rules: &[(&[&str], T)], genre: Option<&str>) -> Option<T> {
    let genre = genre?.to_lowercase();
    if genre.trim().is_empty() {
        return None;
    }
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| genre.contains(k)))
        .map(|(_, value)| *value)
}

pub fn estimate_tempo(genre: Option<&str>) -> Option<u32> {
    first_match(TEMPO_RULES, genre)
}

pub fn estimate_mood(genre: Option<&str>) -> Option<Mood> {
    first_match(MOOD_RULES, genre)
}

pub fn estimate_acoustic_ratio(genre: Option<&str>) -> Option<f64> {
    first_match(ACOUSTIC_RULES, genre)
}
