use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{LibraryItem, Media};

/// Codecs that score as lossless for quality rating.
pub const LOSSLESS_QUALITY_CODECS: &[&str] = &["flac", "alac", "ape", "wav", "truehd", "dts"];

/// Technical inputs to the audio quality score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioTechnical {
    /// kbps.
    pub bitrate: Option<u32>,
    pub codec: Option<String>,
    pub channels: Option<u32>,
    /// dB.
    pub dynamic_range: Option<f64>,
}

impl AudioTechnical {
    /// Technical fields of the item's first rendition, if it has any.
    pub fn from_item(item: &LibraryItem) -> Option<Self> {
        let media: &Media = item.media.first()?;
        let codec = media.audio_codec.clone().or_else(|| {
            media
                .parts
                .iter()
                .find_map(|part| part.audio_codec.clone())
        });
        Some(Self {
            bitrate: media.bitrate,
            codec,
            channels: media.audio_channels,
            dynamic_range: item.dynamic_range,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum QualityRating {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Poor => "Poor",
            Self::Fair => "Fair",
            Self::Good => "Good",
            Self::Excellent => "Excellent",
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioQuality {
    pub score: u8,
    pub rating: QualityRating,
    /// One label per rule that contributed, in evaluation order.
    pub factors: Vec<String>,
}

pub fn is_lossless_quality_codec(codec: &str) -> bool {
    LOSSLESS_QUALITY_CODECS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(codec.trim()))
}

/// Additive 0-100 quality score from bitrate, codec class, channel layout and
/// dynamic range. `None` when there is no media to score.
pub fn audio_quality(media: Option<&AudioTechnical>) -> Option<AudioQuality> {
    let media = media?;
    let mut score: u8 = 0;
    let mut factors = Vec::new();
    let mut add = |points: u8, label: &str| {
        score = score.saturating_add(points).min(100);
        factors.push(label.to_string());
    };

    match media.bitrate.unwrap_or(0) {
        1000.. => add(30, "High bitrate"),
        256..=999 => add(10, "Decent bitrate"),
        _ => {}
    }

    if media
        .codec
        .as_deref()
        .is_some_and(is_lossless_quality_codec)
    {
        add(25, "Lossless codec");
    } else {
        add(10, "Standard codec");
    }

    match media.channels.unwrap_or(0) {
        6.. => add(15, "Surround sound"),
        2 => add(10, "Stereo"),
        _ => {}
    }

    if let Some(range) = media.dynamic_range {
        if range >= 15.0 {
            add(20, "Excellent dynamic range");
        } else if range >= 8.0 {
            add(10, "Good dynamic range");
        }
    }

    Some(AudioQuality {
        score,
        rating: QualityRating::from_score(score),
        factors,
    })
}
