use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind half of an item's identity key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    #[serde(rename = "tv")]
    Series,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" | "film" => Ok(MediaKind::Movie),
            "tv" | "series" | "show" => Ok(MediaKind::Series),
            _ => Err(format!("Invalid media kind: {}. Use 'movie' or 'tv'", s)),
        }
    }
}

/// Series progress. Both fields are 1-based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawProgress")]
pub struct Progress {
    pub season: u32,
    pub episode: u32,
}

/// Stored shape of [`Progress`]; zero values are clamped on the way in.
#[derive(Deserialize)]
struct RawProgress {
    season: u32,
    episode: u32,
}

impl From<RawProgress> for Progress {
    fn from(raw: RawProgress) -> Self {
        Progress::new(raw.season, raw.episode)
    }
}

impl Progress {
    /// Builds progress, clamping zero values to the first season/episode.
    pub fn new(season: u32, episode: u32) -> Self {
        Self {
            season: season.max(1),
            episode: episode.max(1),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// Kind-specific payload of a watch item.
///
/// Progress only exists on the series variant, so a movie can never carry
/// season/episode state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "media_type")]
pub enum Media {
    #[serde(rename = "movie")]
    Movie {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        runtime: Option<u32>,
    },
    #[serde(rename = "tv")]
    Series {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<Progress>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        season_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        episode_count: Option<u32>,
    },
}

impl Media {
    pub fn movie() -> Self {
        Media::Movie { runtime: None }
    }

    pub fn series() -> Self {
        Media::Series {
            progress: None,
            season_count: None,
            episode_count: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Media::Movie { .. } => MediaKind::Movie,
            Media::Series { .. } => MediaKind::Series,
        }
    }

    pub fn progress(&self) -> Option<Progress> {
        match self {
            Media::Movie { .. } => None,
            Media::Series { progress, .. } => *progress,
        }
    }
}
