use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::media::{Media, MediaKind, Progress};
use crate::status::WatchStatus;

/// Identity of an item inside one user's collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub external_id: i64, // TMDB id
    pub kind: MediaKind,
}

impl ItemKey {
    pub fn new(external_id: i64, kind: MediaKind) -> Self {
        Self { external_id, kind }
    }

    pub fn movie(external_id: i64) -> Self {
        Self::new(external_id, MediaKind::Movie)
    }

    pub fn series(external_id: i64) -> Self {
        Self::new(external_id, MediaKind::Series)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.external_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchItem {
    pub external_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>, // Display only
    pub status: WatchStatus,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(flatten)]
    pub media: Media,
}

impl WatchItem {
    pub fn new(external_id: i64, title: impl Into<String>, media: Media, status: WatchStatus) -> Self {
        Self {
            external_id,
            title: title.into(),
            poster_path: None,
            release_year: None,
            rating: None,
            status,
            added_at: Utc::now(),
            overview: None,
            media,
        }
    }

    pub fn movie(external_id: i64, title: impl Into<String>, status: WatchStatus) -> Self {
        Self::new(external_id, title, Media::movie(), status)
    }

    pub fn series(external_id: i64, title: impl Into<String>, status: WatchStatus) -> Self {
        Self::new(external_id, title, Media::series(), status)
    }

    pub fn with_poster(mut self, poster_path: impl Into<String>) -> Self {
        self.poster_path = Some(poster_path.into());
        self
    }

    pub fn with_release_year(mut self, year: u32) -> Self {
        self.release_year = Some(year);
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.external_id, self.media.kind())
    }

    pub fn kind(&self) -> MediaKind {
        self.media.kind()
    }

    pub fn progress(&self) -> Option<Progress> {
        self.media.progress()
    }

    /// Sets series progress. Returns false (and changes nothing) for movies.
    pub fn set_progress(&mut self, progress: Progress) -> bool {
        match &mut self.media {
            Media::Series { progress: current, .. } => {
                *current = Some(progress);
                true
            }
            Media::Movie { .. } => false,
        }
    }

    /// Applies the fields of a patch that make sense for this item's kind.
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.set_progress(progress);
        }
    }
}

/// Partial update sent to the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WatchStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl ItemPatch {
    pub fn status(status: WatchStatus) -> Self {
        Self { status: Some(status), progress: None }
    }

    pub fn progress(progress: Progress) -> Self {
        Self { status: None, progress: Some(progress) }
    }
}
