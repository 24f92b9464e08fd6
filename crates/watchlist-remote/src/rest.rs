use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use watchlist_config::RemoteConfig;
use watchlist_models::{Identity, ItemKey, ItemPatch, Media, MediaKind, Progress, WatchItem, WatchStatus};
use crate::error::{RemoteError, Result};
use crate::traits::RemoteMediaRepository;

/// One row of the hosted watchlist table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct WatchlistRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    tmdb_id: i64,
    media_type: MediaKind,
    title: String,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    release_year: Option<u32>,
    #[serde(default)]
    rating: Option<f32>,
    status: WatchStatus,
    added_at: DateTime<Utc>,
    #[serde(default)]
    current_season: Option<u32>,
    #[serde(default)]
    current_episode: Option<u32>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    runtime: Option<u32>,
    #[serde(default)]
    number_of_seasons: Option<u32>,
    #[serde(default)]
    number_of_episodes: Option<u32>,
}

/// Body of a PATCH request. Only set columns are sent.
#[derive(Debug, Serialize)]
struct PatchRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<WatchStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_episode: Option<u32>,
}

impl WatchlistRow {
    fn from_item(user_id: &str, item: &WatchItem) -> Self {
        let (current_season, current_episode, runtime, number_of_seasons, number_of_episodes) = match &item.media {
            Media::Movie { runtime } => (None, None, *runtime, None, None),
            Media::Series { progress, season_count, episode_count } => (
                progress.map(|p| p.season),
                progress.map(|p| p.episode),
                None,
                *season_count,
                *episode_count,
            ),
        };

        Self {
            user_id: Some(user_id.to_string()),
            tmdb_id: item.external_id,
            media_type: item.kind(),
            title: item.title.clone(),
            poster_path: item.poster_path.clone(),
            release_year: item.release_year,
            rating: item.rating,
            status: item.status,
            added_at: item.added_at,
            current_season,
            current_episode,
            overview: item.overview.clone(),
            runtime,
            number_of_seasons,
            number_of_episodes,
        }
    }

    fn into_item(self) -> WatchItem {
        // Progress columns on a movie row are ignored
        let media = match self.media_type {
            MediaKind::Movie => Media::Movie { runtime: self.runtime },
            MediaKind::Series => Media::Series {
                progress: match (self.current_season, self.current_episode) {
                    (Some(season), Some(episode)) => Some(Progress::new(season, episode)),
                    _ => None,
                },
                season_count: self.number_of_seasons,
                episode_count: self.number_of_episodes,
            },
        };

        WatchItem {
            external_id: self.tmdb_id,
            title: self.title,
            poster_path: self.poster_path,
            release_year: self.release_year,
            rating: self.rating,
            status: self.status,
            added_at: self.added_at,
            overview: self.overview,
            media,
        }
    }
}

impl PatchRow {
    fn from_patch(patch: &ItemPatch) -> Self {
        Self {
            status: patch.status,
            current_season: patch.progress.map(|p| p.season),
            current_episode: patch.progress.map(|p| p.episode),
        }
    }
}

/// Repository over a PostgREST-style table (`{url}/rest/v1/{table}`).
#[derive(Clone)]
pub struct RestRepository {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestRepository {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authorized(&self, request: RequestBuilder, identity: &Identity) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", identity.access_token))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }

    fn key_filters(identity: &Identity, key: &ItemKey) -> [(&'static str, String); 3] {
        [
            ("user_id", format!("eq.{}", identity.user_id)),
            ("tmdb_id", format!("eq.{}", key.external_id)),
            ("media_type", format!("eq.{}", key.kind.as_str())),
        ]
    }

    async fn error_for(response: Response) -> RemoteError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        RemoteError::Http {
            status: status.as_u16(),
            body,
        }
    }

    async fn decode_rows(response: Response) -> Result<Vec<WatchlistRow>> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteMediaRepository for RestRepository {
    fn name(&self) -> &str {
        "rest"
    }

    async fn list_all(&self, identity: &Identity) -> Result<Vec<WatchItem>> {
        let request = self
            .client
            .get(self.table_url())
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", identity.user_id)),
                ("order", "added_at.asc".to_string()),
            ]);
        let response = self.authorized(request, identity).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let rows = Self::decode_rows(response).await?;
        debug!(operation = "list_all", rows = rows.len(), "Fetched remote watchlist");
        Ok(rows.into_iter().map(WatchlistRow::into_item).collect())
    }

    async fn insert(&self, identity: &Identity, item: &WatchItem) -> Result<WatchItem> {
        let row = WatchlistRow::from_item(&identity.user_id, item);
        let request = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.authorized(request, identity).send().await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(RemoteError::DuplicateKey(item.key()));
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let rows = Self::decode_rows(response).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_item()),
            None => {
                // Some deployments strip the representation; the write itself succeeded
                warn!(operation = "insert", key = %item.key(), "Remote insert returned no row");
                Ok(item.clone())
            }
        }
    }

    async fn update(&self, identity: &Identity, key: &ItemKey, patch: &ItemPatch) -> Result<WatchItem> {
        let request = self
            .client
            .patch(self.table_url())
            .query(&Self::key_filters(identity, key))
            .header("Prefer", "return=representation")
            .json(&PatchRow::from_patch(patch));
        let response = self.authorized(request, identity).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let rows = Self::decode_rows(response).await?;
        rows.into_iter()
            .next()
            .map(WatchlistRow::into_item)
            .ok_or(RemoteError::NotFound(*key))
    }

    async fn delete(&self, identity: &Identity, key: &ItemKey) -> Result<()> {
        let request = self
            .client
            .delete(self.table_url())
            .query(&Self::key_filters(identity, key));
        let response = self.authorized(request, identity).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }
}
