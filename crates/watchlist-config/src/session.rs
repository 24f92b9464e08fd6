use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use watchlist_models::Identity;

#[derive(Debug, Serialize, Deserialize, Default)]
struct SessionData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Persisted sign-in state. The auth provider issues the token; this file only remembers it.
pub struct SessionStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            values: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let session: SessionData = toml::from_str(&content)?;
            self.values = session.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let session = SessionData {
            data: self.values.clone(),
        };
        let content = toml::to_string_pretty(&session)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.values.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// The stored account, if both a user id and an access token are present.
    pub fn identity(&self) -> Option<Identity> {
        let user_id = self.get("user_id")?;
        let access_token = self.get("access_token")?;
        let mut identity = Identity::new(user_id.clone(), access_token.clone());
        identity.email = self.get("email").cloned();
        Some(identity)
    }

    pub fn set_identity(&mut self, identity: &Identity) {
        self.set("user_id".to_string(), identity.user_id.clone());
        self.set("access_token".to_string(), identity.access_token.clone());
        match &identity.email {
            Some(email) => self.set("email".to_string(), email.clone()),
            None => self.remove("email"),
        }
        self.set("signed_in_at".to_string(), Utc::now().to_rfc3339());
    }

    pub fn clear_identity(&mut self) {
        for key in ["user_id", "access_token", "email", "signed_in_at"] {
            self.remove(key);
        }
    }

    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.get("signed_in_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
