use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Watch status of an item. Each status owns one partition of a [`crate::Collection`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WatchStatus {
    /// Want to watch (the default list for new additions)
    #[serde(rename = "want_to_watch")]
    Want,
    /// Currently watching
    #[serde(rename = "watching")]
    Watching,
    /// Finished watching
    #[serde(rename = "completed")]
    Completed,
}

impl WatchStatus {
    /// All statuses in partition order.
    pub const ALL: [WatchStatus; 3] = [WatchStatus::Want, WatchStatus::Watching, WatchStatus::Completed];

    /// Column value used by the remote table and the local blob keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Want => "want_to_watch",
            WatchStatus::Watching => "watching",
            WatchStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WatchStatus::Want => "Want to watch",
            WatchStatus::Watching => "Watching",
            WatchStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "want" | "want_to_watch" | "watchlist" | "plantowatch" => Ok(WatchStatus::Want),
            "watching" => Ok(WatchStatus::Watching),
            "completed" | "watched" | "done" => Ok(WatchStatus::Completed),
            _ => Err(format!(
                "Invalid status: {}. Use 'want', 'watching', or 'completed'",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_aliases() {
        assert_eq!("want".parse::<WatchStatus>().unwrap(), WatchStatus::Want);
        assert_eq!("Want-To-Watch".parse::<WatchStatus>().unwrap(), WatchStatus::Want);
        assert_eq!("watched".parse::<WatchStatus>().unwrap(), WatchStatus::Completed);
        assert!("dropped".parse::<WatchStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_to_column_names() {
        let json = serde_json::to_string(&WatchStatus::Want).unwrap();
        assert_eq!(json, "\"want_to_watch\"");
        for status in WatchStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
