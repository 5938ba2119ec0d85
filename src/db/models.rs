use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted sighting of a URL at a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    pub id: i64,
    pub url: String,
    pub nick: Option<String>,
    pub src: String,
    pub dst: String,
    pub timestamp: DateTime<Utc>,
}

impl Sighting {
    /// Nick when the source carried a non-empty one, raw source otherwise.
    pub fn display_name(&self) -> &str {
        match self.nick.as_deref() {
            Some(nick) if !nick.is_empty() => nick,
            _ => &self.src,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSighting {
    pub url: String,
    pub nick: Option<String>,
    pub src: String,
    pub dst: String,
    pub timestamp: DateTime<Utc>,
}

/// Store state for a `(url, dst)` pair as it was before a sighting was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub id: i64,
    pub prior: Option<Sighting>,
    pub prior_count: i64,
}
