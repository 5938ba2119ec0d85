use async_trait::async_trait;

use super::DatabaseError;
use super::models::{NewSighting, Observation, Sighting};

#[async_trait]
pub trait SightingStore: Send + Sync {
    /// Latest sighting for the pair and how many rows the pair has.
    async fn most_recent_and_count(
        &self,
        url: &str,
        dst: &str,
    ) -> Result<(Option<Sighting>, i64), DatabaseError>;
    async fn append(&self, sighting: &NewSighting) -> Result<i64, DatabaseError>;
    /// Lookup followed by append inside a single transaction. The returned
    /// prior state never includes the row appended by this call.
    async fn observe(&self, sighting: &NewSighting) -> Result<Observation, DatabaseError>;
    /// One row per distinct url (the newest), newest first.
    async fn recent_distinct(&self, limit: i64) -> Result<Vec<Sighting>, DatabaseError>;
}
