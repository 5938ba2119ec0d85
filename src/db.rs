pub use self::error::DatabaseError;
pub use self::manager::DatabaseManager;
pub use self::models::{NewSighting, Observation, Sighting};
pub use self::stores::SightingStore;

pub mod error;
pub mod manager;
pub mod models;
pub mod stores;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub mod schema_sqlite;
