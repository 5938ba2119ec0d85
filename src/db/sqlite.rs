use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use parking_lot::Mutex;
use tracing::warn;

use crate::db::schema_sqlite::seen;

use super::{
    DatabaseError,
    models::{NewSighting, Observation, Sighting},
};

/// The single process-wide SQLite handle. `None` once the manager is closed.
pub type SharedConnection = Arc<Mutex<Option<SqliteConnection>>>;

// Helper function to convert DateTime to ISO string for SQLite
fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// Rows written by older tooling use a space separated layout, with or without
// an offset.
fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

#[derive(Debug, Clone, Queryable, Selectable, QueryableByName)]
#[diesel(table_name = seen)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbSighting {
    id: i64,
    url: String,
    nick: Option<String>,
    src: String,
    dst: String,
    timestamp: String,
}

impl DbSighting {
    fn to_sighting(&self) -> Result<Sighting, DatabaseError> {
        Ok(Sighting {
            id: self.id,
            url: self.url.clone(),
            nick: self.nick.clone(),
            src: self.src.clone(),
            dst: self.dst.clone(),
            timestamp: string_to_datetime(&self.timestamp)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = seen)]
struct NewDbSighting<'a> {
    url: &'a str,
    nick: Option<&'a str>,
    src: &'a str,
    dst: &'a str,
    timestamp: String,
}

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    id: i64,
}

pub(crate) fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    SqliteConnection::establish(path).map_err(|e| DatabaseError::Connection(e.to_string()))
}

fn lookup(
    conn: &mut SqliteConnection,
    pair_url: &str,
    pair_dst: &str,
) -> Result<(Option<Sighting>, i64), DatabaseError> {
    use crate::db::schema_sqlite::seen::dsl::*;

    let latest = seen
        .filter(url.eq(pair_url))
        .filter(dst.eq(pair_dst))
        .order(id.desc())
        .select(DbSighting::as_select())
        .first::<DbSighting>(conn)
        .optional()?;

    let Some(latest) = latest else {
        return Ok((None, 0));
    };

    let count = seen
        .filter(url.eq(pair_url))
        .filter(dst.eq(pair_dst))
        .count()
        .get_result::<i64>(conn)?;

    Ok((Some(latest.to_sighting()?), count))
}

fn insert(conn: &mut SqliteConnection, sighting: &NewSighting) -> Result<i64, DatabaseError> {
    let row = NewDbSighting {
        url: &sighting.url,
        nick: sighting.nick.as_deref(),
        src: &sighting.src,
        dst: &sighting.dst,
        timestamp: datetime_to_string(&sighting.timestamp),
    };

    diesel::insert_into(seen::table).values(&row).execute(conn)?;

    let inserted = diesel::sql_query("SELECT last_insert_rowid() AS id")
        .get_result::<LastInsertRowId>(conn)?;
    Ok(inserted.id)
}

pub struct SqliteSightingStore {
    connection: SharedConnection,
}

impl SqliteSightingStore {
    pub fn new(connection: SharedConnection) -> Self {
        Self { connection }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = connection.lock();
            let conn = guard.as_mut().ok_or(DatabaseError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| DatabaseError::Task(e.to_string()))?
    }
}

#[async_trait]
impl super::SightingStore for SqliteSightingStore {
    async fn most_recent_and_count(
        &self,
        url: &str,
        dst: &str,
    ) -> Result<(Option<Sighting>, i64), DatabaseError> {
        let url = url.to_string();
        let dst = dst.to_string();
        self.run(move |conn| conn.transaction(|conn| lookup(conn, &url, &dst)))
            .await
    }

    async fn append(&self, sighting: &NewSighting) -> Result<i64, DatabaseError> {
        let sighting = sighting.clone();
        self.run(move |conn| conn.transaction(|conn| insert(conn, &sighting)))
            .await
    }

    async fn observe(&self, sighting: &NewSighting) -> Result<Observation, DatabaseError> {
        let sighting = sighting.clone();
        self.run(move |conn| {
            // BEGIN IMMEDIATE takes the write lock up front, so a second
            // process cannot slip its own row between our lookup and append.
            conn.immediate_transaction(|conn| {
                // The lookup runs under a savepoint: if it fails we roll back
                // just that step and still record the sighting.
                let (prior, prior_count) =
                    match conn.transaction(|conn| lookup(conn, &sighting.url, &sighting.dst)) {
                        Ok(found) => found,
                        Err(err) => {
                            warn!(
                                "sighting lookup failed url={} dst={}: {}",
                                sighting.url, sighting.dst, err
                            );
                            (None, 0)
                        }
                    };

                let id = insert(conn, &sighting)?;

                Ok(Observation {
                    id,
                    prior,
                    prior_count,
                })
            })
        })
        .await
    }

    async fn recent_distinct(&self, limit: i64) -> Result<Vec<Sighting>, DatabaseError> {
        self.run(move |conn| {
            let rows = diesel::sql_query(
                "SELECT id, url, nick, src, dst, timestamp FROM seen \
                 WHERE id IN (SELECT MAX(id) FROM seen GROUP BY url) \
                 ORDER BY id DESC LIMIT ?",
            )
            .bind::<diesel::sql_types::BigInt, _>(limit)
            .load::<DbSighting>(conn)?;

            rows.iter().map(DbSighting::to_sighting).collect()
        })
        .await
    }
}
