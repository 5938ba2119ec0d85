use std::sync::Arc;

use tracing::{debug, error};

use crate::db::{DatabaseError, Sighting, SightingStore};
use crate::web::metrics::Metrics;

pub const NO_MORE_URLS: &str = "(no more URLs)";

pub struct QueryService {
    store: Arc<dyn SightingStore>,
    command: String,
    command_prefix: String,
    limit: u32,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn SightingStore>,
        command: impl Into<String>,
        command_prefix: impl Into<String>,
        limit: u32,
    ) -> Self {
        Self {
            store,
            command: command.into(),
            command_prefix: command_prefix.into(),
            limit,
        }
    }

    /// Reply lines for one invocation of the history command.
    pub async fn handle(&self, arg: &str, is_private: bool) -> Vec<String> {
        if !is_private {
            Metrics::query_rejected();
            return vec![format!(
                "{}: URL querying must be done over private messages",
                self.command
            )];
        }

        if arg.trim() == "help" {
            return self.usage();
        }

        Metrics::history_query();
        match self.list(self.limit).await {
            Ok(lines) => lines,
            Err(err) => {
                error!("{} history query failed: {}", self.command, err);
                vec![format!("{}: Internal error occurred", self.command)]
            }
        }
    }

    pub fn usage(&self) -> Vec<String> {
        vec![
            format!(
                "{}: usage: {}{}",
                self.command, self.command_prefix, self.command
            ),
            format!(
                "{}: Prints the last {} URLs seen in all channels",
                self.command, self.limit
            ),
        ]
    }

    /// Newest distinct URLs, one line each, with a trailing marker when the
    /// history holds fewer than `limit` of them.
    pub async fn list(&self, limit: u32) -> Result<Vec<String>, DatabaseError> {
        let sightings = self.store.recent_distinct(i64::from(limit)).await?;
        debug!("history query returned {} of {} rows", sightings.len(), limit);

        let mut lines: Vec<String> = sightings.iter().map(format_entry).collect();
        if lines.len() < limit as usize {
            lines.push(NO_MORE_URLS.to_string());
        }
        Ok(lines)
    }
}

pub fn format_entry(sighting: &Sighting) -> String {
    format!(
        "{}: {}: {} by {}",
        sighting.timestamp.format("%m-%d %H:%M:%S"),
        sighting.dst,
        sighting.url,
        sighting.display_name()
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use tempfile::NamedTempFile;

    use super::{NO_MORE_URLS, QueryService, format_entry};
    use crate::config::DatabaseConfig;
    use crate::db::{DatabaseManager, NewSighting, Sighting, SightingStore};

    async fn store(file: &NamedTempFile) -> Arc<dyn SightingStore> {
        let config = DatabaseConfig {
            url: None,
            filename: Some(file.path().to_string_lossy().to_string()),
            ..DatabaseConfig::default()
        };
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");
        manager.sighting_store()
    }

    async fn seed(store: &Arc<dyn SightingStore>, distinct: usize) {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        for n in 0..distinct {
            store
                .append(&NewSighting {
                    url: format!("https://example.com/{n}"),
                    nick: Some("alice".to_string()),
                    src: "alice!alice@example.org".to_string(),
                    dst: "#rust".to_string(),
                    timestamp: start + Duration::minutes(n as i64),
                })
                .await
                .expect("append");
        }
    }

    #[test]
    fn format_entry_uses_month_day_and_time() {
        let sighting = Sighting {
            id: 3,
            url: "https://example.com/".to_string(),
            nick: None,
            src: "bob!bob@example.org".to_string(),
            dst: "#rust".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap(),
        };

        assert_eq!(
            format_entry(&sighting),
            "03-07 09:05:01: #rust: https://example.com/ by bob!bob@example.org"
        );
    }

    #[tokio::test]
    async fn public_invocation_is_rejected() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let service = QueryService::new(store(&file).await, "urls", "!", 5);

        assert_eq!(
            service.handle("", false).await,
            vec!["urls: URL querying must be done over private messages".to_string()]
        );
        assert_eq!(service.handle("help", false).await.len(), 1);
    }

    #[tokio::test]
    async fn help_returns_usage_lines() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let service = QueryService::new(store(&file).await, "urls", "!", 5);

        assert_eq!(
            service.handle("  help ", true).await,
            vec![
                "urls: usage: !urls".to_string(),
                "urls: Prints the last 5 URLs seen in all channels".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn full_history_returns_limit_lines_newest_first() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = store(&file).await;
        seed(&store, 12).await;
        let service = QueryService::new(store, "urls", "!", 5);

        let lines = service.handle("", true).await;

        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("https://example.com/11 by alice"));
        assert!(lines[4].ends_with("https://example.com/7 by alice"));
        assert!(!lines.iter().any(|line| line == NO_MORE_URLS));
    }

    #[tokio::test]
    async fn short_history_ends_with_marker() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = store(&file).await;
        seed(&store, 3).await;
        let service = QueryService::new(store, "urls", "!", 5);

        let lines = service.handle("", true).await;

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "05-01 08:02:00: #rust: https://example.com/2 by alice");
        assert_eq!(lines[3], NO_MORE_URLS);
    }

    #[tokio::test]
    async fn empty_history_is_just_the_marker() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let service = QueryService::new(store(&file).await, "urls", "!", 5);

        assert_eq!(service.handle("", true).await, vec![NO_MORE_URLS.to_string()]);
    }

    #[tokio::test]
    async fn closed_store_reports_internal_error() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let config = DatabaseConfig {
            url: None,
            filename: Some(file.path().to_string_lossy().to_string()),
            ..DatabaseConfig::default()
        };
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");
        let service = QueryService::new(manager.sighting_store(), "urls", "!", 5);
        manager.close();

        assert_eq!(
            service.handle("", true).await,
            vec!["urls: Internal error occurred".to_string()]
        );
    }
}
