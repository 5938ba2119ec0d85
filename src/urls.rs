use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{Config, UrlsConfig};
use crate::db::{DatabaseError, DatabaseManager, SightingStore};

pub mod dedup;
pub mod duration;
pub mod events;
pub mod query;

pub use self::dedup::DedupEngine;
pub use self::events::{
    Actor, CommandEvent, Connection, ConnectionHandle, Line, MessageEvent, UrlEvents, UrlObserved,
};
pub use self::query::QueryService;

/// URL history feature: records every link posted to a destination, tells
/// the destination about repeats, and answers the history command.
pub struct UrlHistory {
    db_manager: Arc<DatabaseManager>,
    engine: DedupEngine,
    query: QueryService,
    events: UrlEvents,
    command: String,
}

impl UrlHistory {
    /// Opens and migrates the store. Failure here disables the feature.
    pub async fn setup(config: &Config) -> Result<Self, DatabaseError> {
        let db_manager = Arc::new(DatabaseManager::new(&config.database).await?);
        db_manager.migrate().await?;
        info!("url history ready, store at {}", db_manager.path());
        Ok(Self::new(db_manager, &config.urls))
    }

    pub fn new(db_manager: Arc<DatabaseManager>, config: &UrlsConfig) -> Self {
        let store = db_manager.sighting_store();
        Self {
            engine: DedupEngine::new(store.clone(), config.count_includes_current),
            query: QueryService::new(
                store,
                config.command.clone(),
                config.command_prefix.clone(),
                config.history_limit,
            ),
            events: UrlEvents::new(config.event_buffer),
            command: config.command.to_lowercase(),
            db_manager,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UrlObserved> {
        self.events.subscribe()
    }

    pub fn sighting_store(&self) -> Arc<dyn SightingStore> {
        self.db_manager.sighting_store()
    }

    pub async fn handle_message(&self, event: MessageEvent) {
        let outcomes = self.engine.observe_message(&event).await;
        if outcomes.is_empty() {
            return;
        }

        let mut notices = Vec::new();
        for outcome in outcomes {
            let receivers = self.events.publish(UrlObserved {
                connection: event.connection.clone(),
                line: event.line.clone(),
                destination: event.destination.clone(),
                url: outcome.url,
            });
            debug!("published url event to {} subscribers", receivers);
            notices.extend(outcome.notice);
        }

        spawn_notices(event.connection, event.destination, notices);
    }

    /// Ignores commands addressed to other features.
    pub async fn handle_command(&self, event: CommandEvent) {
        if !event.command.eq_ignore_ascii_case(&self.command) {
            return;
        }

        let replies = self.query.handle(&event.arg, event.is_private).await;
        spawn_notices(event.connection, event.destination, replies);
    }

    pub fn teardown(&self) {
        self.db_manager.close();
    }
}

// Notices go out on their own task so the handler never waits on the network.
fn spawn_notices(connection: ConnectionHandle, destination: String, notices: Vec<String>) {
    if notices.is_empty() {
        return;
    }

    tokio::spawn(async move {
        for notice in notices {
            if let Err(err) = connection.send_notice(&destination, &notice).await {
                warn!(
                    "failed to send notice via {} to {}: {}",
                    connection.name(),
                    destination,
                    err
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;
    use tempfile::NamedTempFile;
    use tokio::sync::mpsc;

    use super::{
        Actor, CommandEvent, Connection, ConnectionHandle, Line, MessageEvent, UrlHistory,
    };
    use crate::config::Config;

    struct RecordingConnection {
        sent: mpsc::UnboundedSender<(String, String)>,
    }

    #[async_trait]
    impl Connection for RecordingConnection {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_notice(&self, destination: &str, text: &str) -> Result<()> {
            let _ = self.sent.send((destination.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn recording() -> (ConnectionHandle, mpsc::UnboundedReceiver<(String, String)>) {
        let (sent, received) = mpsc::unbounded_channel();
        (
            ConnectionHandle::new(Arc::new(RecordingConnection { sent })),
            received,
        )
    }

    fn line(source: &str) -> Line {
        Line {
            source: Actor::from_source(source),
            raw: String::new(),
        }
    }

    fn message(connection: &ConnectionHandle, destination: &str, text: &str) -> MessageEvent {
        MessageEvent {
            connection: connection.clone(),
            line: line("alice!alice@example.org"),
            destination: destination.to_string(),
            text: text.to_string(),
        }
    }

    fn command(
        connection: &ConnectionHandle,
        name: &str,
        arg: &str,
        is_private: bool,
    ) -> CommandEvent {
        CommandEvent {
            connection: connection.clone(),
            line: line("bob!bob@example.org"),
            command: name.to_string(),
            arg: arg.to_string(),
            destination: if is_private { "bob" } else { "#rust" }.to_string(),
            is_private,
        }
    }

    async fn history(file: &NamedTempFile) -> UrlHistory {
        let mut config = Config::default();
        config.database.filename = Some(file.path().to_string_lossy().to_string());
        UrlHistory::setup(&config).await.expect("setup")
    }

    async fn next_notice(
        received: &mut mpsc::UnboundedReceiver<(String, String)>,
    ) -> (String, String) {
        tokio::time::timeout(Duration::from_secs(5), received.recv())
            .await
            .expect("notice in time")
            .expect("channel open")
    }

    #[tokio::test]
    async fn repeat_link_sends_notice_to_same_destination() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let history = history(&file).await;
        let (connection, mut received) = recording();

        history
            .handle_message(message(&connection, "#rust", "https://example.com/"))
            .await;
        history
            .handle_message(message(&connection, "#rust", "https://example.com/ again"))
            .await;

        let (destination, text) = next_notice(&mut received).await;
        assert_eq!(destination, "#rust");
        assert!(text.starts_with("URL 'https://example.com/' was last seen"));
        assert!(text.ends_with("by alice (1 total)"));
        assert!(received.try_recv().is_err());
    }

    #[tokio::test]
    async fn url_events_reach_subscribers() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let history = history(&file).await;
        let mut events = history.subscribe();
        let (connection, _received) = recording();

        history
            .handle_message(message(
                &connection,
                "#rust",
                "two links: https://a.example/x and www.skipped.example",
            ))
            .await;

        let event = events.recv().await.expect("url event");
        assert_eq!(event.url.as_str(), "https://a.example/x");
        assert_eq!(event.destination, "#rust");
        assert_eq!(event.line.source.nick.as_deref(), Some("alice"));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn history_command_lists_urls_in_private() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let history = history(&file).await;
        let (connection, mut received) = recording();

        history
            .handle_message(message(&connection, "#rust", "https://example.com/"))
            .await;
        history
            .handle_command(command(&connection, "urls", "", true))
            .await;

        let (destination, first) = next_notice(&mut received).await;
        assert_eq!(destination, "bob");
        assert!(first.ends_with(": #rust: https://example.com/ by alice"));
        let (_, marker) = next_notice(&mut received).await;
        assert_eq!(marker, "(no more URLs)");
    }

    #[tokio::test]
    async fn history_command_in_channel_is_rejected() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let history = history(&file).await;
        let (connection, mut received) = recording();

        history
            .handle_command(command(&connection, "URLS", "", false))
            .await;

        let (destination, text) = next_notice(&mut received).await;
        assert_eq!(destination, "#rust");
        assert_eq!(text, "urls: URL querying must be done over private messages");
    }

    #[tokio::test]
    async fn other_commands_are_ignored() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let history = history(&file).await;
        let (connection, mut received) = recording();

        history
            .handle_command(command(&connection, "weather", "", true))
            .await;
        tokio::task::yield_now().await;

        assert!(received.try_recv().is_err());
    }
}
