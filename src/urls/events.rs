use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use url::Url;

/// Outgoing side of a chat session, provided by the host.
#[async_trait]
pub trait Connection: Send + Sync {
    fn name(&self) -> &str;
    async fn send_notice(&self, destination: &str, text: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct ConnectionHandle(Arc<dyn Connection>);

impl ConnectionHandle {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self(connection)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub async fn send_notice(&self, destination: &str, text: &str) -> Result<()> {
        self.0.send_notice(destination, text).await
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionHandle").field(&self.name()).finish()
    }
}

/// Who sent a line. `raw` is the full source identity (`nick!user@host` on
/// IRC-like networks); `nick` is the short name when the host knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub nick: Option<String>,
    pub raw: String,
}

impl Actor {
    /// Parses `nick!user@host`; anything without a `!` keeps only the raw form.
    pub fn from_source(source: &str) -> Self {
        let nick = source
            .split_once('!')
            .map(|(nick, _)| nick)
            .filter(|nick| !nick.is_empty())
            .map(ToOwned::to_owned);

        Self {
            nick,
            raw: source.to_string(),
        }
    }
}

/// The originating protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub source: Actor,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub connection: ConnectionHandle,
    pub line: Line,
    pub destination: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub connection: ConnectionHandle,
    pub line: Line,
    pub command: String,
    pub arg: String,
    pub destination: String,
    pub is_private: bool,
}

/// Published once per structurally valid URL found in a message.
#[derive(Debug, Clone)]
pub struct UrlObserved {
    pub connection: ConnectionHandle,
    pub line: Line,
    pub destination: String,
    pub url: Url,
}

#[derive(Clone)]
pub struct UrlEvents {
    sender: broadcast::Sender<UrlObserved>,
}

impl UrlEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UrlObserved> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the event. Having none is fine.
    pub fn publish(&self, event: UrlObserved) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::Actor;

    #[test]
    fn actor_from_source_splits_nick() {
        let actor = Actor::from_source("alice!alice@example.org");
        assert_eq!(actor.nick.as_deref(), Some("alice"));
        assert_eq!(actor.raw, "alice!alice@example.org");
    }

    #[test]
    fn actor_from_source_without_nick_keeps_raw_only() {
        let actor = Actor::from_source("irc.example.org");
        assert_eq!(actor.nick, None);
        assert_eq!(actor.raw, "irc.example.org");

        let actor = Actor::from_source("!user@host");
        assert_eq!(actor.nick, None);
    }
}
