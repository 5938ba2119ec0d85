//! Line-oriented host for running the URL history feature without a chat
//! network. Each stdin line is `<source> <destination> <text>`; notices are
//! written to stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::parsers::parse_prefixed_command;
use crate::urls::{
    Actor, CommandEvent, Connection, ConnectionHandle, Line, MessageEvent, UrlHistory,
};

pub struct ConsoleConnection;

#[async_trait]
impl Connection for ConsoleConnection {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_notice(&self, destination: &str, text: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("-> NOTICE {} :{}\n", destination, text).as_bytes())
            .await
            .context("writing notice to stdout")?;
        stdout.flush().await.context("flushing stdout")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundLine {
    pub source: String,
    pub destination: String,
    pub text: String,
}

/// Fields are separated by runs of whitespace; the text keeps its inner spacing.
pub fn parse_inbound(line: &str) -> Option<InboundLine> {
    let (source, rest) = line.trim().split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (destination, text) = match rest.split_once(char::is_whitespace) {
        Some((destination, text)) => (destination, text.trim()),
        None => (rest, ""),
    };
    if source.is_empty() || destination.is_empty() {
        return None;
    }

    Some(InboundLine {
        source: source.to_string(),
        destination: destination.to_string(),
        text: text.to_string(),
    })
}

/// Channel names start with `#` or `&`; anything else is a private target.
pub fn is_channel(destination: &str) -> bool {
    destination.starts_with('#') || destination.starts_with('&')
}

pub struct ConsoleHost {
    history: Arc<UrlHistory>,
    connection: ConnectionHandle,
    command_prefix: String,
}

impl ConsoleHost {
    pub fn new(history: Arc<UrlHistory>, command_prefix: impl Into<String>) -> Self {
        Self {
            history,
            connection: ConnectionHandle::new(Arc::new(ConsoleConnection)),
            command_prefix: command_prefix.into(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("reading `<source> <destination> <text>` lines from stdin");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(raw) = lines.next_line().await.context("reading stdin")? {
            let Some(inbound) = parse_inbound(&raw) else {
                debug!("skipping malformed console line: {:?}", raw);
                continue;
            };
            self.dispatch(inbound, raw).await;
        }

        info!("stdin closed");
        Ok(())
    }

    async fn dispatch(&self, inbound: InboundLine, raw: String) {
        let source = Actor::from_source(&inbound.source);
        let line = Line {
            source: source.clone(),
            raw,
        };

        if let Some(command) = parse_prefixed_command(&self.command_prefix, &inbound.text) {
            let is_private = !is_channel(&inbound.destination);
            // Private replies go back to whoever asked.
            let reply_to = if is_private {
                source.nick.clone().unwrap_or_else(|| source.raw.clone())
            } else {
                inbound.destination.clone()
            };

            self.history
                .handle_command(CommandEvent {
                    connection: self.connection.clone(),
                    line: line.clone(),
                    command: command.name,
                    arg: command.arg,
                    destination: reply_to,
                    is_private,
                })
                .await;
        }

        self.history
            .handle_message(MessageEvent {
                connection: self.connection.clone(),
                line,
                destination: inbound.destination,
                text: inbound.text,
            })
            .await;
    }
}
