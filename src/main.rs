#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

mod cli;
mod config;
mod console;
mod db;
mod parsers;
mod urls;
mod utils;
mod web;

use cli::Cli;
use config::Config;
use console::ConsoleHost;
use urls::UrlHistory;
use web::metrics::Metrics;
use web::{WebServer, WebState};

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.allow_missing_config && !cli.config.exists() {
        Config::from_env().context("building config from defaults and environment")?
    } else {
        Config::load_from_file(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    };

    if let Some(database) = &cli.database {
        config.database.url = Some(format!("sqlite://{}", database));
        config.validate()?;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    utils::logging::init_tracing(&config.logging);
    Metrics::start_clock();
    info!("url history starting up");

    let history = match UrlHistory::setup(&config).await {
        Ok(history) => Arc::new(history),
        Err(e) => {
            error!("url history disabled, store unavailable: {}", e);
            return Err(e).context("opening url history store");
        }
    };

    let mut subscriber = history.subscribe();
    tokio::spawn(async move {
        loop {
            match subscriber.recv().await {
                Ok(event) => info!(
                    "url observed dst={} url={} via={}",
                    event.destination,
                    event.url,
                    event.connection.name()
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("url event log lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if config.metrics.enabled {
        let web_server = WebServer::new(
            config.metrics.clone(),
            WebState {
                store: history.sighting_store(),
                history_limit: config.urls.history_limit,
            },
        );
        tokio::spawn(async move {
            if let Err(e) = web_server.start().await {
                error!("metrics server error: {}", e);
            }
        });
    }

    let host = ConsoleHost::new(history.clone(), config.urls.command_prefix.clone());

    tokio::select! {
        result = host.run() => {
            if let Err(e) = result {
                error!("console host error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received");
        }
    }

    history.teardown();
    info!("url history shutting down");
    Ok(())
}
