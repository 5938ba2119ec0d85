use std::sync::Arc;

use anyhow::Result;
use salvo::affix_state;
use salvo::prelude::*;
use tracing::info;

use crate::config::MetricsConfig;
use crate::db::SightingStore;

pub mod handlers;
pub mod metrics;

use self::handlers::{health, metrics as metrics_handler, recent_urls};

#[derive(Clone)]
pub struct WebState {
    pub store: Arc<dyn SightingStore>,
    pub history_limit: u32,
}

pub fn create_router(state: WebState) -> Router {
    Router::new()
        .hoop(affix_state::inject(state))
        .push(Router::with_path("health").get(health))
        .push(Router::with_path("metrics").get(metrics_handler))
        .push(Router::with_path("urls/recent").get(recent_urls))
}

#[derive(Clone)]
pub struct WebServer {
    config: MetricsConfig,
    state: WebState,
}

impl WebServer {
    pub fn new(config: MetricsConfig, state: WebState) -> Self {
        Self { config, state }
    }

    pub async fn start(&self) -> Result<()> {
        let bind_addr = format!("{}:{}", self.config.bind_address, self.config.port);
        info!("Starting metrics server on {}", bind_addr);

        let acceptor = TcpListener::new(bind_addr).bind().await;
        Server::new(acceptor)
            .serve(create_router(self.state.clone()))
            .await;

        Ok(())
    }
}
