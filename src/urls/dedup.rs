use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};
use url::Url;

use crate::db::{NewSighting, Sighting, SightingStore};
use crate::parsers::{extract_urls, parse_candidate};
use crate::web::metrics::Metrics;

use super::duration::humanize;
use super::events::{Actor, MessageEvent};

/// Result of observing one URL from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOutcome {
    pub url: Url,
    pub notice: Option<String>,
}

pub struct DedupEngine {
    store: Arc<dyn SightingStore>,
    count_includes_current: bool,
}

impl DedupEngine {
    pub fn new(store: Arc<dyn SightingStore>, count_includes_current: bool) -> Self {
        Self {
            store,
            count_includes_current,
        }
    }

    /// Extracted candidates that pass the structural parse, in message order.
    pub fn candidates(text: &str) -> Vec<Url> {
        extract_urls(text)
            .into_iter()
            .filter_map(|candidate| {
                let parsed = parse_candidate(&candidate);
                if parsed.is_none() {
                    debug!("dropping url candidate without scheme or host: {}", candidate);
                }
                parsed
            })
            .collect()
    }

    pub async fn observe_message(&self, message: &MessageEvent) -> Vec<UrlOutcome> {
        self.observe_message_at(message, Utc::now()).await
    }

    pub async fn observe_message_at(
        &self,
        message: &MessageEvent,
        now: DateTime<Utc>,
    ) -> Vec<UrlOutcome> {
        Metrics::message_scanned();

        let mut outcomes = Vec::new();
        for url in Self::candidates(&message.text) {
            let notice = self
                .observe_url_at(&url, &message.destination, &message.line.source, now)
                .await;
            outcomes.push(UrlOutcome { url, notice });
        }
        outcomes
    }

    /// Records the sighting and returns the duplicate notice, if any. Store
    /// failures are logged and the sighting is dropped; nothing is retried.
    pub async fn observe_url_at(
        &self,
        url: &Url,
        destination: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let sighting = NewSighting {
            url: url.to_string(),
            nick: actor.nick.clone(),
            src: actor.raw.clone(),
            dst: destination.to_string(),
            timestamp: now,
        };

        let observation = match self.store.observe(&sighting).await {
            Ok(observation) => observation,
            Err(err) => {
                Metrics::sighting_lost();
                error!(
                    "url sighting lost url={} dst={}: {}",
                    sighting.url, sighting.dst, err
                );
                return None;
            }
        };

        Metrics::url_observed();
        debug!(
            "recorded url sighting id={} url={} dst={} prior_count={}",
            observation.id, sighting.url, sighting.dst, observation.prior_count
        );

        let prior = observation.prior?;
        let count = if self.count_includes_current {
            observation.prior_count + 1
        } else {
            observation.prior_count
        };

        Metrics::duplicate_reported();
        Some(duplicate_notice(&sighting.url, &prior, count, now))
    }
}

pub fn duplicate_notice(url: &str, prior: &Sighting, count: i64, now: DateTime<Utc>) -> String {
    format!(
        "URL '{}' was last seen {} ago by {} ({} total)",
        url,
        humanize(now - prior.timestamp),
        prior.display_name(),
        count
    )
}
