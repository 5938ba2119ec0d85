use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use std::time::Instant;

static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);
static MESSAGES_SCANNED: AtomicU64 = AtomicU64::new(0);
static URLS_OBSERVED: AtomicU64 = AtomicU64::new(0);
static DUPLICATES_REPORTED: AtomicU64 = AtomicU64::new(0);
static SIGHTINGS_LOST: AtomicU64 = AtomicU64::new(0);
static HISTORY_QUERIES: AtomicU64 = AtomicU64::new(0);
static QUERIES_REJECTED: AtomicU64 = AtomicU64::new(0);

pub struct Metrics;

impl Metrics {
    pub fn start_clock() {
        Lazy::force(&STARTED_AT);
    }

    pub fn message_scanned() {
        MESSAGES_SCANNED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn url_observed() {
        URLS_OBSERVED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicate_reported() {
        DUPLICATES_REPORTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sighting_lost() {
        SIGHTINGS_LOST.fetch_add(1, Ordering::Relaxed);
    }

    pub fn history_query() {
        HISTORY_QUERIES.fetch_add(1, Ordering::Relaxed);
    }

    pub fn query_rejected() {
        QUERIES_REJECTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_seconds() -> u64 {
        STARTED_AT.elapsed().as_secs()
    }
}

pub fn format_prometheus() -> String {
    format!(
        r#"# HELP url_history_uptime_seconds Number of seconds the service has been running
# TYPE url_history_uptime_seconds gauge
url_history_uptime_seconds {}

# HELP url_history_messages_scanned_total Messages scanned for URLs
# TYPE url_history_messages_scanned_total counter
url_history_messages_scanned_total {}

# HELP url_history_urls_observed_total URL sightings recorded in the store
# TYPE url_history_urls_observed_total counter
url_history_urls_observed_total {}

# HELP url_history_duplicates_reported_total Repeat-link notices produced
# TYPE url_history_duplicates_reported_total counter
url_history_duplicates_reported_total {}

# HELP url_history_sightings_lost_total Sightings dropped because the store failed
# TYPE url_history_sightings_lost_total counter
url_history_sightings_lost_total {}

# HELP url_history_queries_total History command queries answered
# TYPE url_history_queries_total counter
url_history_queries_total {}

# HELP url_history_queries_rejected_total History commands refused outside private messages
# TYPE url_history_queries_rejected_total counter
url_history_queries_rejected_total {}
"#,
        Metrics::uptime_seconds(),
        MESSAGES_SCANNED.load(Ordering::Relaxed),
        URLS_OBSERVED.load(Ordering::Relaxed),
        DUPLICATES_REPORTED.load(Ordering::Relaxed),
        SIGHTINGS_LOST.load(Ordering::Relaxed),
        HISTORY_QUERIES.load(Ordering::Relaxed),
        QUERIES_REJECTED.load(Ordering::Relaxed),
    )
}
