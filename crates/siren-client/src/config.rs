use std::time::Duration;

/// Connection and subscription tuning for the sync client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the dispatch service.
    pub url: String,

    /// Fixed delay between a transport close and the next connect attempt.
    /// Reconnection is retried indefinitely at this interval.
    pub reconnect_delay: Duration,

    /// Geocell precision for interest regions. Coarser cells mean fewer
    /// resubscriptions while moving, at the cost of receiving more events
    /// from irrelevant areas.
    pub geocell_precision: usize,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: Duration::from_secs(5),
            geocell_precision: siren_geo::DEFAULT_PRECISION,
        }
    }
}
