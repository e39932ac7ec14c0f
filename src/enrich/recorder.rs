//! Resolution recorder: observes DNS answer events and records the
//! `resolved IP -> queried hostname` mapping in the shared cache.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::DnsCache;
use crate::event::Event;

use super::is_valid_hostname;

/// Field paths and TTL for the resolution recorder.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Path of the resolved IP, used as the cache key.
    pub resolved_ip: String,
    /// Path of the queried hostname, used as the cache value.
    pub queried_name: String,
    /// Lifetime of each recorded mapping.
    pub ttl: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            resolved_ip: "dns.resolved".to_string(),
            queried_name: "dns.query".to_string(),
            ttl: Duration::from_secs(60),
        }
    }
}

/// First stage of the enrichment pipeline. Holds no state of its own; every
/// observation lands in the shared cache. Never mutates the events it
/// processes.
pub struct ResolutionRecorder<C: DnsCache> {
    cache: Arc<C>,
    config: RecorderConfig,
}

impl<C: DnsCache> ResolutionRecorder<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self::with_config(cache, RecorderConfig::default())
    }

    pub fn with_config(cache: Arc<C>, config: RecorderConfig) -> Self {
        Self { cache, config }
    }

    /// Process one DNS event: at most one cache write, and the event passes
    /// through unchanged. A cache failure is logged and swallowed.
    pub async fn record(&self, event: Event) -> Vec<Event> {
        self.try_record(&event).await;
        vec![event]
    }

    async fn try_record(&self, event: &Event) {
        let Some(name) = event.get_str(&self.config.queried_name) else {
            debug!(path = %self.config.queried_name, "no queried name on event, skipping write");
            return;
        };
        if !is_valid_hostname(name) {
            debug!(name, "queried name is not a hostname, skipping write");
            return;
        }
        // An answer without a resolved address has nothing to key the mapping on.
        let Some(ip) = event
            .get_str(&self.config.resolved_ip)
            .filter(|ip| !ip.is_empty())
        else {
            debug!(path = %self.config.resolved_ip, "no resolved ip on event, skipping write");
            return;
        };

        if let Err(e) = self.cache.put(ip, name, self.config.ttl).await {
            warn!(ip, error = %e, "cache write failed, event passes through");
        }
    }
}
