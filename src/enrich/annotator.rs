//! Enrichment annotator: looks up the destination IP of traffic events and
//! attaches the previously observed hostname on a cache hit.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::DnsCache;
use crate::event::Event;

/// Field paths and tag name for the enrichment annotator.
#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    /// Path of the destination IP, used as the cache lookup key.
    pub destination_ip: String,
    /// Path the hostname is written to on a hit.
    pub destination_dns: String,
    /// Tag appended to enriched events.
    pub enriched_tag: String,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            destination_ip: "destination.ip".to_string(),
            destination_dns: "destination.dns".to_string(),
            enriched_tag: "enriched".to_string(),
        }
    }
}

/// Second stage of the enrichment pipeline. A miss or cache failure leaves
/// the event entirely unmodified; enrichment is best-effort by design.
pub struct EnrichmentAnnotator<C: DnsCache> {
    cache: Arc<C>,
    config: AnnotatorConfig,
}

impl<C: DnsCache> EnrichmentAnnotator<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self::with_config(cache, AnnotatorConfig::default())
    }

    pub fn with_config(cache: Arc<C>, config: AnnotatorConfig) -> Self {
        Self { cache, config }
    }

    /// Process one traffic event: zero or one field write plus zero or one
    /// tag append, then the event is returned to the host.
    pub async fn enrich(&self, mut event: Event) -> Vec<Event> {
        let Some(ip) = event
            .get_str(&self.config.destination_ip)
            .map(str::to_string)
        else {
            debug!(path = %self.config.destination_ip, "no destination ip on event");
            return vec![event];
        };

        match self.cache.get(&ip).await {
            Ok(Some(hostname)) => {
                event.set(&self.config.destination_dns, Value::String(hostname));
                event.add_tag(&self.config.enriched_tag);
            }
            Ok(None) => {
                debug!(ip = %ip, "no cached resolution for destination");
            }
            Err(e) => {
                warn!(ip = %ip, error = %e, "cache read failed, event passes through");
            }
        }
        vec![event]
    }
}
