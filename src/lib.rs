// src/lib.rs
pub mod cache;
pub mod clock;
pub mod config;
pub mod enrich;
pub mod event;
pub mod telemetry;

pub use cache::{CacheError, DnsCache, MemcachedClient, MemoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use enrich::{AnnotatorConfig, EnrichmentAnnotator, RecorderConfig, ResolutionRecorder};
pub use event::Event;

// Re-export tracing for use in other modules
pub use tracing;
