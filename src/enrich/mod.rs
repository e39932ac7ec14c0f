// src/enrich/mod.rs
mod annotator;
mod recorder;

pub use annotator::{AnnotatorConfig, EnrichmentAnnotator};
pub use recorder::{RecorderConfig, ResolutionRecorder};

/// Check that a candidate cache value is a plausible hostname: non-empty,
/// within DNS length limits, labels of alphanumerics, hyphens, and
/// underscores.
pub(crate) fn is_valid_hostname(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}
