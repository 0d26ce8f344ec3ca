//! # ragqa-telemetry
//!
//! Logging setup for ragqa.
//!
//! - [`init_telemetry`] installs human-readable output, [`init_json_telemetry`]
//!   structured JSON; both honor `RUST_LOG` and default to `info`.
//! - [`capture_subscriber`] builds a subscriber that records closed spans in
//!   a [`SpanStore`], for assertions in tests or in-process diagnostics.

pub mod capture;

pub use capture::{CapturedSpan, SpanCaptureLayer, SpanStore};

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    AlreadyInitialized(String),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global subscriber with human-readable output.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] if a global subscriber is
/// already set.
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    tracing::info!(service.name = service_name, "telemetry initialized");
    Ok(())
}

/// Install a global subscriber emitting one JSON object per event.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] if a global subscriber is
/// already set.
pub fn init_json_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_current_span(true))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    tracing::info!(service.name = service_name, "telemetry initialized");
    Ok(())
}

/// A subscriber that records every span into `store`.
///
/// Not installed globally; scope it with `tracing::subscriber::set_default`.
pub fn capture_subscriber(store: SpanStore) -> impl Subscriber + Send + Sync {
    tracing_subscriber::registry().with(SpanCaptureLayer::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, info_span};

    #[test]
    fn captures_spans_with_fields_and_events() {
        let store = SpanStore::new();
        let _guard = tracing::subscriber::set_default(capture_subscriber(store.clone()));

        let span = info_span!("rag.answer_query", query.id = "q-123", corpus.size = 3u64);
        span.in_scope(|| {
            info!("retrieval completed");
        });
        drop(span);

        let spans = store.by_name("rag.answer_query");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].attribute_str("query.id"), Some("q-123"));
        assert_eq!(spans[0].attributes.get("corpus.size"), Some(&serde_json::json!(3)));
        assert_eq!(spans[0].events, ["retrieval completed"]);
        assert!(spans[0].end_time >= spans[0].start_time);
    }

    #[test]
    fn children_inherit_query_id() {
        let store = SpanStore::new();
        let _guard = tracing::subscriber::set_default(capture_subscriber(store.clone()));

        let parent = info_span!("rag.answer_query", query.id = "q-7", model = "gpt-4o");
        parent.in_scope(|| {
            let child = info_span!("rag.retrieve");
            child.in_scope(|| {});
        });
        drop(parent);

        let spans = store.for_query("q-7");
        assert_eq!(spans.len(), 2);
        let child = spans.iter().find(|s| s.name == "rag.retrieve").unwrap();
        assert_eq!(child.attribute_str("model"), Some("gpt-4o"));
        assert!(child.parent_id.is_some());
    }

    #[test]
    fn store_can_be_cleared() {
        let store = SpanStore::new();
        let _guard = tracing::subscriber::set_default(capture_subscriber(store.clone()));
        info_span!("one").in_scope(|| {});
        assert_eq!(store.spans().len(), 1);
        store.clear();
        assert!(store.spans().is_empty());
    }
}
