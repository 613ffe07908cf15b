//! Domain event trait.

use chrono::{DateTime, Utc};

/// A domain fact emitted by an aggregate.
///
/// Events are immutable and carry a stable type name for logging and
/// downstream integrations.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "purchasing.request.sent").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
