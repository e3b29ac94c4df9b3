//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Typed events
//! - Monotonic counters
//!
//! Observability is read-only: it never changes coordinator behavior.
//!
//! ```ignore
//! use semisync::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::SwitchedOff, &[("reason", "wait_timeout")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
