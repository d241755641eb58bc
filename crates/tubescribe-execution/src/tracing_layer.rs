//! Custom tracing layer keeping recent log events in memory.
//!
//! The history is what a diagnostics view shows: the last N events with
//! their timestamp, level and the component prefix (`[Router]`, `[Bridge]`,
//! ...) taken from the message.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One captured event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LogRecord {
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    pub target: String,
    /// Component name from a leading `[Component]` prefix, if any.
    pub component: Option<String>,
    /// Message with the prefix removed.
    pub message: String,
    /// Structured fields other than the message.
    pub fields: HashMap<String, Value>,
}

/// Bounded, shareable buffer of [`LogRecord`]s. Oldest records are dropped
/// first once the capacity is reached.
#[derive(Clone)]
pub struct LogHistory {
    records: Arc<Mutex<VecDeque<LogRecord>>>,
    capacity: usize,
}

impl LogHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push(&self, record: LogRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Copy of the buffered records, oldest first.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns a layer feeding this history.
    pub fn layer(&self) -> LogHistoryLayer {
        LogHistoryLayer {
            history: self.clone(),
        }
    }
}

/// A tracing layer that records every event into a [`LogHistory`].
pub struct LogHistoryLayer {
    history: LogHistory,
}

impl<S> Layer<S> for LogHistoryLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        let mut visitor = FieldVisitor(&mut fields);
        event.record(&mut visitor);

        let raw = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let (component, message) = split_component(&raw);

        self.history.push(LogRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            component: component.map(str::to_string),
            message: message.to_string(),
            fields,
        });
    }
}

/// Splits `"[Router] Tab 5 closed"` into `(Some("Router"), "Tab 5 closed")`.
fn split_component(message: &str) -> (Option<&str>, &str) {
    message
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .filter(|(component, _)| !component.is_empty() && !component.contains(' '))
        .map_or((None, message), |(component, rest)| {
            (Some(component), rest.trim_start())
        })
}

/// Field visitor that extracts tracing event fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}
