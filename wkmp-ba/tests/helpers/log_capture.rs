//! Log Capture Utilities for Testing
//!
//! Pipeline work runs on runtime worker and blocking threads, so capture
//! goes through one global subscriber shared by every test in the binary.
//! Tests assert on messages that contain their own temp paths.

use std::sync::{Arc, Mutex, OnceLock};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Captured log record
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Structured fields other than the message, as (name, value)
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    /// Value of the structured field `name`, if recorded
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Log capture layer for testing
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured log records
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Get all records whose message contains `pattern`
    pub fn records_matching(&self, pattern: &str) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.message.contains(pattern))
            .collect()
    }

    /// Get all messages containing `pattern`
    pub fn matching(&self, pattern: &str) -> Vec<String> {
        self.records()
            .iter()
            .filter(|r| r.message.contains(pattern))
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.matching(pattern).len()
    }

    /// Assert at least one message contains `pattern`
    pub fn assert_contains(&self, pattern: &str) {
        assert!(
            self.count_matching(pattern) > 0,
            "Expected log matching '{}', but none found",
            pattern
        );
    }

    /// Assert no message contains `pattern`
    pub fn assert_no_match(&self, pattern: &str) {
        let matches = self.matching(pattern);
        assert!(
            matches.is_empty(),
            "Expected no logs matching '{}', but found:\n{}",
            pattern,
            matches.join("\n")
        );
    }
}

impl<S> tracing_subscriber::Layer<S> for LogCapture
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        use tracing::field::Visit;

        struct RecordVisitor {
            message: String,
            fields: Vec<(String, String)>,
        }

        impl RecordVisitor {
            fn record(&mut self, field: &tracing::field::Field, value: String) {
                if field.name() == "message" {
                    self.message = value;
                } else {
                    self.fields.push((field.name().to_string(), value));
                }
            }
        }

        impl Visit for RecordVisitor {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                self.record(field, format!("{:?}", value));
            }

            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                self.record(field, value.to_string());
            }
        }

        let mut visitor = RecordVisitor {
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);

        self.records.lock().unwrap().push(LogRecord {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

static CAPTURE: OnceLock<LogCapture> = OnceLock::new();

/// Install the global capturing subscriber (once) and return its capture
pub fn init_test_logging() -> LogCapture {
    CAPTURE
        .get_or_init(|| {
            let capture = LogCapture::new();
            let _ = tracing_subscriber::registry()
                .with(tracing_subscriber::EnvFilter::new("wkmp_ba=debug"))
                .with(capture.clone())
                .try_init();
            capture
        })
        .clone()
}
