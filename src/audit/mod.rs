mod db_sink;
mod metrics_sink;

pub use db_sink::DbAuditSink;
pub use metrics_sink::{HttpMetricsClient, MetricDatum, MetricUnit, MetricsAuditSink, MetricsClient};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error as StdError;

/// Severity of an audit entry, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request caller identity, filled in by the route layer from the
/// `x-request-id` and `x-user-id` headers. Missing or unparseable values
/// stay `None`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub user_id: Option<i64>,
}

impl RequestContext {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Structured context attached to an audit call: the audited action, the
/// resource family it touched, the specific resource id, and any free-form
/// extras. The three named fields are also written into the serialized
/// metadata map, so the stored shape matches what callers of the old
/// map-only API produced.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub action: Option<String>,
    pub resource: Option<String>,
    pub resource_id: Option<String>,
    pub extra: Map<String, Value>,
}

impl AuditContext {
    pub fn new(action: &str, resource: &str) -> Self {
        AuditContext {
            action: Some(action.to_string()),
            resource: Some(resource.to_string()),
            ..Default::default()
        }
    }

    pub fn with_resource_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Builds a context from a raw metadata map. String-valued `action`,
    /// `resource` and `resource_id` keys are promoted to the named fields;
    /// keys that are absent or hold non-string values leave the field empty.
    /// Every key, promoted or not, is kept in `extra`.
    pub fn from_metadata(metadata: Map<String, Value>) -> Self {
        let promote = |key: &str| -> Option<String> {
            match metadata.get(key) {
                Some(Value::String(s)) => Some(s.clone()),
                _ => None,
            }
        };

        AuditContext {
            action: promote("action"),
            resource: promote("resource"),
            resource_id: promote("resource_id"),
            extra: metadata,
        }
    }

    /// The serialized metadata map: the free-form extras with the named
    /// fields merged back in under their original keys.
    pub fn to_metadata(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        if let Some(action) = &self.action {
            map.insert("action".to_string(), Value::String(action.clone()));
        }
        if let Some(resource) = &self.resource {
            map.insert("resource".to_string(), Value::String(resource.clone()));
        }
        if let Some(resource_id) = &self.resource_id {
            map.insert("resource_id".to_string(), Value::String(resource_id.clone()));
        }
        map
    }
}

/// One audited event. Built fresh per logging call and handed to each sink;
/// never mutated afterwards. The originating error is reduced to its message
/// text here and is excluded from JSON serialization; only the database
/// sink persists it, as a plain text column.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip)]
    pub error_message: Option<String>,
}

impl LogEntry {
    pub fn new(
        service_name: &str,
        level: LogLevel,
        ctx: &RequestContext,
        message: &str,
        error: Option<&dyn StdError>,
        audit: Option<&AuditContext>,
    ) -> Self {
        LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            service_name: service_name.to_string(),
            request_id: ctx.request_id.clone(),
            user_id: ctx.user_id,
            action: audit.and_then(|a| a.action.clone()),
            resource: audit.and_then(|a| a.resource.clone()),
            resource_id: audit.and_then(|a| a.resource_id.clone()),
            metadata: audit.map(AuditContext::to_metadata),
            error_message: error.map(|e| e.to_string()),
        }
    }
}

/// Destination-agnostic audit capability. Implementations must swallow their
/// own failures: a logging call never aborts the business logic that made it.
pub trait AuditLogger: Send + Sync {
    fn debug(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>);
    fn info(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>);
    fn warn(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>);
    fn error(
        &self,
        ctx: &RequestContext,
        message: &str,
        error: &dyn StdError,
        audit: Option<&AuditContext>,
    );
    fn fatal(
        &self,
        ctx: &RequestContext,
        message: &str,
        error: &dyn StdError,
        audit: Option<&AuditContext>,
    );
}

/// Fans every call out to each configured sink, in order. Sinks handle their
/// own failures, so a broken sink never stops the ones after it.
pub struct CompositeLogger {
    sinks: Vec<Box<dyn AuditLogger>>,
}

impl CompositeLogger {
    pub fn new(sinks: Vec<Box<dyn AuditLogger>>) -> Self {
        CompositeLogger { sinks }
    }
}

impl AuditLogger for CompositeLogger {
    fn debug(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
        for sink in &self.sinks {
            sink.debug(ctx, message, audit);
        }
    }

    fn info(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
        for sink in &self.sinks {
            sink.info(ctx, message, audit);
        }
    }

    fn warn(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
        for sink in &self.sinks {
            sink.warn(ctx, message, audit);
        }
    }

    fn error(
        &self,
        ctx: &RequestContext,
        message: &str,
        error: &dyn StdError,
        audit: Option<&AuditContext>,
    ) {
        for sink in &self.sinks {
            sink.error(ctx, message, error, audit);
        }
    }

    fn fatal(
        &self,
        ctx: &RequestContext,
        message: &str,
        error: &dyn StdError,
        audit: Option<&AuditContext>,
    ) {
        for sink in &self.sinks {
            sink.fatal(ctx, message, error, audit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink {
        calls: Arc<AtomicUsize>,
    }

    impl AuditLogger for CountingSink {
        fn debug(&self, _: &RequestContext, _: &str, _: Option<&AuditContext>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
        fn info(&self, _: &RequestContext, _: &str, _: Option<&AuditContext>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
        fn warn(&self, _: &RequestContext, _: &str, _: Option<&AuditContext>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
        fn error(&self, _: &RequestContext, _: &str, _: &dyn StdError, _: Option<&AuditContext>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
        fn fatal(&self, _: &RequestContext, _: &str, _: &dyn StdError, _: Option<&AuditContext>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn from_metadata_promotes_string_keys() {
        let mut map = Map::new();
        map.insert("action".to_string(), json!("CreateUser"));
        map.insert("resource".to_string(), json!("users"));
        map.insert("resource_id".to_string(), json!("42"));
        map.insert("count".to_string(), json!(3));

        let audit = AuditContext::from_metadata(map);
        assert_eq!(audit.action.as_deref(), Some("CreateUser"));
        assert_eq!(audit.resource.as_deref(), Some("users"));
        assert_eq!(audit.resource_id.as_deref(), Some("42"));
        // Promoted keys stay in the map.
        assert_eq!(audit.extra.get("resource"), Some(&json!("users")));
        assert_eq!(audit.extra.get("count"), Some(&json!(3)));
    }

    #[test]
    fn from_metadata_ignores_non_string_and_absent_keys() {
        let mut map = Map::new();
        map.insert("resource".to_string(), json!(7));

        let audit = AuditContext::from_metadata(map);
        assert_eq!(audit.action, None);
        assert_eq!(audit.resource, None);
        assert_eq!(audit.resource_id, None);
        assert_eq!(audit.extra.get("resource"), Some(&json!(7)));
    }

    #[test]
    fn to_metadata_merges_named_fields_back() {
        let audit = AuditContext::new("GetLugar", "lugares")
            .with_resource_id(9)
            .with_extra("count", json!(2));

        let map = audit.to_metadata();
        assert_eq!(map.get("action"), Some(&json!("GetLugar")));
        assert_eq!(map.get("resource"), Some(&json!("lugares")));
        assert_eq!(map.get("resource_id"), Some(&json!("9")));
        assert_eq!(map.get("count"), Some(&json!(2)));
    }

    #[test]
    fn entry_without_audit_context_has_empty_derived_fields() {
        let entry = LogEntry::new(
            "geav-api",
            LogLevel::Info,
            &RequestContext::empty(),
            "hello",
            None,
            None,
        );
        assert_eq!(entry.action, None);
        assert_eq!(entry.resource, None);
        assert_eq!(entry.resource_id, None);
        assert_eq!(entry.metadata, None);
        assert_eq!(entry.error_message, None);
    }

    #[test]
    fn entry_json_omits_error_and_absent_fields() {
        let err = std::io::Error::other("boom");
        let entry = LogEntry::new(
            "geav-api",
            LogLevel::Error,
            &RequestContext::empty(),
            "failed",
            Some(&err),
            None,
        );
        assert_eq!(entry.error_message.as_deref(), Some("boom"));

        let value: Value = serde_json::to_value(&entry).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("level"), Some(&json!("ERROR")));
        assert!(!obj.contains_key("error_message"));
        assert!(!obj.contains_key("request_id"));
        assert!(!obj.contains_key("metadata"));
    }

    #[test]
    fn composite_calls_every_sink_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sinks: Vec<Box<dyn AuditLogger>> = (0..3)
            .map(|_| Box::new(CountingSink { calls: calls.clone() }) as Box<dyn AuditLogger>)
            .collect();
        let composite = CompositeLogger::new(sinks);

        let ctx = RequestContext::empty();
        composite.info(&ctx, "one", None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let err = std::io::Error::other("x");
        composite.error(&ctx, "two", &err, None);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn level_serializes_screaming() {
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"WARN\"");
        assert_eq!(LogLevel::Fatal.to_string(), "FATAL");
    }
}
