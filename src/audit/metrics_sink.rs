use super::{AuditContext, AuditLogger, LogEntry, LogLevel, RequestContext};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error as StdError;
use std::time::Duration;

/// Unit attached to a metric datum. Audit metrics are pure occurrence
/// counters, but the wire shape carries the unit explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricUnit {
    Count,
}

/// One datum pushed to the metrics service.
#[derive(Debug, Clone, Serialize)]
pub struct MetricDatum {
    pub metric_name: String,
    pub dimensions: Vec<(String, String)>,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: MetricUnit,
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("metrics service rejected datum: {0}")]
    Rejected(String),
}

/// Transport for metric data. The production implementation pushes over
/// HTTP; tests substitute a recorder.
pub trait MetricsClient: Send + Sync {
    fn put_metric(&self, namespace: &str, datum: &MetricDatum) -> Result<(), MetricsError>;
}

/// Pushes metric data to an HTTP collector as JSON.
pub struct HttpMetricsClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct PutMetricRequest<'a> {
    namespace: &'a str,
    #[serde(flatten)]
    datum: &'a MetricDatum,
}

impl HttpMetricsClient {
    pub fn new(endpoint: &str) -> Result<Self, MetricsError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        Ok(HttpMetricsClient {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl MetricsClient for HttpMetricsClient {
    fn put_metric(&self, namespace: &str, datum: &MetricDatum) -> Result<(), MetricsError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PutMetricRequest { namespace, datum })
            .send()?;

        if !response.status().is_success() {
            return Err(MetricsError::Rejected(response.status().to_string()));
        }
        Ok(())
    }
}

/// Audit sink that emits one count metric per entry, dimensioned by service
/// name and, when present, resource and action, and mirrors the entry as one
/// JSON line on stdout for local visibility. Client failures go to stderr
/// and are swallowed.
pub struct MetricsAuditSink {
    client: Box<dyn MetricsClient>,
    service_name: String,
    namespace: String,
}

impl MetricsAuditSink {
    pub fn new(client: Box<dyn MetricsClient>, service_name: &str, namespace: &str) -> Self {
        MetricsAuditSink {
            client,
            service_name: service_name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// `{LEVEL}_{resource}`, or just `{LEVEL}` when the entry carries no
    /// resource.
    fn metric_name(entry: &LogEntry) -> String {
        match entry.resource.as_deref() {
            Some(resource) if !resource.is_empty() => {
                format!("{}_{}", entry.level, resource)
            }
            _ => entry.level.to_string(),
        }
    }

    fn datum_for(&self, entry: &LogEntry) -> MetricDatum {
        let mut dimensions = vec![("ServiceName".to_string(), self.service_name.clone())];
        if let Some(resource) = entry.resource.as_deref().filter(|r| !r.is_empty()) {
            dimensions.push(("Resource".to_string(), resource.to_string()));
        }
        if let Some(action) = entry.action.as_deref().filter(|a| !a.is_empty()) {
            dimensions.push(("Action".to_string(), action.to_string()));
        }

        MetricDatum {
            metric_name: Self::metric_name(entry),
            dimensions,
            timestamp: entry.timestamp,
            value: 1.0,
            unit: MetricUnit::Count,
        }
    }

    fn write(&self, entry: LogEntry) {
        let datum = self.datum_for(&entry);
        if let Err(e) = self.client.put_metric(&self.namespace, &datum) {
            eprintln!("metrics audit sink: failed to put metric {}: {}", datum.metric_name, e);
        }

        // The serialized entry carries no error field, only structured data.
        match serde_json::to_string(&entry) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("metrics audit sink: failed to serialize entry: {}", e),
        }
    }

    fn entry(
        &self,
        level: LogLevel,
        ctx: &RequestContext,
        message: &str,
        error: Option<&dyn StdError>,
        audit: Option<&AuditContext>,
    ) -> LogEntry {
        LogEntry::new(&self.service_name, level, ctx, message, error, audit)
    }
}

impl AuditLogger for MetricsAuditSink {
    fn debug(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
        self.write(self.entry(LogLevel::Debug, ctx, message, None, audit));
    }

    fn info(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
        self.write(self.entry(LogLevel::Info, ctx, message, None, audit));
    }

    fn warn(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
        self.write(self.entry(LogLevel::Warn, ctx, message, None, audit));
    }

    fn error(
        &self,
        ctx: &RequestContext,
        message: &str,
        error: &dyn StdError,
        audit: Option<&AuditContext>,
    ) {
        self.write(self.entry(LogLevel::Error, ctx, message, Some(error), audit));
    }

    fn fatal(
        &self,
        ctx: &RequestContext,
        message: &str,
        error: &dyn StdError,
        audit: Option<&AuditContext>,
    ) {
        self.write(self.entry(LogLevel::Fatal, ctx, message, Some(error), audit));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every datum it receives.
    #[derive(Clone, Default)]
    pub struct RecordingClient {
        pub data: Arc<Mutex<Vec<(String, MetricDatum)>>>,
    }

    impl MetricsClient for RecordingClient {
        fn put_metric(&self, namespace: &str, datum: &MetricDatum) -> Result<(), MetricsError> {
            self.data
                .lock()
                .unwrap()
                .push((namespace.to_string(), datum.clone()));
            Ok(())
        }
    }

    /// Fails every call, standing in for an unreachable metrics service.
    pub struct FailingClient;

    impl MetricsClient for FailingClient {
        fn put_metric(&self, _: &str, _: &MetricDatum) -> Result<(), MetricsError> {
            Err(MetricsError::Rejected("503 Service Unavailable".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{FailingClient, RecordingClient};
    use super::*;

    fn dimension<'a>(datum: &'a MetricDatum, name: &str) -> Option<&'a str> {
        datum
            .dimensions
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn emits_one_counter_per_call_with_all_dimensions() {
        let client = RecordingClient::default();
        let sink = MetricsAuditSink::new(Box::new(client.clone()), "geav-api", "Geav/Api");

        let err = std::io::Error::other("db down");
        sink.error(
            &RequestContext::empty(),
            "Error creating user",
            &err,
            Some(&AuditContext::new("CreateUser", "users").with_resource_id(42)),
        );

        let data = client.data.lock().unwrap();
        assert_eq!(data.len(), 1);
        let (namespace, datum) = &data[0];
        assert_eq!(namespace, "Geav/Api");
        assert_eq!(datum.metric_name, "ERROR_users");
        assert_eq!(datum.value, 1.0);
        assert_eq!(datum.unit, MetricUnit::Count);
        assert_eq!(dimension(datum, "ServiceName"), Some("geav-api"));
        assert_eq!(dimension(datum, "Resource"), Some("users"));
        assert_eq!(dimension(datum, "Action"), Some("CreateUser"));
    }

    #[test]
    fn metric_name_degrades_to_level_without_resource() {
        let client = RecordingClient::default();
        let sink = MetricsAuditSink::new(Box::new(client.clone()), "geav-api", "Geav/Api");

        sink.info(&RequestContext::empty(), "startup complete", None);

        let data = client.data.lock().unwrap();
        let (_, datum) = &data[0];
        assert_eq!(datum.metric_name, "INFO");
        assert_eq!(datum.dimensions.len(), 1);
        assert_eq!(dimension(datum, "ServiceName"), Some("geav-api"));
    }

    #[test]
    fn failing_client_does_not_panic_or_propagate() {
        let sink = MetricsAuditSink::new(Box::new(FailingClient), "geav-api", "Geav/Api");
        let err = std::io::Error::other("boom");
        sink.fatal(&RequestContext::empty(), "unreachable service", &err, None);
    }
}
