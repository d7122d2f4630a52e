use super::{AuditContext, AuditLogger, LogEntry, LogLevel, RequestContext};
use crate::models::error::{ApiError, Result};
use crate::repo::db::Db;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Audit sink that persists each entry as a row in an audit table, creating
/// the table on first use. All failures are written to stderr and swallowed;
/// a logging call never fails the request that made it.
pub struct DbAuditSink {
    db: Db,
    service_name: String,
    table_name: String,
    table_ensured: AtomicBool,
}

impl DbAuditSink {
    pub fn new(db: Db, service_name: &str, table_name: &str) -> Self {
        DbAuditSink {
            db,
            service_name: service_name.to_string(),
            table_name: table_name.to_string(),
            table_ensured: AtomicBool::new(false),
        }
    }

    /// Creates the audit table if it does not exist. The ensured flag is only
    /// set on success, so a failed attempt is retried on the next call. Safe
    /// under concurrent first calls: the statement itself is idempotent.
    fn ensure_table(&self) -> Result<()> {
        if self.table_ensured.load(Ordering::Acquire) {
            return Ok(());
        }

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp     TEXT    NOT NULL,
                level         TEXT    NOT NULL,
                message       TEXT    NOT NULL,
                service_name  TEXT    NOT NULL,
                request_id    TEXT,
                user_id       INTEGER,
                action        TEXT,
                resource      TEXT,
                resource_id   TEXT,
                metadata      TEXT,
                error_message TEXT,
                created_at    TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            self.table_name
        );

        let conn = self.db.get()?;
        conn.execute_batch(&ddl)
            .map_err(|cause| ApiError::query("create audit table", cause))?;
        self.table_ensured.store(true, Ordering::Release);
        Ok(())
    }

    fn write(&self, entry: LogEntry) {
        if let Err(e) = self.ensure_table() {
            eprintln!("db audit sink: failed to ensure table {}: {}", self.table_name, e);
            return;
        }

        let metadata_json = match &entry.metadata {
            Some(map) => match serde_json::to_string(map) {
                Ok(json) => Some(json),
                Err(e) => {
                    eprintln!("db audit sink: failed to serialize metadata: {}", e);
                    return;
                }
            },
            None => None,
        };

        let insert = format!(
            "INSERT INTO {} (
                timestamp, level, message, service_name, request_id, user_id,
                action, resource, resource_id, metadata, error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            self.table_name
        );

        let conn = match self.db.get() {
            Ok(conn) => conn,
            Err(e) => {
                eprintln!("db audit sink: no database connection: {}", e);
                return;
            }
        };

        let result = conn.execute(
            &insert,
            rusqlite::params![
                entry.timestamp,
                entry.level.as_str(),
                entry.message,
                entry.service_name,
                entry.request_id,
                entry.user_id,
                entry.action,
                entry.resource,
                entry.resource_id,
                metadata_json,
                entry.error_message,
            ],
        );

        if let Err(e) = result {
            eprintln!("db audit sink: failed to insert entry: {}", e);
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

impl AuditLogger for DbAuditSink {
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
mod tests {
    use super::*;
    use crate::repo::db::Db;
    use serde_json::json;

    fn test_db() -> (Db, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        let db = Db::connect(path.to_str().unwrap()).unwrap();
        (db, dir)
    }

    fn row_count(db: &Db, table: &str) -> i64 {
        let conn = db.get().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn creates_table_and_inserts_entry() {
        let (db, _dir) = test_db();
        let sink = DbAuditSink::new(db.clone(), "geav-api", "api_logs");

        let ctx = RequestContext {
            request_id: Some("req-1".to_string()),
            user_id: Some(7),
        };
        sink.info(
            &ctx,
            "User created successfully",
            Some(&AuditContext::new("CreateUser", "users").with_resource_id(42)),
        );

        let conn = db.get().unwrap();
        let (level, message, request_id, user_id, action, resource, resource_id): (
            String,
            String,
            Option<String>,
            Option<i64>,
            Option<String>,
            Option<String>,
            Option<String>,
        ) = conn
            .query_row(
                "SELECT level, message, request_id, user_id, action, resource, resource_id
                 FROM api_logs",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .unwrap();

        assert_eq!(level, "INFO");
        assert_eq!(message, "User created successfully");
        assert_eq!(request_id.as_deref(), Some("req-1"));
        assert_eq!(user_id, Some(7));
        assert_eq!(action.as_deref(), Some("CreateUser"));
        assert_eq!(resource.as_deref(), Some("users"));
        assert_eq!(resource_id.as_deref(), Some("42"));
    }

    #[test]
    fn error_message_column_follows_error_argument() {
        let (db, _dir) = test_db();
        let sink = DbAuditSink::new(db.clone(), "geav-api", "api_logs");
        let ctx = RequestContext::empty();

        sink.info(&ctx, "no error here", None);
        let err = std::io::Error::other("context deadline exceeded");
        sink.error(&ctx, "boom", &err, None);

        let conn = db.get().unwrap();
        let no_error: Option<String> = conn
            .query_row(
                "SELECT error_message FROM api_logs WHERE message = 'no error here'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(no_error, None);

        let with_error: Option<String> = conn
            .query_row(
                "SELECT error_message FROM api_logs WHERE message = 'boom'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(with_error.as_deref(), Some("context deadline exceeded"));
    }

    #[test]
    fn metadata_column_is_null_when_context_absent() {
        let (db, _dir) = test_db();
        let sink = DbAuditSink::new(db.clone(), "geav-api", "api_logs");
        sink.info(&RequestContext::empty(), "bare", None);

        let conn = db.get().unwrap();
        let metadata: Option<String> = conn
            .query_row("SELECT metadata FROM api_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(metadata, None);
    }

    #[test]
    fn metadata_column_keeps_wire_shape() {
        let (db, _dir) = test_db();
        let sink = DbAuditSink::new(db.clone(), "geav-api", "api_logs");
        sink.warn(
            &RequestContext::empty(),
            "slow query",
            Some(&AuditContext::new("ListUsers", "users").with_extra("count", json!(12))),
        );

        let conn = db.get().unwrap();
        let metadata: String = conn
            .query_row("SELECT metadata FROM api_logs", [], |row| row.get(0))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&metadata).unwrap();
        assert_eq!(value["action"], json!("ListUsers"));
        assert_eq!(value["resource"], json!("users"));
        assert_eq!(value["count"], json!(12));
    }

    #[test]
    fn ensure_table_is_idempotent() {
        let (db, _dir) = test_db();
        let sink = DbAuditSink::new(db.clone(), "geav-api", "api_logs");
        let ctx = RequestContext::empty();

        for i in 0..5 {
            sink.info(&ctx, &format!("entry {}", i), None);
        }
        assert_eq!(row_count(&db, "api_logs"), 5);

        // A second sink against the same existing table must also succeed.
        let second = DbAuditSink::new(db.clone(), "geav-api", "api_logs");
        second.info(&ctx, "from second sink", None);
        assert_eq!(row_count(&db, "api_logs"), 6);
    }

    #[test]
    fn ensure_table_failure_surfaces_as_query_error() {
        let (db, _dir) = test_db();
        // A table name with a space makes the DDL itself invalid.
        let sink = DbAuditSink::new(db, "geav-api", "api logs");

        let err = sink.ensure_table().unwrap_err();
        assert!(matches!(
            err,
            crate::models::error::ApiError::Query { ref operation, .. }
                if operation == "create audit table"
        ));
    }

    #[test]
    fn fan_out_reaches_db_even_when_metrics_fail() {
        use super::super::metrics_sink::test_support::FailingClient;
        use super::super::{CompositeLogger, MetricsAuditSink};

        let (db, _dir) = test_db();
        let composite = CompositeLogger::new(vec![
            Box::new(MetricsAuditSink::new(
                Box::new(FailingClient),
                "geav-api",
                "Geav/Api",
            )),
            Box::new(DbAuditSink::new(db.clone(), "geav-api", "api_logs")),
        ]);

        let err = std::io::Error::other("context deadline exceeded");
        composite.error(
            &RequestContext::empty(),
            "boom",
            &err,
            Some(&AuditContext::new("CreateUser", "users").with_resource_id(42)),
        );

        let conn = db.get().unwrap();
        let (level, message, action, resource, resource_id, error_message): (
            String,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        ) = conn
            .query_row(
                "SELECT level, message, action, resource, resource_id, error_message
                 FROM api_logs",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .unwrap();

        assert_eq!(level, "ERROR");
        assert_eq!(message, "boom");
        assert_eq!(action.as_deref(), Some("CreateUser"));
        assert_eq!(resource.as_deref(), Some("users"));
        assert_eq!(resource_id.as_deref(), Some("42"));
        assert_eq!(error_message.as_deref(), Some("context deadline exceeded"));
    }

    #[test]
    fn concurrent_first_calls_all_land() {
        let (db, _dir) = test_db();
        let sink = std::sync::Arc::new(DbAuditSink::new(db.clone(), "geav-api", "api_logs"));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    sink.info(&RequestContext::empty(), &format!("thread {}", i), None);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(row_count(&db, "api_logs"), 4);
    }
}
