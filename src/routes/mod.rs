pub mod cancoes;
pub mod lugares;
pub mod ramos;
pub mod tags;
pub mod users;

use crate::audit::RequestContext;
use crate::models::api::ErrorResponse;
use crate::models::error::ApiError;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::response::status::Custom;
use rocket::serde::json::Json;

/// Every handler returns a status-wrapped JSON body on both paths.
pub type ApiResult<T> = std::result::Result<Custom<Json<T>>, Custom<Json<ErrorResponse>>>;

/// Handlers with no success body (deletes, attach/detach) still answer
/// failures with the uniform error JSON.
pub type StatusResult = std::result::Result<Status, Custom<Json<ErrorResponse>>>;

pub fn ok<T>(value: T) -> ApiResult<T> {
    Ok(Custom(Status::Ok, Json(value)))
}

pub fn created<T>(value: T) -> ApiResult<T> {
    Ok(Custom(Status::Created, Json(value)))
}

pub fn error_body(status: Status, message: &str) -> Custom<Json<ErrorResponse>> {
    Custom(status, Json(ErrorResponse::new(message)))
}

pub fn err<T>(status: Status, message: &str) -> ApiResult<T> {
    Err(error_body(status, message))
}

/// Status for a repository failure that reached the handler. A missing row
/// is the caller's 404; everything else is a 500.
pub fn error_status(error: &ApiError) -> Status {
    match error {
        ApiError::NotFound { .. } => Status::NotFound,
        _ => Status::InternalServerError,
    }
}

/// Caller identity forwarded by the gateway. Both headers are optional and
/// matched case-insensitively; an unparseable user id is treated as absent.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestContext {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let request_id = req
            .headers()
            .get_one("x-request-id")
            .map(|v| v.to_string());
        let user_id = req
            .headers()
            .get_one("x-user-id")
            .and_then(|v| v.parse().ok());

        Outcome::Success(RequestContext {
            request_id,
            user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::app_state::AppState;
    use crate::audit::{AuditContext, AuditLogger, RequestContext};
    use crate::repo::db::test_support::test_db;
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::blocking::Client;
    use std::error::Error as StdError;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct RecordedCall {
        level: &'static str,
        message: String,
        request_id: Option<String>,
        user_id: Option<i64>,
        action: Option<String>,
    }

    #[derive(Default)]
    struct RecordingLogger {
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl RecordingLogger {
        fn record(
            &self,
            level: &'static str,
            ctx: &RequestContext,
            message: &str,
            audit: Option<&AuditContext>,
        ) {
            self.calls.lock().unwrap().push(RecordedCall {
                level,
                message: message.to_string(),
                request_id: ctx.request_id.clone(),
                user_id: ctx.user_id,
                action: audit.and_then(|a| a.action.clone()),
            });
        }
    }

    impl AuditLogger for RecordingLogger {
        fn debug(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
            self.record("DEBUG", ctx, message, audit);
        }
        fn info(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
            self.record("INFO", ctx, message, audit);
        }
        fn warn(&self, ctx: &RequestContext, message: &str, audit: Option<&AuditContext>) {
            self.record("WARN", ctx, message, audit);
        }
        fn error(
            &self,
            ctx: &RequestContext,
            message: &str,
            _error: &dyn StdError,
            audit: Option<&AuditContext>,
        ) {
            self.record("ERROR", ctx, message, audit);
        }
        fn fatal(
            &self,
            ctx: &RequestContext,
            message: &str,
            _error: &dyn StdError,
            audit: Option<&AuditContext>,
        ) {
            self.record("FATAL", ctx, message, audit);
        }
    }

    fn test_client(logger: Arc<RecordingLogger>) -> (Client, tempfile::TempDir) {
        let (db, dir) = test_db();
        let state = AppState::new(db, logger);
        let rocket = rocket::build().manage(state).mount(
            "/",
            routes![
                crate::routes::users::list_users,
                crate::routes::users::get_user,
                crate::routes::users::create_user,
                crate::routes::users::update_user,
                crate::routes::users::delete_user,
                crate::routes::lugares::get_lugar,
                crate::routes::lugares::create_lugar,
                crate::routes::lugares::add_rating,
            ],
        );
        (Client::tracked(rocket).unwrap(), dir)
    }

    #[test]
    fn user_crud_over_http() {
        let logger = Arc::new(RecordingLogger::default());
        let (client, _dir) = test_client(logger);

        let response = client
            .post("/users")
            .header(ContentType::JSON)
            .body(r#"{"username":"akela","password":"hunter2","role":"write"}"#)
            .dispatch();
        assert_eq!(response.status(), Status::Created);
        let body = response.into_string().unwrap();
        assert!(body.contains("\"username\":\"akela\""));
        assert!(!body.contains("password"));
        let id: i64 = serde_json::from_str::<serde_json::Value>(&body).unwrap()["id"]
            .as_i64()
            .unwrap();

        let response = client.get(format!("/users/{}", id)).dispatch();
        assert_eq!(response.status(), Status::Ok);

        let response = client.delete(format!("/users/{}", id)).dispatch();
        assert_eq!(response.status(), Status::NoContent);

        let response = client.get(format!("/users/{}", id)).dispatch();
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn failed_delete_carries_error_body() {
        let logger = Arc::new(RecordingLogger::default());
        let (client, _dir) = test_client(logger.clone());

        let response = client.delete("/users/999").dispatch();
        assert_eq!(response.status(), Status::NotFound);
        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().unwrap()).unwrap();
        assert_eq!(body["error"], serde_json::json!("Error deleting user"));

        let calls = logger.calls.lock().unwrap();
        assert_eq!(calls.last().unwrap().level, "ERROR");
        assert_eq!(calls.last().unwrap().action.as_deref(), Some("DeleteUser"));
    }

    #[test]
    fn invalid_user_data_is_bad_request() {
        let logger = Arc::new(RecordingLogger::default());
        let (client, _dir) = test_client(logger.clone());

        let response = client
            .post("/users")
            .header(ContentType::JSON)
            .body(r#"{"username":"akela","password":"x","role":"admin"}"#)
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
        assert!(response.into_string().unwrap().contains("Invalid user data"));

        let calls = logger.calls.lock().unwrap();
        assert_eq!(calls.last().unwrap().level, "WARN");
        assert_eq!(calls.last().unwrap().action.as_deref(), Some("CreateUser"));
    }

    #[test]
    fn caller_headers_reach_the_audit_log() {
        let logger = Arc::new(RecordingLogger::default());
        let (client, _dir) = test_client(logger.clone());

        let response = client
            .get("/users/1")
            .header(Header::new("X-Request-Id", "req-77"))
            .header(Header::new("X-User-Id", "12"))
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);

        let calls = logger.calls.lock().unwrap();
        let call = calls.last().unwrap();
        assert_eq!(call.request_id.as_deref(), Some("req-77"));
        assert_eq!(call.user_id, Some(12));
        assert_eq!(call.message, "User not found");
    }

    #[test]
    fn unparseable_user_id_header_is_absent() {
        let logger = Arc::new(RecordingLogger::default());
        let (client, _dir) = test_client(logger.clone());

        client
            .get("/users/1")
            .header(Header::new("x-user-id", "not-a-number"))
            .dispatch();

        let calls = logger.calls.lock().unwrap();
        assert_eq!(calls.last().unwrap().user_id, None);
    }

    #[test]
    fn rating_validation_rejects_out_of_range() {
        let logger = Arc::new(RecordingLogger::default());
        let (client, _dir) = test_client(logger);

        let response = client
            .post("/lugares")
            .header(ContentType::JSON)
            .body(r#"{"nome_local":"Sede"}"#)
            .dispatch();
        assert_eq!(response.status(), Status::Created);

        let response = client
            .post("/lugares/1/ratings")
            .header(ContentType::JSON)
            .body(r#"{"lugar_id":1,"user_id":1,"rating":6}"#)
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post("/lugares/1/ratings")
            .header(ContentType::JSON)
            .body(r#"{"lugar_id":1,"user_id":1,"rating":4}"#)
            .dispatch();
        assert_eq!(response.status(), Status::Created);

        let response = client.get("/lugares/1").dispatch();
        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().unwrap()).unwrap();
        assert_eq!(body["average_rating"], serde_json::json!(4.0));
        assert_eq!(body["rating_count"], serde_json::json!(1));
    }
}
