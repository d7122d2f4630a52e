use crate::app_state::AppState;
use crate::audit::{AuditContext, RequestContext};
use crate::models::api::NamePayload;
use crate::models::ramo::Ramo;
use crate::routes::{created, err, error_body, error_status, ok, ApiResult, StatusResult};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::json;

#[get("/ramos")]
pub fn list_ramos(ctx: RequestContext, state: &State<AppState>) -> ApiResult<Vec<Ramo>> {
    match state.ramos.list() {
        Ok(ramos) => {
            state.audit.info(
                &ctx,
                "Ramos listed successfully",
                Some(&AuditContext::new("ListRamos", "ramos").with_extra("count", json!(ramos.len()))),
            );
            ok(ramos)
        }
        Err(e) => {
            state.audit.error(
                &ctx,
                "Error listing ramos",
                &e,
                Some(&AuditContext::new("ListRamos", "ramos")),
            );
            err(Status::InternalServerError, "Error listing ramos")
        }
    }
}

#[post("/ramos", format = "json", data = "<body>")]
pub fn create_ramo(
    body: Json<NamePayload>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<serde_json::Value> {
    let audit = AuditContext::new("CreateRamo", "ramos");
    if body.name.is_empty() {
        state.audit.warn(&ctx, "Ramo name is required", Some(&audit));
        return err(Status::BadRequest, "Ramo name is required");
    }

    match state.ramos.create(&body.name) {
        Ok(id) => {
            state.audit.info(
                &ctx,
                "Ramo created successfully",
                Some(&audit.with_resource_id(id)),
            );
            created(json!({ "id": id, "name": body.name }))
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error creating ramo", &e, Some(&audit));
            err(Status::InternalServerError, "Error creating ramo")
        }
    }
}

#[delete("/ramos/<id>")]
pub fn delete_ramo(id: i64, ctx: RequestContext, state: &State<AppState>) -> StatusResult {
    let audit = AuditContext::new("DeleteRamo", "ramos").with_resource_id(id);
    match state.ramos.delete(id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Ramo deleted successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error deleting ramo", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error deleting ramo"))
        }
    }
}
