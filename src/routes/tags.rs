use crate::app_state::AppState;
use crate::audit::{AuditContext, AuditLogger, RequestContext};
use crate::models::api::NamePayload;
use crate::models::error::Result;
use crate::models::tag::{TagCancao, TagLugar};
use crate::repo::tag_repo::{TagRepo, TagRow};
use crate::routes::{created, err, error_body, error_status, ok, ApiResult, StatusResult};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::json;

fn list_catalog(
    repo: &TagRepo,
    resource: &str,
    ctx: &RequestContext,
    audit: &dyn AuditLogger,
) -> Result<Vec<TagRow>> {
    let tags = repo.list()?;
    audit.info(
        ctx,
        "Tags listed successfully",
        Some(&AuditContext::new("ListTags", resource).with_extra("count", json!(tags.len()))),
    );
    Ok(tags)
}

#[get("/tags/lugares")]
pub fn list_lugar_tags(ctx: RequestContext, state: &State<AppState>) -> ApiResult<Vec<TagLugar>> {
    match list_catalog(&state.lugar_tags, "tags_lugares", &ctx, state.audit.as_ref()) {
        Ok(tags) => ok(tags
            .into_iter()
            .map(|t| TagLugar {
                id: t.id,
                name: t.name,
                created_at: t.created_at,
            })
            .collect()),
        Err(e) => {
            state.audit.error(
                &ctx,
                "Error listing tags",
                &e,
                Some(&AuditContext::new("ListTags", "tags_lugares")),
            );
            err(Status::InternalServerError, "Error listing tags")
        }
    }
}

#[get("/tags/cancoes")]
pub fn list_cancao_tags(ctx: RequestContext, state: &State<AppState>) -> ApiResult<Vec<TagCancao>> {
    match list_catalog(&state.cancao_tags, "tags_cancoes", &ctx, state.audit.as_ref()) {
        Ok(tags) => ok(tags
            .into_iter()
            .map(|t| TagCancao {
                id: t.id,
                name: t.name,
                created_at: t.created_at,
            })
            .collect()),
        Err(e) => {
            state.audit.error(
                &ctx,
                "Error listing tags",
                &e,
                Some(&AuditContext::new("ListTags", "tags_cancoes")),
            );
            err(Status::InternalServerError, "Error listing tags")
        }
    }
}

fn create_in_catalog(
    repo: &TagRepo,
    resource: &str,
    name: &str,
    ctx: &RequestContext,
    audit: &dyn AuditLogger,
) -> ApiResult<serde_json::Value> {
    let details = AuditContext::new("CreateTag", resource);
    if name.is_empty() {
        audit.warn(ctx, "Tag name is required", Some(&details));
        return err(Status::BadRequest, "Tag name is required");
    }

    match repo.create(name) {
        Ok(id) => {
            audit.info(
                ctx,
                "Tag created successfully",
                Some(&details.with_resource_id(id)),
            );
            created(json!({ "id": id, "name": name }))
        }
        Err(e) => {
            audit.error(ctx, "Error creating tag", &e, Some(&details));
            err(Status::InternalServerError, "Error creating tag")
        }
    }
}

#[post("/tags/lugares", format = "json", data = "<body>")]
pub fn create_lugar_tag(
    body: Json<NamePayload>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<serde_json::Value> {
    create_in_catalog(
        &state.lugar_tags,
        "tags_lugares",
        &body.name,
        &ctx,
        state.audit.as_ref(),
    )
}

#[post("/tags/cancoes", format = "json", data = "<body>")]
pub fn create_cancao_tag(
    body: Json<NamePayload>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<serde_json::Value> {
    create_in_catalog(
        &state.cancao_tags,
        "tags_cancoes",
        &body.name,
        &ctx,
        state.audit.as_ref(),
    )
}

fn delete_from_catalog(
    repo: &TagRepo,
    resource: &str,
    id: i64,
    ctx: &RequestContext,
    audit: &dyn AuditLogger,
) -> StatusResult {
    let details = AuditContext::new("DeleteTag", resource).with_resource_id(id);
    match repo.delete(id) {
        Ok(()) => {
            audit.info(ctx, "Tag deleted successfully", Some(&details));
            Ok(Status::NoContent)
        }
        Err(e) => {
            audit.error(ctx, "Error deleting tag", &e, Some(&details));
            Err(error_body(error_status(&e), "Error deleting tag"))
        }
    }
}

#[delete("/tags/lugares/<id>")]
pub fn delete_lugar_tag(id: i64, ctx: RequestContext, state: &State<AppState>) -> StatusResult {
    delete_from_catalog(
        &state.lugar_tags,
        "tags_lugares",
        id,
        &ctx,
        state.audit.as_ref(),
    )
}

#[delete("/tags/cancoes/<id>")]
pub fn delete_cancao_tag(id: i64, ctx: RequestContext, state: &State<AppState>) -> StatusResult {
    delete_from_catalog(
        &state.cancao_tags,
        "tags_cancoes",
        id,
        &ctx,
        state.audit.as_ref(),
    )
}
