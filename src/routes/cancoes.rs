use crate::app_state::AppState;
use crate::audit::{AuditContext, RequestContext};
use crate::models::api::{AttachRamo, AttachTag};
use crate::models::cancao::Cancao;
use crate::routes::{created, err, error_body, error_status, ok, ApiResult, StatusResult};
use chrono::Utc;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::json;

#[get("/cancoes")]
pub fn list_cancoes(ctx: RequestContext, state: &State<AppState>) -> ApiResult<Vec<Cancao>> {
    match state.cancoes.list() {
        Ok(cancoes) => {
            state.audit.info(
                &ctx,
                "Cancoes listed successfully",
                Some(
                    &AuditContext::new("ListCancoes", "cancoes")
                        .with_extra("count", json!(cancoes.len())),
                ),
            );
            ok(cancoes)
        }
        Err(e) => {
            state.audit.error(
                &ctx,
                "Error listing cancoes",
                &e,
                Some(&AuditContext::new("ListCancoes", "cancoes")),
            );
            err(Status::InternalServerError, "Error listing cancoes")
        }
    }
}

#[get("/cancoes/<id>")]
pub fn get_cancao(id: i64, ctx: RequestContext, state: &State<AppState>) -> ApiResult<Cancao> {
    let audit = AuditContext::new("GetCancao", "cancoes").with_resource_id(id);
    match state.cancoes.get_by_id(id) {
        Ok(Some(cancao)) => {
            state
                .audit
                .info(&ctx, "Cancao retrieved successfully", Some(&audit));
            ok(cancao)
        }
        Ok(None) => {
            state.audit.warn(&ctx, "Cancao not found", Some(&audit));
            err(Status::NotFound, "Cancao not found")
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error getting cancao", &e, Some(&audit));
            err(Status::InternalServerError, "Error getting cancao")
        }
    }
}

#[post("/cancoes", format = "json", data = "<cancao>")]
pub fn create_cancao(
    cancao: Json<Cancao>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<Cancao> {
    let audit = AuditContext::new("CreateCancao", "cancoes");
    let mut cancao = cancao.into_inner();

    if cancao.nome.is_empty() {
        state.audit.warn(&ctx, "Nome is required", Some(&audit));
        return err(Status::BadRequest, "Nome is required");
    }

    let now = Utc::now();
    cancao.created_at = now;
    cancao.updated_at = now;

    match state.cancoes.create(&cancao) {
        Ok(id) => {
            cancao.id = id;
            state.audit.info(
                &ctx,
                "Cancao created successfully",
                Some(&audit.with_resource_id(id)),
            );
            created(cancao)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error creating cancao", &e, Some(&audit));
            err(Status::InternalServerError, "Error creating cancao")
        }
    }
}

#[put("/cancoes/<id>", format = "json", data = "<update>")]
pub fn update_cancao(
    id: i64,
    update: Json<Cancao>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<Cancao> {
    let audit = AuditContext::new("UpdateCancao", "cancoes").with_resource_id(id);

    let mut existing = match state.cancoes.get_by_id(id) {
        Ok(Some(cancao)) => cancao,
        Ok(None) => {
            state.audit.warn(&ctx, "Cancao not found", Some(&audit));
            return err(Status::NotFound, "Cancao not found");
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error getting cancao", &e, Some(&audit));
            return err(Status::InternalServerError, "Error getting cancao");
        }
    };

    let update = update.into_inner();
    if update.nome.is_empty() {
        state.audit.warn(&ctx, "Nome is required", Some(&audit));
        return err(Status::BadRequest, "Nome is required");
    }

    existing.nome = update.nome;
    existing.link_youtube = update.link_youtube;
    existing.letra = update.letra;
    existing.updated_at = Utc::now();

    match state.cancoes.update(&existing) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Cancao updated successfully", Some(&audit));
            ok(existing)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error updating cancao", &e, Some(&audit));
            err(error_status(&e), "Error updating cancao")
        }
    }
}

#[delete("/cancoes/<id>")]
pub fn delete_cancao(id: i64, ctx: RequestContext, state: &State<AppState>) -> StatusResult {
    let audit = AuditContext::new("DeleteCancao", "cancoes").with_resource_id(id);
    match state.cancoes.delete(id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Cancao deleted successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error deleting cancao", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error deleting cancao"))
        }
    }
}

#[post("/cancoes/<id>/tags", format = "json", data = "<body>")]
pub fn add_tag(
    id: i64,
    body: Json<AttachTag>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("AddTagToCancao", "cancoes")
        .with_resource_id(id)
        .with_extra("tag_id", json!(body.tag_id));
    match state.cancoes.add_tag(id, body.tag_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Tag added to cancao successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error adding tag to cancao", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error adding tag to cancao"))
        }
    }
}

#[delete("/cancoes/<id>/tags/<tag_id>")]
pub fn remove_tag(
    id: i64,
    tag_id: i64,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("RemoveTagFromCancao", "cancoes")
        .with_resource_id(id)
        .with_extra("tag_id", json!(tag_id));
    match state.cancoes.remove_tag(id, tag_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Tag removed from cancao successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error removing tag from cancao", &e, Some(&audit));
            Err(error_body(
                error_status(&e),
                "Error removing tag from cancao",
            ))
        }
    }
}

#[post("/cancoes/<id>/ramos", format = "json", data = "<body>")]
pub fn add_ramo(
    id: i64,
    body: Json<AttachRamo>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("AddRamoToCancao", "cancoes")
        .with_resource_id(id)
        .with_extra("ramo_id", json!(body.ramo_id));
    match state.cancoes.add_ramo(id, body.ramo_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Ramo added to cancao successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error adding ramo to cancao", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error adding ramo to cancao"))
        }
    }
}

#[delete("/cancoes/<id>/ramos/<ramo_id>")]
pub fn remove_ramo(
    id: i64,
    ramo_id: i64,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("RemoveRamoFromCancao", "cancoes")
        .with_resource_id(id)
        .with_extra("ramo_id", json!(ramo_id));
    match state.cancoes.remove_ramo(id, ramo_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Ramo removed from cancao successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error removing ramo from cancao", &e, Some(&audit));
            Err(error_body(
                error_status(&e),
                "Error removing ramo from cancao",
            ))
        }
    }
}
