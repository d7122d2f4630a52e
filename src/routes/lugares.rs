use crate::app_state::AppState;
use crate::audit::{AuditContext, RequestContext};
use crate::models::api::{AttachRamo, AttachTag};
use crate::models::lugar::{Lugar, LugarImage, LugarRating};
use crate::routes::{created, err, error_body, error_status, ok, ApiResult, StatusResult};
use chrono::Utc;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::json;

#[get("/lugares")]
pub fn list_lugares(ctx: RequestContext, state: &State<AppState>) -> ApiResult<Vec<Lugar>> {
    match state.lugares.list() {
        Ok(lugares) => {
            state.audit.info(
                &ctx,
                "Lugares listed successfully",
                Some(
                    &AuditContext::new("ListLugares", "lugares")
                        .with_extra("count", json!(lugares.len())),
                ),
            );
            ok(lugares)
        }
        Err(e) => {
            state.audit.error(
                &ctx,
                "Error listing lugares",
                &e,
                Some(&AuditContext::new("ListLugares", "lugares")),
            );
            err(Status::InternalServerError, "Error listing lugares")
        }
    }
}

#[get("/lugares/<id>")]
pub fn get_lugar(id: i64, ctx: RequestContext, state: &State<AppState>) -> ApiResult<Lugar> {
    let audit = AuditContext::new("GetLugar", "lugares").with_resource_id(id);
    match state.lugares.get_by_id(id) {
        Ok(Some(lugar)) => {
            state
                .audit
                .info(&ctx, "Lugar retrieved successfully", Some(&audit));
            ok(lugar)
        }
        Ok(None) => {
            state.audit.warn(&ctx, "Lugar not found", Some(&audit));
            err(Status::NotFound, "Lugar not found")
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error getting lugar", &e, Some(&audit));
            err(Status::InternalServerError, "Error getting lugar")
        }
    }
}

#[post("/lugares", format = "json", data = "<lugar>")]
pub fn create_lugar(
    lugar: Json<Lugar>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<Lugar> {
    let audit = AuditContext::new("CreateLugar", "lugares");
    let mut lugar = lugar.into_inner();

    if lugar.nome_local.is_empty() {
        state.audit.warn(&ctx, "Nome local is required", Some(&audit));
        return err(Status::BadRequest, "Nome local is required");
    }

    let now = Utc::now();
    lugar.created_at = now;
    lugar.updated_at = now;

    match state.lugares.create(&lugar) {
        Ok(id) => {
            lugar.id = id;
            state.audit.info(
                &ctx,
                "Lugar created successfully",
                Some(&audit.with_resource_id(id)),
            );
            created(lugar)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error creating lugar", &e, Some(&audit));
            err(Status::InternalServerError, "Error creating lugar")
        }
    }
}

#[put("/lugares/<id>", format = "json", data = "<update>")]
pub fn update_lugar(
    id: i64,
    update: Json<Lugar>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<Lugar> {
    let audit = AuditContext::new("UpdateLugar", "lugares").with_resource_id(id);

    let mut existing = match state.lugares.get_by_id(id) {
        Ok(Some(lugar)) => lugar,
        Ok(None) => {
            state.audit.warn(&ctx, "Lugar not found", Some(&audit));
            return err(Status::NotFound, "Lugar not found");
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error getting lugar", &e, Some(&audit));
            return err(Status::InternalServerError, "Error getting lugar");
        }
    };

    let update = update.into_inner();
    if update.nome_local.is_empty() {
        state.audit.warn(&ctx, "Nome local is required", Some(&audit));
        return err(Status::BadRequest, "Nome local is required");
    }

    existing.nome_local = update.nome_local;
    existing.nome_dono_local = update.nome_dono_local;
    existing.telefone_para_contato = update.telefone_para_contato;
    existing.link_google_maps = update.link_google_maps;
    existing.link_site = update.link_site;
    existing.endereco_completo = update.endereco_completo;
    existing.local_publico = update.local_publico;
    existing.valor_fixo = update.valor_fixo;
    existing.valor_individual = update.valor_individual;
    existing.updated_at = Utc::now();

    match state.lugares.update(&existing) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Lugar updated successfully", Some(&audit));
            ok(existing)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error updating lugar", &e, Some(&audit));
            err(error_status(&e), "Error updating lugar")
        }
    }
}

#[delete("/lugares/<id>")]
pub fn delete_lugar(id: i64, ctx: RequestContext, state: &State<AppState>) -> StatusResult {
    let audit = AuditContext::new("DeleteLugar", "lugares").with_resource_id(id);
    match state.lugares.delete(id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Lugar deleted successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error deleting lugar", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error deleting lugar"))
        }
    }
}

// ----------------------------------------------------------------------
// Images
// ----------------------------------------------------------------------

#[post("/lugares/<id>/images", format = "json", data = "<image>")]
pub fn add_image(
    id: i64,
    image: Json<LugarImage>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<LugarImage> {
    let audit = AuditContext::new("AddImageToLugar", "lugares").with_resource_id(id);
    let mut image = image.into_inner();
    image.lugar_id = id;
    image.created_at = Utc::now();

    match state.lugares.add_image(&image) {
        Ok(image_id) => {
            image.id = image_id;
            state.audit.info(
                &ctx,
                "Image added to lugar successfully",
                Some(&audit.with_extra("image_id", json!(image_id))),
            );
            created(image)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error adding image to lugar", &e, Some(&audit));
            err(Status::InternalServerError, "Error adding image to lugar")
        }
    }
}

#[delete("/lugares/<id>/images/<image_id>")]
pub fn delete_image(
    id: i64,
    image_id: i64,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("DeleteImageFromLugar", "lugares")
        .with_resource_id(id)
        .with_extra("image_id", json!(image_id));
    match state.lugares.delete_image(image_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Image deleted from lugar successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error deleting image from lugar", &e, Some(&audit));
            Err(error_body(
                error_status(&e),
                "Error deleting image from lugar",
            ))
        }
    }
}

// ----------------------------------------------------------------------
// Tags
// ----------------------------------------------------------------------

#[post("/lugares/<id>/tags", format = "json", data = "<body>")]
pub fn add_tag(
    id: i64,
    body: Json<AttachTag>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("AddTagToLugar", "lugares")
        .with_resource_id(id)
        .with_extra("tag_id", json!(body.tag_id));
    match state.lugares.add_tag(id, body.tag_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Tag added to lugar successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error adding tag to lugar", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error adding tag to lugar"))
        }
    }
}

#[delete("/lugares/<id>/tags/<tag_id>")]
pub fn remove_tag(
    id: i64,
    tag_id: i64,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("RemoveTagFromLugar", "lugares")
        .with_resource_id(id)
        .with_extra("tag_id", json!(tag_id));
    match state.lugares.remove_tag(id, tag_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Tag removed from lugar successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error removing tag from lugar", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error removing tag from lugar"))
        }
    }
}

// ----------------------------------------------------------------------
// Ramos
// ----------------------------------------------------------------------

#[post("/lugares/<id>/ramos", format = "json", data = "<body>")]
pub fn add_ramo(
    id: i64,
    body: Json<AttachRamo>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("AddRamoToLugar", "lugares")
        .with_resource_id(id)
        .with_extra("ramo_id", json!(body.ramo_id));
    match state.lugares.add_ramo(id, body.ramo_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Ramo added to lugar successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error adding ramo to lugar", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error adding ramo to lugar"))
        }
    }
}

#[delete("/lugares/<id>/ramos/<ramo_id>")]
pub fn remove_ramo(
    id: i64,
    ramo_id: i64,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("RemoveRamoFromLugar", "lugares")
        .with_resource_id(id)
        .with_extra("ramo_id", json!(ramo_id));
    match state.lugares.remove_ramo(id, ramo_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Ramo removed from lugar successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error removing ramo from lugar", &e, Some(&audit));
            Err(error_body(
                error_status(&e),
                "Error removing ramo from lugar",
            ))
        }
    }
}

// ----------------------------------------------------------------------
// Ratings
// ----------------------------------------------------------------------

#[get("/lugares/<id>/ratings")]
pub fn get_ratings(
    id: i64,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<Vec<LugarRating>> {
    let audit = AuditContext::new("GetRatingsForLugar", "lugares").with_resource_id(id);
    match state.lugares.get_ratings(id) {
        Ok(ratings) => {
            state.audit.info(
                &ctx,
                "Ratings retrieved for lugar successfully",
                Some(&audit.with_extra("count", json!(ratings.len()))),
            );
            ok(ratings)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error getting ratings for lugar", &e, Some(&audit));
            err(Status::InternalServerError, "Error getting ratings for lugar")
        }
    }
}

#[post("/lugares/<id>/ratings", format = "json", data = "<rating>")]
pub fn add_rating(
    id: i64,
    rating: Json<LugarRating>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<LugarRating> {
    let audit = AuditContext::new("AddRatingToLugar", "lugares").with_resource_id(id);
    let mut rating = rating.into_inner();

    if !(1..=5).contains(&rating.rating) {
        state.audit.warn(
            &ctx,
            "Invalid rating value",
            Some(&audit.with_extra("rating", json!(rating.rating))),
        );
        return err(Status::BadRequest, "Rating must be between 1 and 5");
    }

    rating.lugar_id = id;
    rating.date = Utc::now();

    match state.lugares.add_rating(&rating) {
        Ok(rating_id) => {
            rating.id = rating_id;
            state.audit.info(
                &ctx,
                "Rating added to lugar successfully",
                Some(
                    &audit
                        .with_extra("rating_id", json!(rating_id))
                        .with_extra("rating", json!(rating.rating)),
                ),
            );
            created(rating)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error adding rating to lugar", &e, Some(&audit));
            err(Status::InternalServerError, "Error adding rating to lugar")
        }
    }
}

#[put("/lugares/<id>/ratings/<rating_id>", format = "json", data = "<rating>")]
pub fn update_rating(
    id: i64,
    rating_id: i64,
    rating: Json<LugarRating>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<LugarRating> {
    let audit = AuditContext::new("UpdateRatingForLugar", "lugares")
        .with_resource_id(id)
        .with_extra("rating_id", json!(rating_id));
    let mut rating = rating.into_inner();

    if !(1..=5).contains(&rating.rating) {
        state.audit.warn(
            &ctx,
            "Invalid rating value",
            Some(&audit.with_extra("rating", json!(rating.rating))),
        );
        return err(Status::BadRequest, "Rating must be between 1 and 5");
    }

    rating.id = rating_id;
    rating.lugar_id = id;
    rating.date = Utc::now();

    match state.lugares.update_rating(&rating) {
        Ok(()) => {
            state.audit.info(
                &ctx,
                "Rating updated for lugar successfully",
                Some(&audit.with_extra("rating", json!(rating.rating))),
            );
            ok(rating)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error updating rating for lugar", &e, Some(&audit));
            err(error_status(&e), "Error updating rating for lugar")
        }
    }
}

#[delete("/lugares/<id>/ratings/<rating_id>")]
pub fn delete_rating(
    id: i64,
    rating_id: i64,
    ctx: RequestContext,
    state: &State<AppState>,
) -> StatusResult {
    let audit = AuditContext::new("DeleteRatingFromLugar", "lugares")
        .with_resource_id(id)
        .with_extra("rating_id", json!(rating_id));
    match state.lugares.delete_rating(rating_id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "Rating deleted from lugar successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error deleting rating from lugar", &e, Some(&audit));
            Err(error_body(
                error_status(&e),
                "Error deleting rating from lugar",
            ))
        }
    }
}
