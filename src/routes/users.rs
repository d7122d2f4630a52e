use crate::app_state::AppState;
use crate::audit::{AuditContext, RequestContext};
use crate::models::user::{is_valid_role, User};
use crate::routes::{created, err, error_body, error_status, ok, ApiResult, StatusResult};
use chrono::Utc;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::json;

#[get("/users")]
pub fn list_users(ctx: RequestContext, state: &State<AppState>) -> ApiResult<Vec<User>> {
    match state.users.list() {
        Ok(users) => {
            state.audit.info(
                &ctx,
                "Users listed successfully",
                Some(
                    &AuditContext::new("ListUsers", "users").with_extra("count", json!(users.len())),
                ),
            );
            ok(users)
        }
        Err(e) => {
            state.audit.error(
                &ctx,
                "Error listing users",
                &e,
                Some(&AuditContext::new("ListUsers", "users")),
            );
            err(Status::InternalServerError, "Error listing users")
        }
    }
}

#[get("/users/<id>")]
pub fn get_user(id: i64, ctx: RequestContext, state: &State<AppState>) -> ApiResult<User> {
    let audit = AuditContext::new("GetUser", "users").with_resource_id(id);
    match state.users.get_by_id(id) {
        Ok(Some(user)) => {
            state
                .audit
                .info(&ctx, "User retrieved successfully", Some(&audit));
            ok(user)
        }
        Ok(None) => {
            state.audit.warn(&ctx, "User not found", Some(&audit));
            err(Status::NotFound, "User not found")
        }
        Err(e) => {
            state.audit.error(&ctx, "Error getting user", &e, Some(&audit));
            err(Status::InternalServerError, "Error getting user")
        }
    }
}

#[post("/users", format = "json", data = "<user>")]
pub fn create_user(
    user: Json<User>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<User> {
    let audit = AuditContext::new("CreateUser", "users");
    let mut user = user.into_inner();

    if user.username.is_empty() || user.password.is_empty() || !is_valid_role(&user.role) {
        state.audit.warn(&ctx, "Invalid user data", Some(&audit));
        return err(Status::BadRequest, "Invalid user data");
    }

    let now = Utc::now();
    user.created_at = now;
    user.updated_at = now;

    match state.users.create(&user) {
        Ok(id) => {
            user.id = id;
            state.audit.info(
                &ctx,
                "User created successfully",
                Some(&audit.with_resource_id(id)),
            );
            created(user)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error creating user", &e, Some(&audit));
            err(Status::InternalServerError, "Error creating user")
        }
    }
}

#[put("/users/<id>", format = "json", data = "<update>")]
pub fn update_user(
    id: i64,
    update: Json<User>,
    ctx: RequestContext,
    state: &State<AppState>,
) -> ApiResult<User> {
    let audit = AuditContext::new("UpdateUser", "users").with_resource_id(id);

    let mut existing = match state.users.get_by_id(id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            state.audit.warn(&ctx, "User not found", Some(&audit));
            return err(Status::NotFound, "User not found");
        }
        Err(e) => {
            state.audit.error(&ctx, "Error getting user", &e, Some(&audit));
            return err(Status::InternalServerError, "Error getting user");
        }
    };

    let update = update.into_inner();
    if update.username.is_empty() || update.password.is_empty() || !is_valid_role(&update.role) {
        state.audit.warn(&ctx, "Invalid user data", Some(&audit));
        return err(Status::BadRequest, "Invalid user data");
    }

    existing.username = update.username;
    existing.password = update.password;
    existing.role = update.role;
    existing.updated_at = Utc::now();

    match state.users.update(&existing) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "User updated successfully", Some(&audit));
            ok(existing)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error updating user", &e, Some(&audit));
            err(error_status(&e), "Error updating user")
        }
    }
}

#[delete("/users/<id>")]
pub fn delete_user(id: i64, ctx: RequestContext, state: &State<AppState>) -> StatusResult {
    let audit = AuditContext::new("DeleteUser", "users").with_resource_id(id);
    match state.users.delete(id) {
        Ok(()) => {
            state
                .audit
                .info(&ctx, "User deleted successfully", Some(&audit));
            Ok(Status::NoContent)
        }
        Err(e) => {
            state
                .audit
                .error(&ctx, "Error deleting user", &e, Some(&audit));
            Err(error_body(error_status(&e), "Error deleting user"))
        }
    }
}
