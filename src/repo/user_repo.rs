use crate::models::error::{ApiError, Result};
use crate::models::user::User;
use crate::repo::db::Db;
use log::debug;
use rusqlite::{OptionalExtension, Row};

#[derive(Clone)]
pub struct UserRepo {
    db: Db,
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl UserRepo {
    pub fn new(db: Db) -> Self {
        UserRepo { db }
    }

    /// Missing users are `Ok(None)`, not an error; the caller decides whether
    /// absence is a 404.
    pub fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.db.get()?;
        conn.query_row(
            "SELECT id, username, password, role, created_at, updated_at
             FROM users WHERE id = ?1",
            [id],
            user_from_row,
        )
        .optional()
        .map_err(|cause| ApiError::query("get user by id", cause))
    }

    pub fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.db.get()?;
        conn.query_row(
            "SELECT id, username, password, role, created_at, updated_at
             FROM users WHERE username = ?1",
            [username],
            user_from_row,
        )
        .optional()
        .map_err(|cause| ApiError::query("get user by username", cause))
    }

    pub fn list(&self) -> Result<Vec<User>> {
        let conn = self.db.get()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, username, password, role, created_at, updated_at
                 FROM users ORDER BY id",
            )
            .map_err(|cause| ApiError::query("list users", cause))?;

        let users = stmt
            .query_map([], user_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|cause| ApiError::query("list users", cause))?;
        Ok(users)
    }

    pub fn create(&self, user: &User) -> Result<i64> {
        let conn = self.db.get()?;
        debug!("Inserting user: {}", user.username);

        conn.query_row(
            "INSERT INTO users (username, password, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
            (
                &user.username,
                &user.password,
                &user.role,
                user.created_at,
                user.updated_at,
            ),
            |row| row.get(0),
        )
        .map_err(|cause| ApiError::query("create user", cause))
    }

    pub fn update(&self, user: &User) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute(
                "UPDATE users
                 SET username = ?1, password = ?2, role = ?3, updated_at = ?4
                 WHERE id = ?5",
                (
                    &user.username,
                    &user.password,
                    &user.role,
                    user.updated_at,
                    user.id,
                ),
            )
            .map_err(|cause| ApiError::query("update user", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound {
                entity: "user",
                id: user.id,
            });
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute("DELETE FROM users WHERE id = ?1", [id])
            .map_err(|cause| ApiError::query("delete user", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound { entity: "user", id });
        }
        Ok(())
    }
}
