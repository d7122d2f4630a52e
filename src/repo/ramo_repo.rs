use crate::models::error::{ApiError, Result};
use crate::models::ramo::Ramo;
use crate::repo::db::Db;
use chrono::Utc;

/// Catalog of scouting branches, shared by places and songs.
#[derive(Clone)]
pub struct RamoRepo {
    db: Db,
}

impl RamoRepo {
    pub fn new(db: Db) -> Self {
        RamoRepo { db }
    }

    pub fn list(&self) -> Result<Vec<Ramo>> {
        let conn = self.db.get()?;
        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM ramos ORDER BY name")
            .map_err(|cause| ApiError::query("list ramos", cause))?;

        stmt.query_map([], |row| {
            Ok(Ramo {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .and_then(|rows| rows.collect())
        .map_err(|cause| ApiError::query("list ramos", cause))
    }

    pub fn create(&self, name: &str) -> Result<i64> {
        let conn = self.db.get()?;
        conn.query_row(
            "INSERT INTO ramos (name, created_at) VALUES (?1, ?2) RETURNING id",
            (name, Utc::now()),
            |row| row.get(0),
        )
        .map_err(|cause| ApiError::query("create ramo", cause))
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute("DELETE FROM ramos WHERE id = ?1", [id])
            .map_err(|cause| ApiError::query("delete ramo", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound { entity: "ramo", id });
        }
        Ok(())
    }
}
