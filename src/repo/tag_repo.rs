use crate::models::error::{ApiError, Result};
use crate::repo::db::Db;
use chrono::{DateTime, Utc};
use rusqlite::Row;

/// Row shared by both tag catalogs; the concrete model types in
/// `models::tag` are produced by the callers.
#[derive(Debug, Clone)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

fn tag_from_row(row: &Row) -> rusqlite::Result<TagRow> {
    Ok(TagRow {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Catalog of tags. Place tags and song tags live in separate tables with
/// identical shape, so one repository parameterized by table serves both.
#[derive(Clone)]
pub struct TagRepo {
    db: Db,
    table: &'static str,
    entity: &'static str,
}

impl TagRepo {
    pub fn for_lugares(db: Db) -> Self {
        TagRepo {
            db,
            table: "tags_lugares",
            entity: "tag",
        }
    }

    pub fn for_cancoes(db: Db) -> Self {
        TagRepo {
            db,
            table: "tags_cancoes",
            entity: "tag",
        }
    }

    pub fn list(&self) -> Result<Vec<TagRow>> {
        let conn = self.db.get()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, created_at FROM {} ORDER BY name",
                self.table
            ))
            .map_err(|cause| ApiError::query("list tags", cause))?;

        stmt.query_map([], tag_from_row)
            .and_then(|rows| rows.collect())
            .map_err(|cause| ApiError::query("list tags", cause))
    }

    pub fn create(&self, name: &str) -> Result<i64> {
        let conn = self.db.get()?;
        conn.query_row(
            &format!(
                "INSERT INTO {} (name, created_at) VALUES (?1, ?2) RETURNING id",
                self.table
            ),
            (name, Utc::now()),
            |row| row.get(0),
        )
        .map_err(|cause| ApiError::query("create tag", cause))
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1", self.table), [id])
            .map_err(|cause| ApiError::query("delete tag", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound {
                entity: self.entity,
                id,
            });
        }
        Ok(())
    }
}
