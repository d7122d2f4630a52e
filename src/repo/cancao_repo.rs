use crate::models::cancao::Cancao;
use crate::models::error::{ApiError, Result};
use crate::models::ramo::Ramo;
use crate::models::tag::TagCancao;
use crate::repo::db::Db;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row};

#[derive(Clone)]
pub struct CancaoRepo {
    db: Db,
}

fn cancao_from_row(row: &Row) -> rusqlite::Result<Cancao> {
    Ok(Cancao {
        id: row.get(0)?,
        nome: row.get(1)?,
        link_youtube: row.get(2)?,
        letra: row.get(3)?,
        user_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        tags: Vec::new(),
        ramos: Vec::new(),
    })
}

impl CancaoRepo {
    pub fn new(db: Db) -> Self {
        CancaoRepo { db }
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<Cancao>> {
        let conn = self.db.get()?;
        let cancao = conn
            .query_row(
                "SELECT id, nome, link_youtube, letra, user_id, created_at, updated_at
                 FROM cancoes WHERE id = ?1",
                [id],
                cancao_from_row,
            )
            .optional()
            .map_err(|cause| ApiError::query("get cancao by id", cause))?;

        match cancao {
            Some(mut cancao) => {
                self.hydrate(&conn, &mut cancao)?;
                Ok(Some(cancao))
            }
            None => Ok(None),
        }
    }

    pub fn list(&self) -> Result<Vec<Cancao>> {
        let conn = self.db.get()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, nome, link_youtube, letra, user_id, created_at, updated_at
                 FROM cancoes ORDER BY nome",
            )
            .map_err(|cause| ApiError::query("list cancoes", cause))?;

        let mut cancoes = stmt
            .query_map([], cancao_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|cause| ApiError::query("list cancoes", cause))?;

        for cancao in &mut cancoes {
            self.hydrate(&conn, cancao)?;
        }
        Ok(cancoes)
    }

    fn hydrate(&self, conn: &Connection, cancao: &mut Cancao) -> Result<()> {
        cancao.tags = self.tags_on(conn, cancao.id)?;
        cancao.ramos = self.ramos_on(conn, cancao.id)?;
        Ok(())
    }

    pub fn create(&self, cancao: &Cancao) -> Result<i64> {
        let conn = self.db.get()?;
        debug!("Inserting cancao: {}", cancao.nome);

        conn.query_row(
            "INSERT INTO cancoes (nome, link_youtube, letra, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id",
            (
                &cancao.nome,
                &cancao.link_youtube,
                &cancao.letra,
                cancao.user_id,
                cancao.created_at,
                cancao.updated_at,
            ),
            |row| row.get(0),
        )
        .map_err(|cause| ApiError::query("create cancao", cause))
    }

    pub fn update(&self, cancao: &Cancao) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute(
                "UPDATE cancoes
                 SET nome = ?1, link_youtube = ?2, letra = ?3, updated_at = ?4
                 WHERE id = ?5",
                (
                    &cancao.nome,
                    &cancao.link_youtube,
                    &cancao.letra,
                    cancao.updated_at,
                    cancao.id,
                ),
            )
            .map_err(|cause| ApiError::query("update cancao", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound {
                entity: "cancao",
                id: cancao.id,
            });
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute("DELETE FROM cancoes WHERE id = ?1", [id])
            .map_err(|cause| ApiError::query("delete cancao", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound { entity: "cancao", id });
        }
        Ok(())
    }

    pub fn add_tag(&self, cancao_id: i64, tag_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        conn.execute(
            "INSERT INTO cancoes_tags (cancao_id, tag_id)
             VALUES (?1, ?2)
             ON CONFLICT (cancao_id, tag_id) DO NOTHING",
            (cancao_id, tag_id),
        )
        .map_err(|cause| ApiError::query("add tag to cancao", cause))?;
        Ok(())
    }

    pub fn remove_tag(&self, cancao_id: i64, tag_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        conn.execute(
            "DELETE FROM cancoes_tags WHERE cancao_id = ?1 AND tag_id = ?2",
            (cancao_id, tag_id),
        )
        .map_err(|cause| ApiError::query("remove tag from cancao", cause))?;
        Ok(())
    }

    pub fn get_tags(&self, cancao_id: i64) -> Result<Vec<TagCancao>> {
        let conn = self.db.get()?;
        self.tags_on(&conn, cancao_id)
    }

    fn tags_on(&self, conn: &Connection, cancao_id: i64) -> Result<Vec<TagCancao>> {
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.name, t.created_at
                 FROM tags_cancoes t
                 JOIN cancoes_tags ct ON ct.tag_id = t.id
                 WHERE ct.cancao_id = ?1
                 ORDER BY t.name",
            )
            .map_err(|cause| ApiError::query("get cancao tags", cause))?;

        stmt.query_map([cancao_id], |row| {
            Ok(TagCancao {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .and_then(|rows| rows.collect())
        .map_err(|cause| ApiError::query("get cancao tags", cause))
    }

    pub fn add_ramo(&self, cancao_id: i64, ramo_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        conn.execute(
            "INSERT INTO cancoes_ramos (cancao_id, ramo_id)
             VALUES (?1, ?2)
             ON CONFLICT (cancao_id, ramo_id) DO NOTHING",
            (cancao_id, ramo_id),
        )
        .map_err(|cause| ApiError::query("add ramo to cancao", cause))?;
        Ok(())
    }

    pub fn remove_ramo(&self, cancao_id: i64, ramo_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        conn.execute(
            "DELETE FROM cancoes_ramos WHERE cancao_id = ?1 AND ramo_id = ?2",
            (cancao_id, ramo_id),
        )
        .map_err(|cause| ApiError::query("remove ramo from cancao", cause))?;
        Ok(())
    }

    pub fn get_ramos(&self, cancao_id: i64) -> Result<Vec<Ramo>> {
        let conn = self.db.get()?;
        self.ramos_on(&conn, cancao_id)
    }

    fn ramos_on(&self, conn: &Connection, cancao_id: i64) -> Result<Vec<Ramo>> {
        let mut stmt = conn
            .prepare(
                "SELECT r.id, r.name, r.created_at
                 FROM ramos r
                 JOIN cancoes_ramos cr ON cr.ramo_id = r.id
                 WHERE cr.cancao_id = ?1
                 ORDER BY r.name",
            )
            .map_err(|cause| ApiError::query("get cancao ramos", cause))?;

        stmt.query_map([cancao_id], |row| {
            Ok(Ramo {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .and_then(|rows| rows.collect())
        .map_err(|cause| ApiError::query("get cancao ramos", cause))
    }
}
