use crate::models::error::{ApiError, Result};
use crate::models::lugar::{Lugar, LugarImage, LugarRating};
use crate::models::ramo::Ramo;
use crate::models::tag::TagLugar;
use crate::repo::db::Db;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row};

#[derive(Clone)]
pub struct LugarRepo {
    db: Db,
}

fn lugar_from_row(row: &Row) -> rusqlite::Result<Lugar> {
    Ok(Lugar {
        id: row.get(0)?,
        nome_local: row.get(1)?,
        nome_dono_local: row.get(2)?,
        telefone_para_contato: row.get(3)?,
        link_google_maps: row.get(4)?,
        link_site: row.get(5)?,
        endereco_completo: row.get(6)?,
        local_publico: row.get(7)?,
        valor_fixo: row.get(8)?,
        valor_individual: row.get(9)?,
        user_id: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        images: Vec::new(),
        tags: Vec::new(),
        ramos: Vec::new(),
        average_rating: row.get(13)?,
        rating_count: row.get(14)?,
    })
}

const LUGAR_COLUMNS: &str = "l.id, l.nome_local, l.nome_dono_local, l.telefone_para_contato,
        l.link_google_maps, l.link_site, l.endereco_completo,
        l.local_publico, l.valor_fixo, l.valor_individual,
        l.user_id, l.created_at, l.updated_at,
        COALESCE(lwr.average_rating, 0) AS average_rating,
        COALESCE(lwr.rating_count, 0) AS rating_count";

impl LugarRepo {
    pub fn new(db: Db) -> Self {
        LugarRepo { db }
    }

    /// Returns the place with images, tags and ramos hydrated, or `Ok(None)`
    /// when it does not exist.
    pub fn get_by_id(&self, id: i64) -> Result<Option<Lugar>> {
        let conn = self.db.get()?;
        let lugar = conn
            .query_row(
                &format!(
                    "SELECT {}
                     FROM lugares l
                     LEFT JOIN lugares_with_ratings lwr ON l.id = lwr.id
                     WHERE l.id = ?1",
                    LUGAR_COLUMNS
                ),
                [id],
                lugar_from_row,
            )
            .optional()
            .map_err(|cause| ApiError::query("get lugar by id", cause))?;

        match lugar {
            Some(mut lugar) => {
                self.hydrate(&conn, &mut lugar)?;
                Ok(Some(lugar))
            }
            None => Ok(None),
        }
    }

    pub fn list(&self) -> Result<Vec<Lugar>> {
        let conn = self.db.get()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {}
                 FROM lugares l
                 LEFT JOIN lugares_with_ratings lwr ON l.id = lwr.id
                 ORDER BY l.id",
                LUGAR_COLUMNS
            ))
            .map_err(|cause| ApiError::query("list lugares", cause))?;

        let mut lugares = stmt
            .query_map([], lugar_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|cause| ApiError::query("list lugares", cause))?;

        for lugar in &mut lugares {
            self.hydrate(&conn, lugar)?;
        }
        Ok(lugares)
    }

    fn hydrate(&self, conn: &Connection, lugar: &mut Lugar) -> Result<()> {
        lugar.images = self.images_on(conn, lugar.id)?;
        lugar.tags = self.tags_on(conn, lugar.id)?;
        lugar.ramos = self.ramos_on(conn, lugar.id)?;
        Ok(())
    }

    pub fn create(&self, lugar: &Lugar) -> Result<i64> {
        let conn = self.db.get()?;
        debug!("Inserting lugar: {}", lugar.nome_local);

        conn.query_row(
            "INSERT INTO lugares (
                nome_local, nome_dono_local, telefone_para_contato,
                link_google_maps, link_site, endereco_completo,
                local_publico, valor_fixo, valor_individual,
                user_id, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             RETURNING id",
            (
                &lugar.nome_local,
                &lugar.nome_dono_local,
                lugar.telefone_para_contato,
                &lugar.link_google_maps,
                &lugar.link_site,
                &lugar.endereco_completo,
                lugar.local_publico,
                lugar.valor_fixo,
                lugar.valor_individual,
                lugar.user_id,
                lugar.created_at,
                lugar.updated_at,
            ),
            |row| row.get(0),
        )
        .map_err(|cause| ApiError::query("create lugar", cause))
    }

    pub fn update(&self, lugar: &Lugar) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute(
                "UPDATE lugares
                 SET nome_local = ?1, nome_dono_local = ?2, telefone_para_contato = ?3,
                     link_google_maps = ?4, link_site = ?5, endereco_completo = ?6,
                     local_publico = ?7, valor_fixo = ?8, valor_individual = ?9,
                     updated_at = ?10
                 WHERE id = ?11",
                (
                    &lugar.nome_local,
                    &lugar.nome_dono_local,
                    lugar.telefone_para_contato,
                    &lugar.link_google_maps,
                    &lugar.link_site,
                    &lugar.endereco_completo,
                    lugar.local_publico,
                    lugar.valor_fixo,
                    lugar.valor_individual,
                    lugar.updated_at,
                    lugar.id,
                ),
            )
            .map_err(|cause| ApiError::query("update lugar", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound {
                entity: "lugar",
                id: lugar.id,
            });
        }
        Ok(())
    }

    /// Deletes the place. Images, ratings, tag and ramo links go with it via
    /// foreign key cascades.
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute("DELETE FROM lugares WHERE id = ?1", [id])
            .map_err(|cause| ApiError::query("delete lugar", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound { entity: "lugar", id });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    pub fn add_image(&self, image: &LugarImage) -> Result<i64> {
        let conn = self.db.get()?;
        conn.query_row(
            "INSERT INTO lugares_images (lugar_id, image_url, display_order, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id",
            (
                image.lugar_id,
                &image.image_url,
                image.display_order,
                image.created_at,
            ),
            |row| row.get(0),
        )
        .map_err(|cause| ApiError::query("add image to lugar", cause))
    }

    pub fn delete_image(&self, image_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute("DELETE FROM lugares_images WHERE id = ?1", [image_id])
            .map_err(|cause| ApiError::query("delete lugar image", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound {
                entity: "image",
                id: image_id,
            });
        }
        Ok(())
    }

    pub fn get_images(&self, lugar_id: i64) -> Result<Vec<LugarImage>> {
        let conn = self.db.get()?;
        self.images_on(&conn, lugar_id)
    }

    fn images_on(&self, conn: &Connection, lugar_id: i64) -> Result<Vec<LugarImage>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, lugar_id, image_url, display_order, created_at
                 FROM lugares_images
                 WHERE lugar_id = ?1
                 ORDER BY display_order, id",
            )
            .map_err(|cause| ApiError::query("get lugar images", cause))?;

        stmt.query_map([lugar_id], |row| {
            Ok(LugarImage {
                id: row.get(0)?,
                lugar_id: row.get(1)?,
                image_url: row.get(2)?,
                display_order: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .and_then(|rows| rows.collect())
        .map_err(|cause| ApiError::query("get lugar images", cause))
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Attaching an already-attached tag is a no-op.
    pub fn add_tag(&self, lugar_id: i64, tag_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        conn.execute(
            "INSERT INTO lugares_tags (lugar_id, tag_id)
             VALUES (?1, ?2)
             ON CONFLICT (lugar_id, tag_id) DO NOTHING",
            (lugar_id, tag_id),
        )
        .map_err(|cause| ApiError::query("add tag to lugar", cause))?;
        Ok(())
    }

    pub fn remove_tag(&self, lugar_id: i64, tag_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        conn.execute(
            "DELETE FROM lugares_tags WHERE lugar_id = ?1 AND tag_id = ?2",
            (lugar_id, tag_id),
        )
        .map_err(|cause| ApiError::query("remove tag from lugar", cause))?;
        Ok(())
    }

    pub fn get_tags(&self, lugar_id: i64) -> Result<Vec<TagLugar>> {
        let conn = self.db.get()?;
        self.tags_on(&conn, lugar_id)
    }

    fn tags_on(&self, conn: &Connection, lugar_id: i64) -> Result<Vec<TagLugar>> {
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.name, t.created_at
                 FROM tags_lugares t
                 JOIN lugares_tags lt ON lt.tag_id = t.id
                 WHERE lt.lugar_id = ?1
                 ORDER BY t.name",
            )
            .map_err(|cause| ApiError::query("get lugar tags", cause))?;

        stmt.query_map([lugar_id], |row| {
            Ok(TagLugar {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .and_then(|rows| rows.collect())
        .map_err(|cause| ApiError::query("get lugar tags", cause))
    }

    // ------------------------------------------------------------------
    // Ramos
    // ------------------------------------------------------------------

    pub fn add_ramo(&self, lugar_id: i64, ramo_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        conn.execute(
            "INSERT INTO lugares_ramos (lugar_id, ramo_id)
             VALUES (?1, ?2)
             ON CONFLICT (lugar_id, ramo_id) DO NOTHING",
            (lugar_id, ramo_id),
        )
        .map_err(|cause| ApiError::query("add ramo to lugar", cause))?;
        Ok(())
    }

    pub fn remove_ramo(&self, lugar_id: i64, ramo_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        conn.execute(
            "DELETE FROM lugares_ramos WHERE lugar_id = ?1 AND ramo_id = ?2",
            (lugar_id, ramo_id),
        )
        .map_err(|cause| ApiError::query("remove ramo from lugar", cause))?;
        Ok(())
    }

    pub fn get_ramos(&self, lugar_id: i64) -> Result<Vec<Ramo>> {
        let conn = self.db.get()?;
        self.ramos_on(&conn, lugar_id)
    }

    fn ramos_on(&self, conn: &Connection, lugar_id: i64) -> Result<Vec<Ramo>> {
        let mut stmt = conn
            .prepare(
                "SELECT r.id, r.name, r.created_at
                 FROM ramos r
                 JOIN lugares_ramos lr ON lr.ramo_id = r.id
                 WHERE lr.lugar_id = ?1
                 ORDER BY r.name",
            )
            .map_err(|cause| ApiError::query("get lugar ramos", cause))?;

        stmt.query_map([lugar_id], |row| {
            Ok(Ramo {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .and_then(|rows| rows.collect())
        .map_err(|cause| ApiError::query("get lugar ramos", cause))
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    /// Upsert on (lugar_id, user_id): rating the same place again replaces
    /// the previous score.
    pub fn add_rating(&self, rating: &LugarRating) -> Result<i64> {
        let conn = self.db.get()?;
        conn.query_row(
            "INSERT INTO lugares_ratings (lugar_id, user_id, rating, date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (lugar_id, user_id) DO UPDATE SET
                 rating = excluded.rating,
                 date = excluded.date
             RETURNING id",
            (rating.lugar_id, rating.user_id, rating.rating, rating.date),
            |row| row.get(0),
        )
        .map_err(|cause| ApiError::query("add rating to lugar", cause))
    }

    pub fn update_rating(&self, rating: &LugarRating) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute(
                "UPDATE lugares_ratings
                 SET rating = ?1, date = ?2
                 WHERE id = ?3",
                (rating.rating, rating.date, rating.id),
            )
            .map_err(|cause| ApiError::query("update lugar rating", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound {
                entity: "rating",
                id: rating.id,
            });
        }
        Ok(())
    }

    pub fn delete_rating(&self, rating_id: i64) -> Result<()> {
        let conn = self.db.get()?;
        let changed = conn
            .execute("DELETE FROM lugares_ratings WHERE id = ?1", [rating_id])
            .map_err(|cause| ApiError::query("delete lugar rating", cause))?;

        if changed == 0 {
            return Err(ApiError::NotFound {
                entity: "rating",
                id: rating_id,
            });
        }
        Ok(())
    }

    pub fn get_ratings(&self, lugar_id: i64) -> Result<Vec<LugarRating>> {
        let conn = self.db.get()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, lugar_id, user_id, rating, date
                 FROM lugares_ratings
                 WHERE lugar_id = ?1
                 ORDER BY date DESC",
            )
            .map_err(|cause| ApiError::query("get lugar ratings", cause))?;

        stmt.query_map([lugar_id], |row| {
            Ok(LugarRating {
                id: row.get(0)?,
                lugar_id: row.get(1)?,
                user_id: row.get(2)?,
                rating: row.get(3)?,
                date: row.get(4)?,
            })
        })
        .and_then(|rows| rows.collect())
        .map_err(|cause| ApiError::query("get lugar ratings", cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::db::test_support::test_db;
    use chrono::Utc;

    fn sample_lugar(name: &str) -> Lugar {
        let now = Utc::now();
        Lugar {
            id: 0,
            nome_local: name.to_string(),
            nome_dono_local: "Dona Maria".to_string(),
            telefone_para_contato: 5511999990000,
            link_google_maps: String::new(),
            link_site: String::new(),
            endereco_completo: "Rua das Flores, 1".to_string(),
            local_publico: false,
            valor_fixo: 150.0,
            valor_individual: 12.5,
            user_id: 1,
            created_at: now,
            updated_at: now,
            images: Vec::new(),
            tags: Vec::new(),
            ramos: Vec::new(),
            average_rating: 0.0,
            rating_count: 0,
        }
    }

    fn rating(lugar_id: i64, user_id: i64, score: i64) -> LugarRating {
        LugarRating {
            id: 0,
            lugar_id,
            user_id,
            rating: score,
            date: Utc::now(),
        }
    }

    #[test]
    fn create_and_get_round_trip() {
        let (db, _dir) = test_db();
        let repo = LugarRepo::new(db);

        let id = repo.create(&sample_lugar("Sítio do Bosque")).unwrap();
        let lugar = repo.get_by_id(id).unwrap().expect("lugar should exist");
        assert_eq!(lugar.nome_local, "Sítio do Bosque");
        assert_eq!(lugar.valor_fixo, 150.0);
        assert_eq!(lugar.rating_count, 0);
        assert_eq!(lugar.average_rating, 0.0);
    }

    #[test]
    fn missing_lugar_is_none() {
        let (db, _dir) = test_db();
        let repo = LugarRepo::new(db);
        assert!(repo.get_by_id(404).unwrap().is_none());
    }

    #[test]
    fn ratings_aggregate_into_view() {
        let (db, _dir) = test_db();
        let repo = LugarRepo::new(db);
        let id = repo.create(&sample_lugar("Acampamento Norte")).unwrap();

        repo.add_rating(&rating(id, 1, 4)).unwrap();
        repo.add_rating(&rating(id, 2, 2)).unwrap();

        let lugar = repo.get_by_id(id).unwrap().unwrap();
        assert_eq!(lugar.rating_count, 2);
        assert_eq!(lugar.average_rating, 3.0);
    }

    #[test]
    fn rating_same_place_twice_replaces_score() {
        let (db, _dir) = test_db();
        let repo = LugarRepo::new(db);
        let id = repo.create(&sample_lugar("Acampamento Norte")).unwrap();

        let first = repo.add_rating(&rating(id, 1, 2)).unwrap();
        let second = repo.add_rating(&rating(id, 1, 5)).unwrap();
        assert_eq!(first, second);

        let lugar = repo.get_by_id(id).unwrap().unwrap();
        assert_eq!(lugar.rating_count, 1);
        assert_eq!(lugar.average_rating, 5.0);
    }

    #[test]
    fn images_keep_display_order() {
        let (db, _dir) = test_db();
        let repo = LugarRepo::new(db);
        let id = repo.create(&sample_lugar("Sede")).unwrap();

        let now = Utc::now();
        for (url, order) in [("b.jpg", 2), ("a.jpg", 1)] {
            repo.add_image(&LugarImage {
                id: 0,
                lugar_id: id,
                image_url: url.to_string(),
                display_order: order,
                created_at: now,
            })
            .unwrap();
        }

        let images = repo.get_images(id).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].image_url, "a.jpg");
        assert_eq!(images[1].image_url, "b.jpg");
    }

    #[test]
    fn tag_attach_is_idempotent() {
        let (db, _dir) = test_db();
        let repo = LugarRepo::new(db.clone());
        let id = repo.create(&sample_lugar("Sede")).unwrap();

        let conn = db.get().unwrap();
        conn.execute(
            "INSERT INTO tags_lugares (name, created_at) VALUES ('camping', ?1)",
            [Utc::now()],
        )
        .unwrap();

        repo.add_tag(id, 1).unwrap();
        repo.add_tag(id, 1).unwrap();
        assert_eq!(repo.get_tags(id).unwrap().len(), 1);

        repo.remove_tag(id, 1).unwrap();
        assert!(repo.get_tags(id).unwrap().is_empty());
    }

    #[test]
    fn delete_cascades_to_related_rows() {
        let (db, _dir) = test_db();
        let repo = LugarRepo::new(db.clone());
        let id = repo.create(&sample_lugar("Sede")).unwrap();
        repo.add_rating(&rating(id, 1, 5)).unwrap();
        repo.add_image(&LugarImage {
            id: 0,
            lugar_id: id,
            image_url: "a.jpg".to_string(),
            display_order: 0,
            created_at: Utc::now(),
        })
        .unwrap();

        repo.delete(id).unwrap();
        assert!(repo.get_by_id(id).unwrap().is_none());

        let conn = db.get().unwrap();
        let ratings: i64 = conn
            .query_row("SELECT COUNT(*) FROM lugares_ratings", [], |row| row.get(0))
            .unwrap();
        let images: i64 = conn
            .query_row("SELECT COUNT(*) FROM lugares_images", [], |row| row.get(0))
            .unwrap();
        assert_eq!(ratings, 0);
        assert_eq!(images, 0);
    }

    #[test]
    fn update_missing_lugar_fails() {
        let (db, _dir) = test_db();
        let repo = LugarRepo::new(db);
        let mut lugar = sample_lugar("fantasma");
        lugar.id = 99;
        assert!(matches!(
            repo.update(&lugar),
            Err(ApiError::NotFound { entity: "lugar", id: 99 })
        ));
    }
}
