use crate::models::error::{ApiError, Result};
use log::info;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Shared database handle. Cloning is cheap; every clone talks to the same
/// pool, so one `Db` created at startup serves every handler and both audit
/// sinks concurrently.
#[derive(Clone)]
pub struct Db {
    pool: Pool<SqliteConnectionManager>,
}

impl Db {
    /// Opens a connection pool against the given database file. `:memory:`
    /// style paths skip WAL, which only applies to file databases.
    pub fn connect(db_file: &str) -> Result<Self> {
        if db_file.is_empty() {
            return Err(ApiError::Config(
                "database file path cannot be empty; use ':memory:' for an in-memory database"
                    .to_string(),
            ));
        }

        info!("Initializing database connection pool: {}", db_file);

        let is_in_memory = db_file == ":memory:" || db_file.starts_with("file::memory:");
        let use_wal = !is_in_memory;

        let manager = SqliteConnectionManager::file(db_file).with_init(move |conn| {
            let mut pragmas = String::from(
                "PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            );

            if use_wal {
                pragmas.push_str(" PRAGMA journal_mode = WAL;");
            }

            conn.execute_batch(&pragmas)
        });

        // Pool size: physical cores + 7 for a good mix of reads and writes.
        let pool_size = num_cpus::get_physical() + 7;
        let pool = r2d2::Pool::builder()
            .max_size(pool_size as u32)
            .build(manager)
            .map_err(|e| ApiError::Config(format!("failed to create connection pool: {}", e)))?;

        info!("Database pool created with {} connections", pool_size);

        Ok(Db { pool })
    }

    pub fn get(&self) -> Result<DbConnection> {
        self.pool.get().map_err(ApiError::Pool)
    }
}

/// Creates the relational schema. Idempotent; safe to run on every startup.
/// The audit table is not created here; the database audit sink owns it.
pub fn setup_database(db: &Db) -> Result<()> {
    info!("Initializing database schema");

    let setup_queries = "BEGIN;
    PRAGMA ENCODING = 'UTF-8';

    CREATE TABLE IF NOT EXISTS users(
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        username   TEXT NOT NULL UNIQUE,
        password   TEXT NOT NULL,
        role       TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL);

    CREATE TABLE IF NOT EXISTS lugares(
        id                    INTEGER PRIMARY KEY AUTOINCREMENT,
        nome_local            TEXT    NOT NULL,
        nome_dono_local       TEXT    NOT NULL DEFAULT '',
        telefone_para_contato INTEGER NOT NULL DEFAULT 0,
        link_google_maps      TEXT    NOT NULL DEFAULT '',
        link_site             TEXT    NOT NULL DEFAULT '',
        endereco_completo     TEXT    NOT NULL DEFAULT '',
        local_publico         INTEGER NOT NULL DEFAULT 0,
        valor_fixo            REAL    NOT NULL DEFAULT 0,
        valor_individual      REAL    NOT NULL DEFAULT 0,
        user_id               INTEGER NOT NULL DEFAULT 0,
        created_at            TEXT    NOT NULL,
        updated_at            TEXT    NOT NULL);

    CREATE TABLE IF NOT EXISTS lugares_images(
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        lugar_id      INTEGER NOT NULL REFERENCES lugares ON DELETE CASCADE,
        image_url     TEXT    NOT NULL,
        display_order INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT    NOT NULL);

    CREATE INDEX IF NOT EXISTS lugares_images_lugar_id_index
            ON lugares_images (lugar_id);

    CREATE TABLE IF NOT EXISTS lugares_ratings(
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        lugar_id INTEGER NOT NULL REFERENCES lugares ON DELETE CASCADE,
        user_id  INTEGER NOT NULL,
        rating   INTEGER NOT NULL,
        date     TEXT    NOT NULL,
        UNIQUE (lugar_id, user_id));

    CREATE TABLE IF NOT EXISTS tags_lugares(
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        name       TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL);

    CREATE TABLE IF NOT EXISTS lugares_tags(
        lugar_id INTEGER NOT NULL REFERENCES lugares ON DELETE CASCADE,
        tag_id   INTEGER NOT NULL REFERENCES tags_lugares ON DELETE CASCADE,
        PRIMARY KEY (lugar_id, tag_id));

    CREATE TABLE IF NOT EXISTS ramos(
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        name       TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL);

    CREATE TABLE IF NOT EXISTS lugares_ramos(
        lugar_id INTEGER NOT NULL REFERENCES lugares ON DELETE CASCADE,
        ramo_id  INTEGER NOT NULL REFERENCES ramos ON DELETE CASCADE,
        PRIMARY KEY (lugar_id, ramo_id));

    CREATE TABLE IF NOT EXISTS cancoes(
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        nome         TEXT    NOT NULL,
        link_youtube TEXT    NOT NULL DEFAULT '',
        letra        TEXT    NOT NULL DEFAULT '',
        user_id      INTEGER NOT NULL DEFAULT 0,
        created_at   TEXT    NOT NULL,
        updated_at   TEXT    NOT NULL);

    CREATE TABLE IF NOT EXISTS tags_cancoes(
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        name       TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL);

    CREATE TABLE IF NOT EXISTS cancoes_tags(
        cancao_id INTEGER NOT NULL REFERENCES cancoes ON DELETE CASCADE,
        tag_id    INTEGER NOT NULL REFERENCES tags_cancoes ON DELETE CASCADE,
        PRIMARY KEY (cancao_id, tag_id));

    CREATE TABLE IF NOT EXISTS cancoes_ramos(
        cancao_id INTEGER NOT NULL REFERENCES cancoes ON DELETE CASCADE,
        ramo_id   INTEGER NOT NULL REFERENCES ramos ON DELETE CASCADE,
        PRIMARY KEY (cancao_id, ramo_id));

    CREATE VIEW IF NOT EXISTS lugares_with_ratings AS
        SELECT lugar_id AS id,
               AVG(rating) AS average_rating,
               COUNT(*) AS rating_count
        FROM lugares_ratings
        GROUP BY lugar_id;

    COMMIT;";

    let conn = db.get()?;
    conn.execute_batch(setup_queries)
        .map_err(|cause| ApiError::Query {
            operation: "create tables".to_string(),
            cause,
        })?;

    info!("Database schema initialized successfully");
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Fresh file-backed database per test; the TempDir must outlive the Db.
    pub fn test_db() -> (Db, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Db::connect(path.to_str().unwrap()).unwrap();
        setup_database(&db).unwrap();
        (db, dir)
    }
}
