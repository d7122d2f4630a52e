use crate::audit::AuditLogger;
use crate::repo::cancao_repo::CancaoRepo;
use crate::repo::db::Db;
use crate::repo::lugar_repo::LugarRepo;
use crate::repo::ramo_repo::RamoRepo;
use crate::repo::tag_repo::TagRepo;
use crate::repo::user_repo::UserRepo;
use std::sync::Arc;

/// Shared application state. Everything handlers need arrives through here;
/// there is no global pool or logger.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepo,
    pub lugares: LugarRepo,
    pub cancoes: CancaoRepo,
    pub lugar_tags: TagRepo,
    pub cancao_tags: TagRepo,
    pub ramos: RamoRepo,
    pub audit: Arc<dyn AuditLogger>,
}

impl AppState {
    pub fn new(db: Db, audit: Arc<dyn AuditLogger>) -> Self {
        AppState {
            users: UserRepo::new(db.clone()),
            lugares: LugarRepo::new(db.clone()),
            cancoes: CancaoRepo::new(db.clone()),
            lugar_tags: TagRepo::for_lugares(db.clone()),
            cancao_tags: TagRepo::for_cancoes(db.clone()),
            ramos: RamoRepo::new(db),
            audit,
        }
    }
}
