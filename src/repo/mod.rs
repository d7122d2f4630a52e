pub mod cancao_repo;
pub mod db;
pub mod lugar_repo;
pub mod ramo_repo;
pub mod tag_repo;
pub mod user_repo;
