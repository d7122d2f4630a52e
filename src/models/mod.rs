pub mod api;
pub mod cancao;
pub mod error;
pub mod lugar;
pub mod ramo;
pub mod tag;
pub mod user;
