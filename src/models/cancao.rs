use crate::models::ramo::Ramo;
use crate::models::tag::TagCancao;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Campfire song, optionally linked to a recording and full lyrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cancao {
    #[serde(default)]
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub link_youtube: String,
    #[serde(default)]
    pub letra: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagCancao>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ramos: Vec<Ramo>,
}
