use crate::models::ramo::Ramo;
use crate::models::tag::TagLugar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Campsite or meeting place. The rating aggregates come from the
/// `lugares_with_ratings` view and the related collections are hydrated by
/// the repository, not stored on the row itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lugar {
    #[serde(default)]
    pub id: i64,
    pub nome_local: String,
    #[serde(default)]
    pub nome_dono_local: String,
    #[serde(default)]
    pub telefone_para_contato: i64,
    #[serde(default)]
    pub link_google_maps: String,
    #[serde(default)]
    pub link_site: String,
    #[serde(default)]
    pub endereco_completo: String,
    #[serde(default)]
    pub local_publico: bool,
    #[serde(default)]
    pub valor_fixo: f64,
    #[serde(default)]
    pub valor_individual: f64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<LugarImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagLugar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ramos: Vec<Ramo>,

    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub rating_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LugarImage {
    #[serde(default)]
    pub id: i64,
    pub lugar_id: i64,
    pub image_url: String,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// One user's score for a place. A user rates a place at most once; rating
/// again replaces the previous score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LugarRating {
    #[serde(default)]
    pub id: i64,
    pub lugar_id: i64,
    pub user_id: i64,
    pub rating: i64,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
}
