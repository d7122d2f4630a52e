use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag applicable to places. Place tags and song tags are separate catalogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagLugar {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Tag applicable to songs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCancao {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
