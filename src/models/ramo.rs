use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scouting branch (age section). One shared catalog serves both places and
/// songs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ramo {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
