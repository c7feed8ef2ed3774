use fastmal_core::annotation::User;
use fastmal_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `experimenters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Experimenter {
    pub id: DbId,
    pub name: String,
    pub full_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Experimenter> for User {
    fn from(row: Experimenter) -> Self {
        User {
            id: row.id,
            name: row.name,
            full_name: row.full_name,
        }
    }
}

/// DTO for registering an experimenter.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExperimenter {
    pub name: String,
    pub full_name: String,
}

/// A row from the `experimenter_groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExperimenterGroup {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
