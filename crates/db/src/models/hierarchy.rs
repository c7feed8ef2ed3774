//! Rows of the project → dataset → image → roi → shape hierarchy.

use fastmal_core::annotation::{ObjectInfo, TargetKind};
use fastmal_core::types::DbId;
use serde::Deserialize;
use sqlx::FromRow;

/// Identity columns shared by every hierarchy table, with the parent key
/// aliased to `parent_id`.
#[derive(Debug, Clone, FromRow)]
pub struct ObjectRow {
    pub id: DbId,
    pub name: Option<String>,
    pub parent_id: Option<DbId>,
    pub owner_id: DbId,
}

impl ObjectRow {
    pub fn into_info(self, kind: TargetKind) -> ObjectInfo {
        ObjectInfo {
            kind,
            id: self.id,
            name: self.name,
            parent_id: self.parent_id,
            owner_id: self.owner_id,
        }
    }
}

/// An image id with its name, as returned by dataset projections.
#[derive(Debug, Clone, FromRow)]
pub struct ImageNameRow {
    pub id: DbId,
    pub name: String,
}

/// DTO for inserting a named container (project, dataset or image).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContainer {
    pub name: String,
    /// Parent key; `None` is only valid for projects and orphan datasets.
    pub parent_id: Option<DbId>,
    pub owner_id: DbId,
    pub group_id: Option<DbId>,
}

/// DTO for inserting a shape.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateShape {
    pub roi_id: DbId,
    pub text_value: Option<String>,
    pub owner_id: DbId,
    pub group_id: Option<DbId>,
}
