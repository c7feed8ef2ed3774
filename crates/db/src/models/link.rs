use fastmal_core::annotation::{AnnotationLink, LinkedAnnotation, TargetKind, TargetRef};
use fastmal_core::error::CoreError;
use fastmal_core::types::DbId;
use sqlx::FromRow;

use crate::models::annotation::AnnotationRow;

fn parse_target(parent_type: &str, parent_id: DbId) -> Result<TargetRef, CoreError> {
    TargetKind::parse(parent_type)
        .map(|kind| TargetRef::new(kind, parent_id))
        .map_err(|e| CoreError::Store(e.to_string()))
}

/// A row from the `annotation_links` table.
#[derive(Debug, Clone, FromRow)]
pub struct AnnotationLinkRow {
    pub id: DbId,
    pub parent_type: String,
    pub parent_id: DbId,
    pub annotation_id: DbId,
    pub owner_id: DbId,
}

impl TryFrom<AnnotationLinkRow> for AnnotationLink {
    type Error = CoreError;

    fn try_from(row: AnnotationLinkRow) -> Result<Self, Self::Error> {
        Ok(AnnotationLink {
            id: row.id,
            target: parse_target(&row.parent_type, row.parent_id)?,
            annotation_id: row.annotation_id,
            owner_id: row.owner_id,
        })
    }
}

/// A link joined with its annotation. Link columns are aliased with a
/// `link_` prefix where they clash with annotation columns.
#[derive(Debug, Clone, FromRow)]
pub struct LinkedAnnotationRow {
    pub link_id: DbId,
    pub parent_type: String,
    pub parent_id: DbId,
    pub link_owner_id: DbId,
    #[sqlx(flatten)]
    pub annotation: AnnotationRow,
}

impl TryFrom<LinkedAnnotationRow> for LinkedAnnotation {
    type Error = CoreError;

    fn try_from(row: LinkedAnnotationRow) -> Result<Self, Self::Error> {
        let link = AnnotationLink {
            id: row.link_id,
            target: parse_target(&row.parent_type, row.parent_id)?,
            annotation_id: row.annotation.id,
            owner_id: row.link_owner_id,
        };
        Ok(LinkedAnnotation {
            link,
            annotation: row.annotation.try_into()?,
        })
    }
}
