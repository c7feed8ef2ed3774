//! Repository for the `annotation_links` table.

use fastmal_core::annotation::TargetKind;
use fastmal_core::types::DbId;
use sqlx::PgPool;

use crate::models::link::{AnnotationLinkRow, LinkedAnnotationRow};
use crate::repositories::annotation_repo::ANNOTATION_COLUMNS;

/// Column list for `annotation_links` queries.
const LINK_COLUMNS: &str = "id, parent_type, parent_id, annotation_id, owner_id";

/// Provides link creation, deletion and joined lookups.
pub struct AnnotationLinkRepo;

impl AnnotationLinkRepo {
    /// Links on one parent joined with their annotations, oldest first.
    pub async fn list_for_parent(
        pool: &PgPool,
        parent_kind: TargetKind,
        parent_id: DbId,
        owner_id: Option<DbId>,
    ) -> Result<Vec<LinkedAnnotationRow>, sqlx::Error> {
        let query = format!(
            "SELECT l.id AS link_id, l.parent_type, l.parent_id, l.owner_id AS link_owner_id, \
                    {ANNOTATION_COLUMNS} \
             FROM annotation_links l \
             JOIN annotations a ON a.id = l.annotation_id \
             WHERE l.parent_type = $1 AND l.parent_id = $2 \
               AND ($3::BIGINT IS NULL OR l.owner_id = $3) \
             ORDER BY l.id"
        );
        sqlx::query_as::<_, LinkedAnnotationRow>(&query)
            .bind(parent_kind.as_str())
            .bind(parent_id)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Links on every ROI of `image_id` joined with their annotations.
    pub async fn list_for_image_rois(
        pool: &PgPool,
        image_id: DbId,
        owner_id: Option<DbId>,
    ) -> Result<Vec<LinkedAnnotationRow>, sqlx::Error> {
        let query = format!(
            "SELECT l.id AS link_id, l.parent_type, l.parent_id, l.owner_id AS link_owner_id, \
                    {ANNOTATION_COLUMNS} \
             FROM annotation_links l \
             JOIN annotations a ON a.id = l.annotation_id \
             JOIN rois r ON r.id = l.parent_id \
             WHERE l.parent_type = 'roi' AND r.image_id = $1 \
               AND ($2::BIGINT IS NULL OR l.owner_id = $2) \
             ORDER BY l.parent_id, l.id"
        );
        sqlx::query_as::<_, LinkedAnnotationRow>(&query)
            .bind(image_id)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a link unless the owner already links the parent to the annotation.
    ///
    /// Returns `None` when the link exists, including one inserted concurrently.
    pub async fn create(
        pool: &PgPool,
        parent_kind: TargetKind,
        parent_id: DbId,
        annotation_id: DbId,
        owner_id: DbId,
        group_id: Option<DbId>,
    ) -> Result<Option<AnnotationLinkRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO annotation_links (parent_type, parent_id, annotation_id, owner_id, group_id) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (parent_type, parent_id, annotation_id, owner_id) DO NOTHING \
             RETURNING {LINK_COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationLinkRow>(&query)
            .bind(parent_kind.as_str())
            .bind(parent_id)
            .bind(annotation_id)
            .bind(owner_id)
            .bind(group_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete links by id. Returns the number of rows removed.
    pub async fn delete_many(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM annotation_links WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
