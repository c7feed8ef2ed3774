//! Read-only aggregate queries behind the dataset ROI summary.
//!
//! Shape counts only consider shapes with a text value, owned by the given
//! experimenter, on the given images.

use fastmal_core::types::DbId;
use sqlx::PgPool;

use crate::models::counts::{ImageTypeCountRow, TypeCountRow};
use crate::models::hierarchy::ImageNameRow;

/// Provides the dataset projection queries.
pub struct ProjectionRepo;

impl ProjectionRepo {
    /// Images of `dataset_id` linked to a tag valued `tag_value`.
    pub async fn annotatable_images(
        pool: &PgPool,
        dataset_id: DbId,
        tag_value: &str,
    ) -> Result<Vec<ImageNameRow>, sqlx::Error> {
        sqlx::query_as::<_, ImageNameRow>(
            "SELECT DISTINCT i.id, i.name \
             FROM images i \
             JOIN annotation_links l ON l.parent_type = 'image' AND l.parent_id = i.id \
             JOIN annotations a ON a.id = l.annotation_id \
             WHERE i.dataset_id = $1 AND a.kind = 'tag' AND a.text_value = $2 \
             ORDER BY i.name, i.id",
        )
        .bind(dataset_id)
        .bind(tag_value)
        .fetch_all(pool)
        .await
    }

    pub async fn shape_counts_by_type(
        pool: &PgPool,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> Result<Vec<TypeCountRow>, sqlx::Error> {
        sqlx::query_as::<_, TypeCountRow>(
            "SELECT s.text_value AS label, COUNT(*) AS count \
             FROM shapes s \
             JOIN rois r ON r.id = s.roi_id \
             WHERE r.image_id = ANY($1) AND s.owner_id = $2 AND s.text_value IS NOT NULL \
             GROUP BY s.text_value \
             ORDER BY s.text_value",
        )
        .bind(image_ids)
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    pub async fn shape_counts_by_image(
        pool: &PgPool,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> Result<Vec<ImageTypeCountRow>, sqlx::Error> {
        sqlx::query_as::<_, ImageTypeCountRow>(
            "SELECT r.image_id, s.text_value AS label, COUNT(*) AS count \
             FROM shapes s \
             JOIN rois r ON r.id = s.roi_id \
             WHERE r.image_id = ANY($1) AND s.owner_id = $2 AND s.text_value IS NOT NULL \
             GROUP BY r.image_id, s.text_value \
             ORDER BY r.image_id, s.text_value",
        )
        .bind(image_ids)
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    /// Number of distinct images carrying each shape type.
    pub async fn image_counts_by_type(
        pool: &PgPool,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> Result<Vec<TypeCountRow>, sqlx::Error> {
        sqlx::query_as::<_, TypeCountRow>(
            "SELECT s.text_value AS label, COUNT(DISTINCT r.image_id) AS count \
             FROM shapes s \
             JOIN rois r ON r.id = s.roi_id \
             WHERE r.image_id = ANY($1) AND s.owner_id = $2 AND s.text_value IS NOT NULL \
             GROUP BY s.text_value \
             ORDER BY s.text_value",
        )
        .bind(image_ids)
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    /// Members of `image_ids` linked to a tag valued `tag_value`, optionally
    /// through links owned by `owner_id` only.
    pub async fn images_with_tag(
        pool: &PgPool,
        image_ids: &[DbId],
        tag_value: &str,
        owner_id: Option<DbId>,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT l.parent_id \
             FROM annotation_links l \
             JOIN annotations a ON a.id = l.annotation_id \
             WHERE l.parent_type = 'image' AND l.parent_id = ANY($1) \
               AND a.kind = 'tag' AND a.text_value = $2 \
               AND ($3::BIGINT IS NULL OR l.owner_id = $3) \
             ORDER BY l.parent_id",
        )
        .bind(image_ids)
        .bind(tag_value)
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }
}
