//! Repository for the hierarchy tables (`projects`, `datasets`, `images`,
//! `rois`, `shapes`).
//!
//! Lookups normalize every table to [`ObjectRow`] by aliasing the parent key
//! to `parent_id`. The SQL is chosen per [`TargetKind`] from fixed strings.

use fastmal_core::annotation::TargetKind;
use fastmal_core::types::DbId;
use sqlx::PgPool;

use crate::models::hierarchy::{CreateContainer, CreateShape, ObjectRow};

/// Provides lookups and inserts across the annotation target hierarchy.
pub struct HierarchyRepo;

impl HierarchyRepo {
    fn select_by_id(kind: TargetKind) -> &'static str {
        match kind {
            TargetKind::Project => {
                "SELECT id, name, NULL::BIGINT AS parent_id, owner_id FROM projects WHERE id = $1"
            }
            TargetKind::Dataset => {
                "SELECT id, name, project_id AS parent_id, owner_id FROM datasets WHERE id = $1"
            }
            TargetKind::Image => {
                "SELECT id, name, dataset_id AS parent_id, owner_id FROM images WHERE id = $1"
            }
            TargetKind::Roi => {
                "SELECT id, NULL::TEXT AS name, image_id AS parent_id, owner_id FROM rois WHERE id = $1"
            }
            TargetKind::Shape => {
                "SELECT id, NULL::TEXT AS name, roi_id AS parent_id, owner_id FROM shapes WHERE id = $1"
            }
        }
    }

    /// Find one entity of `kind` by id.
    pub async fn find(
        pool: &PgPool,
        kind: TargetKind,
        id: DbId,
    ) -> Result<Option<ObjectRow>, sqlx::Error> {
        sqlx::query_as::<_, ObjectRow>(Self::select_by_id(kind))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_project(pool: &PgPool, input: &CreateContainer) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO projects (name, owner_id, group_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&input.name)
        .bind(input.owner_id)
        .bind(input.group_id)
        .fetch_one(pool)
        .await
    }

    pub async fn create_dataset(pool: &PgPool, input: &CreateContainer) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO datasets (name, project_id, owner_id, group_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&input.name)
        .bind(input.parent_id)
        .bind(input.owner_id)
        .bind(input.group_id)
        .fetch_one(pool)
        .await
    }

    pub async fn create_image(pool: &PgPool, input: &CreateContainer) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO images (name, dataset_id, owner_id, group_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&input.name)
        .bind(input.parent_id)
        .bind(input.owner_id)
        .bind(input.group_id)
        .fetch_one(pool)
        .await
    }

    pub async fn create_roi(
        pool: &PgPool,
        image_id: DbId,
        owner_id: DbId,
        group_id: Option<DbId>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO rois (image_id, owner_id, group_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(image_id)
        .bind(owner_id)
        .bind(group_id)
        .fetch_one(pool)
        .await
    }

    pub async fn create_shape(pool: &PgPool, input: &CreateShape) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO shapes (roi_id, text_value, owner_id, group_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(input.roi_id)
        .bind(input.text_value.as_deref())
        .bind(input.owner_id)
        .bind(input.group_id)
        .fetch_one(pool)
        .await
    }
}
