//! Postgres-backed [`AnnotationStore`].

use async_trait::async_trait;
use fastmal_core::annotation::{
    Annotation, AnnotationLink, AnnotationValue, LinkedAnnotation, ObjectInfo, TargetRef, User,
};
use fastmal_core::error::CoreError;
use fastmal_core::scope::StoreContext;
use fastmal_core::store::{
    AnnotationStore, EnsuredComment, ImageSummary, ImageTypeCount, StoreResult, TypeCount,
};
use fastmal_core::types::DbId;

use crate::models::annotation::AnnotationRow;
use crate::models::link::LinkedAnnotationRow;
use crate::repositories::{
    AnnotationLinkRepo, AnnotationRepo, ExperimenterRepo, HierarchyRepo, ProjectionRepo,
};
use crate::DbPool;

/// Convert a sqlx failure into the store error surfaced to callers.
fn store_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Annotation store query failed");
    CoreError::Store(err.to_string())
}

fn annotations(rows: Vec<AnnotationRow>) -> StoreResult<Vec<Annotation>> {
    rows.into_iter().map(Annotation::try_from).collect()
}

fn linked(rows: Vec<LinkedAnnotationRow>) -> StoreResult<Vec<LinkedAnnotation>> {
    rows.into_iter().map(LinkedAnnotation::try_from).collect()
}

/// [`AnnotationStore`] over a Postgres pool.
#[derive(Clone)]
pub struct PgAnnotationStore {
    pool: DbPool,
}

impl PgAnnotationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl AnnotationStore for PgAnnotationStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }

    async fn find_user(&self, _ctx: &StoreContext, user_id: DbId) -> StoreResult<Option<User>> {
        let row = ExperimenterRepo::find_by_id(&self.pool, user_id)
            .await
            .map_err(store_error)?;
        Ok(row.map(User::from))
    }

    async fn find_object(
        &self,
        _ctx: &StoreContext,
        target: TargetRef,
    ) -> StoreResult<Option<ObjectInfo>> {
        let row = HierarchyRepo::find(&self.pool, target.kind, target.id)
            .await
            .map_err(store_error)?;
        Ok(row.map(|r| r.into_info(target.kind)))
    }

    async fn find_tags(&self, ctx: &StoreContext, value: &str) -> StoreResult<Vec<Annotation>> {
        let rows = AnnotationRepo::find_tags(&self.pool, value, ctx.group_id)
            .await
            .map_err(store_error)?;
        annotations(rows)
    }

    async fn list_links(
        &self,
        _ctx: &StoreContext,
        target: TargetRef,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<LinkedAnnotation>> {
        let rows = AnnotationLinkRepo::list_for_parent(&self.pool, target.kind, target.id, owner_id)
            .await
            .map_err(store_error)?;
        linked(rows)
    }

    async fn list_roi_links(
        &self,
        _ctx: &StoreContext,
        image_id: DbId,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<LinkedAnnotation>> {
        let rows = AnnotationLinkRepo::list_for_image_rois(&self.pool, image_id, owner_id)
            .await
            .map_err(store_error)?;
        linked(rows)
    }

    async fn find_comments(
        &self,
        _ctx: &StoreContext,
        namespace: &str,
    ) -> StoreResult<Vec<Annotation>> {
        let rows = AnnotationRepo::find_comments(&self.pool, namespace)
            .await
            .map_err(store_error)?;
        annotations(rows)
    }

    async fn find_file_annotations(
        &self,
        _ctx: &StoreContext,
        target: TargetRef,
        name: &str,
    ) -> StoreResult<Vec<Annotation>> {
        let rows = AnnotationRepo::find_files_on(&self.pool, target.kind, target.id, name)
            .await
            .map_err(store_error)?;
        annotations(rows)
    }

    async fn file_content(&self, _ctx: &StoreContext, annotation_id: DbId) -> StoreResult<Vec<u8>> {
        AnnotationRepo::file_content(&self.pool, annotation_id)
            .await
            .map_err(store_error)?
            .ok_or(CoreError::NotFound {
                entity: "FileAnnotation",
                id: annotation_id,
            })
    }

    async fn create_annotation(
        &self,
        ctx: &StoreContext,
        value: AnnotationValue,
    ) -> StoreResult<Annotation> {
        let row = AnnotationRepo::create(&self.pool, &value, ctx.user_id, ctx.group_id)
            .await
            .map_err(store_error)?;
        row.try_into()
    }

    async fn ensure_comment(
        &self,
        ctx: &StoreContext,
        namespace: &str,
        text: &str,
    ) -> StoreResult<EnsuredComment> {
        let inserted =
            AnnotationRepo::create_comment(&self.pool, namespace, text, ctx.user_id, ctx.group_id)
                .await
                .map_err(store_error)?;
        if let Some(row) = inserted {
            return Ok(EnsuredComment {
                annotation: row.try_into()?,
                created: true,
            });
        }
        let row = AnnotationRepo::find_comment(&self.pool, namespace, text)
            .await
            .map_err(store_error)?
            .ok_or_else(|| {
                CoreError::Store(format!(
                    "comment '{text}' in namespace '{namespace}' vanished after insert conflict"
                ))
            })?;
        Ok(EnsuredComment {
            annotation: row.try_into()?,
            created: false,
        })
    }

    async fn update_annotation(
        &self,
        _ctx: &StoreContext,
        annotation_id: DbId,
        value: AnnotationValue,
    ) -> StoreResult<Annotation> {
        AnnotationRepo::update(&self.pool, annotation_id, &value)
            .await
            .map_err(store_error)?
            .ok_or(CoreError::NotFound {
                entity: "Annotation",
                id: annotation_id,
            })?
            .try_into()
    }

    async fn create_link(
        &self,
        ctx: &StoreContext,
        target: TargetRef,
        annotation_id: DbId,
    ) -> StoreResult<Option<AnnotationLink>> {
        let row = AnnotationLinkRepo::create(
            &self.pool,
            target.kind,
            target.id,
            annotation_id,
            ctx.user_id,
            ctx.group_id,
        )
        .await
        .map_err(store_error)?;
        row.map(AnnotationLink::try_from).transpose()
    }

    async fn delete_links(&self, _ctx: &StoreContext, link_ids: &[DbId]) -> StoreResult<u64> {
        AnnotationLinkRepo::delete_many(&self.pool, link_ids)
            .await
            .map_err(store_error)
    }

    async fn annotatable_images(
        &self,
        _ctx: &StoreContext,
        dataset_id: DbId,
        tag_value: &str,
    ) -> StoreResult<Vec<ImageSummary>> {
        let rows = ProjectionRepo::annotatable_images(&self.pool, dataset_id, tag_value)
            .await
            .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|r| ImageSummary {
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    async fn shape_counts_by_type(
        &self,
        _ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<TypeCount>> {
        let rows = ProjectionRepo::shape_counts_by_type(&self.pool, image_ids, owner_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(TypeCount::from).collect())
    }

    async fn shape_counts_by_image(
        &self,
        _ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<ImageTypeCount>> {
        let rows = ProjectionRepo::shape_counts_by_image(&self.pool, image_ids, owner_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(ImageTypeCount::from).collect())
    }

    async fn image_counts_by_type(
        &self,
        _ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<TypeCount>> {
        let rows = ProjectionRepo::image_counts_by_type(&self.pool, image_ids, owner_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(TypeCount::from).collect())
    }

    async fn images_with_tag(
        &self,
        _ctx: &StoreContext,
        image_ids: &[DbId],
        tag_value: &str,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<DbId>> {
        ProjectionRepo::images_with_tag(&self.pool, image_ids, tag_value, owner_id)
            .await
            .map_err(store_error)
    }
}
