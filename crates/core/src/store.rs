//! The annotation store contract.
//!
//! Object storage and query execution live behind [`AnnotationStore`]. The
//! synchronization primitives and the aggregation pipeline only ever talk to
//! the store through this trait, so the same logic runs against Postgres
//! (`fastmal-db`) and the in-memory store used in tests.
//!
//! Every method takes the [`StoreContext`] of the active scope. Creations are
//! owned by `ctx.user_id` and placed in `ctx.group_id`.

use async_trait::async_trait;
use serde::Serialize;

use crate::annotation::{
    Annotation, AnnotationLink, AnnotationValue, LinkedAnnotation, ObjectInfo, TargetRef, User,
};
use crate::error::CoreError;
use crate::scope::StoreContext;
use crate::types::DbId;

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, CoreError>;

// ---------------------------------------------------------------------------
// Projection rows
// ---------------------------------------------------------------------------

/// An image id with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub id: DbId,
    pub name: String,
}

/// A count grouped by shape type label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCount {
    pub label: String,
    pub count: u64,
}

/// A shape count grouped by (image, shape type label).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTypeCount {
    pub image_id: DbId,
    pub label: String,
    pub count: u64,
}

/// A namespaced comment entity and whether this call created it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsuredComment {
    pub annotation: Annotation,
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Cheap reachability check.
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user(&self, ctx: &StoreContext, user_id: DbId) -> StoreResult<Option<User>>;

    async fn find_object(
        &self,
        ctx: &StoreContext,
        target: TargetRef,
    ) -> StoreResult<Option<ObjectInfo>>;

    /// Tag annotations whose value equals `value`, restricted to the active scope.
    async fn find_tags(&self, ctx: &StoreContext, value: &str) -> StoreResult<Vec<Annotation>>;

    /// Links on `target` in creation order, optionally restricted to one owner.
    async fn list_links(
        &self,
        ctx: &StoreContext,
        target: TargetRef,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<LinkedAnnotation>>;

    /// Links on every ROI of `image_id`, optionally restricted to one owner.
    async fn list_roi_links(
        &self,
        ctx: &StoreContext,
        image_id: DbId,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<LinkedAnnotation>>;

    /// Every comment annotation in `namespace`, store-wide.
    async fn find_comments(
        &self,
        ctx: &StoreContext,
        namespace: &str,
    ) -> StoreResult<Vec<Annotation>>;

    /// File annotations named `name` linked to `target`.
    async fn find_file_annotations(
        &self,
        ctx: &StoreContext,
        target: TargetRef,
        name: &str,
    ) -> StoreResult<Vec<Annotation>>;

    async fn file_content(&self, ctx: &StoreContext, annotation_id: DbId) -> StoreResult<Vec<u8>>;

    async fn create_annotation(
        &self,
        ctx: &StoreContext,
        value: AnnotationValue,
    ) -> StoreResult<Annotation>;

    /// The comment with `text` in `namespace`, created if absent.
    ///
    /// Concurrent calls with the same text resolve to one entity.
    async fn ensure_comment(
        &self,
        ctx: &StoreContext,
        namespace: &str,
        text: &str,
    ) -> StoreResult<EnsuredComment>;

    async fn update_annotation(
        &self,
        ctx: &StoreContext,
        annotation_id: DbId,
        value: AnnotationValue,
    ) -> StoreResult<Annotation>;

    /// Link `target` to the annotation as `ctx.user_id`.
    ///
    /// Returns `None` when that owner already has this link.
    async fn create_link(
        &self,
        ctx: &StoreContext,
        target: TargetRef,
        annotation_id: DbId,
    ) -> StoreResult<Option<AnnotationLink>>;

    /// Delete the given links. Returns the number removed.
    async fn delete_links(&self, ctx: &StoreContext, link_ids: &[DbId]) -> StoreResult<u64>;

    // -- Projections --------------------------------------------------------

    /// Images of `dataset_id` carrying a tag link to a tag valued `tag_value`.
    async fn annotatable_images(
        &self,
        ctx: &StoreContext,
        dataset_id: DbId,
        tag_value: &str,
    ) -> StoreResult<Vec<ImageSummary>>;

    /// Shapes owned by `owner_id` on `image_ids`, counted per type label.
    async fn shape_counts_by_type(
        &self,
        ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<TypeCount>>;

    /// Shapes owned by `owner_id` on `image_ids`, counted per (image, type label).
    async fn shape_counts_by_image(
        &self,
        ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<ImageTypeCount>>;

    /// Distinct images per type label among shapes owned by `owner_id`.
    async fn image_counts_by_type(
        &self,
        ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<TypeCount>>;

    /// Members of `image_ids` linked to a tag valued `tag_value`, optionally
    /// only through links owned by `owner_id`.
    async fn images_with_tag(
        &self,
        ctx: &StoreContext,
        image_ids: &[DbId],
        tag_value: &str,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<DbId>>;
}
