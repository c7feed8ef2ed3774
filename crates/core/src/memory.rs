//! In-memory implementation of [`AnnotationStore`].
//!
//! Mirrors the Postgres store's uniqueness rules (one link per
//! (target, annotation, owner), one comment per (namespace, text)) so the
//! synchronization primitives can be exercised without a database. Used by
//! unit tests, API integration tests and local development.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::annotation::{
    Annotation, AnnotationLink, AnnotationValue, LinkedAnnotation, ObjectInfo, TargetKind,
    TargetRef, User,
};
use crate::error::CoreError;
use crate::scope::StoreContext;
use crate::store::{
    AnnotationStore, EnsuredComment, ImageSummary, ImageTypeCount, StoreResult, TypeCount,
};
use crate::types::DbId;

#[derive(Debug, Clone)]
struct ShapeRecord {
    roi_id: DbId,
    text_value: Option<String>,
    owner_id: DbId,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: DbId,
    users: BTreeMap<DbId, User>,
    objects: BTreeMap<TargetRef, ObjectInfo>,
    shapes: BTreeMap<DbId, ShapeRecord>,
    annotations: BTreeMap<DbId, Annotation>,
    links: BTreeMap<DbId, AnnotationLink>,
    files: HashMap<DbId, Vec<u8>>,
    failing: Option<&'static str>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, operation: &'static str) -> StoreResult<()> {
        match self.failing {
            Some(op) if op == operation => Err(CoreError::Store(format!(
                "injected failure in {operation}"
            ))),
            _ => Ok(()),
        }
    }

    fn insert_object(
        &mut self,
        kind: TargetKind,
        name: Option<&str>,
        parent_id: Option<DbId>,
        owner_id: DbId,
    ) -> DbId {
        let id = self.allocate_id();
        self.objects.insert(
            TargetRef::new(kind, id),
            ObjectInfo {
                kind,
                id,
                name: name.map(str::to_string),
                parent_id,
                owner_id,
            },
        );
        id
    }

    fn linked(&self, link: &AnnotationLink) -> Option<LinkedAnnotation> {
        self.annotations
            .get(&link.annotation_id)
            .map(|annotation| LinkedAnnotation {
                link: link.clone(),
                annotation: annotation.clone(),
            })
    }

    fn image_of_shape(&self, shape: &ShapeRecord) -> Option<DbId> {
        self.objects
            .get(&TargetRef::roi(shape.roi_id))
            .and_then(|roi| roi.parent_id)
    }

    /// Labelled shapes owned by `owner_id` on `image_ids`, as (image, label).
    fn owned_shapes<'a>(
        &'a self,
        image_ids: &'a [DbId],
        owner_id: DbId,
    ) -> impl Iterator<Item = (DbId, &'a str)> + 'a {
        self.shapes.values().filter_map(move |shape| {
            if shape.owner_id != owner_id {
                return None;
            }
            let label = shape.text_value.as_deref()?;
            let image_id = self.image_of_shape(shape)?;
            image_ids.contains(&image_id).then_some((image_id, label))
        })
    }

    fn has_tag_link(&self, target: TargetRef, tag_value: &str, owner_id: Option<DbId>) -> bool {
        self.links.values().any(|link| {
            link.target == target
                && owner_id.map_or(true, |owner| link.owner_id == owner)
                && self
                    .annotations
                    .get(&link.annotation_id)
                    .and_then(|a| a.value.as_tag())
                    == Some(tag_value)
        })
    }
}

/// Annotation store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    projections: AtomicUsize,
    yielding: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Seeding ------------------------------------------------------------

    pub async fn add_user(&self, name: &str, full_name: &str) -> DbId {
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        state.users.insert(
            id,
            User {
                id,
                name: name.to_string(),
                full_name: full_name.to_string(),
            },
        );
        id
    }

    pub async fn add_project(&self, name: &str, owner_id: DbId) -> DbId {
        let mut state = self.state.write().await;
        state.insert_object(TargetKind::Project, Some(name), None, owner_id)
    }

    pub async fn add_dataset(&self, name: &str, project_id: Option<DbId>, owner_id: DbId) -> DbId {
        let mut state = self.state.write().await;
        state.insert_object(TargetKind::Dataset, Some(name), project_id, owner_id)
    }

    pub async fn add_image(&self, name: &str, dataset_id: DbId, owner_id: DbId) -> DbId {
        let mut state = self.state.write().await;
        state.insert_object(TargetKind::Image, Some(name), Some(dataset_id), owner_id)
    }

    pub async fn add_roi(&self, image_id: DbId, owner_id: DbId) -> DbId {
        let mut state = self.state.write().await;
        state.insert_object(TargetKind::Roi, None, Some(image_id), owner_id)
    }

    pub async fn add_shape(&self, roi_id: DbId, text_value: Option<&str>, owner_id: DbId) -> DbId {
        let mut state = self.state.write().await;
        let id = state.insert_object(TargetKind::Shape, None, Some(roi_id), owner_id);
        state.shapes.insert(
            id,
            ShapeRecord {
                roi_id,
                text_value: text_value.map(str::to_string),
                owner_id,
            },
        );
        id
    }

    pub async fn add_annotation(
        &self,
        owner_id: DbId,
        group_id: Option<DbId>,
        value: AnnotationValue,
    ) -> DbId {
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        state.annotations.insert(
            id,
            Annotation {
                id,
                owner_id,
                group_id,
                value,
            },
        );
        id
    }

    pub async fn add_tag(&self, value: &str, owner_id: DbId, group_id: Option<DbId>) -> DbId {
        self.add_annotation(
            owner_id,
            group_id,
            AnnotationValue::Tag {
                value: value.to_string(),
            },
        )
        .await
    }

    pub async fn add_file(&self, name: &str, content: &[u8], owner_id: DbId) -> DbId {
        let id = self
            .add_annotation(
                owner_id,
                None,
                AnnotationValue::File {
                    name: name.to_string(),
                    mimetype: Some("application/json".to_string()),
                    size: content.len() as i64,
                },
            )
            .await;
        self.state.write().await.files.insert(id, content.to_vec());
        id
    }

    pub async fn add_link(&self, target: TargetRef, annotation_id: DbId, owner_id: DbId) -> DbId {
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        state.links.insert(
            id,
            AnnotationLink {
                id,
                target,
                annotation_id,
                owner_id,
            },
        );
        id
    }

    /// Make every later call to `operation` fail with a store error.
    pub async fn fail_operation(&self, operation: &'static str) {
        self.state.write().await.failing = Some(operation);
    }

    /// Yield to the scheduler before every store call, so concurrently
    /// polled callers interleave the way they would over a network.
    pub fn yield_between_calls(&self) {
        self.yielding.store(true, Ordering::Relaxed);
    }

    async fn pause(&self) {
        if self.yielding.load(Ordering::Relaxed) {
            tokio::task::yield_now().await;
        }
    }

    async fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.pause().await;
        self.state.read().await
    }

    async fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.pause().await;
        self.state.write().await
    }

    // -- Inspection ---------------------------------------------------------

    pub async fn links_on(&self, target: TargetRef) -> Vec<AnnotationLink> {
        let state = self.state.read().await;
        state
            .links
            .values()
            .filter(|link| link.target == target)
            .cloned()
            .collect()
    }

    pub async fn annotation(&self, id: DbId) -> Option<Annotation> {
        self.state.read().await.annotations.get(&id).cloned()
    }

    pub async fn annotations(&self) -> Vec<Annotation> {
        self.state.read().await.annotations.values().cloned().collect()
    }

    /// Number of projection queries served so far.
    pub fn projection_calls(&self) -> usize {
        self.projections.load(Ordering::Relaxed)
    }

    fn count_projection(&self) {
        self.projections.fetch_add(1, Ordering::Relaxed);
    }
}

fn tally_by_label<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<TypeCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, count)| TypeCount {
            label: label.to_string(),
            count,
        })
        .collect()
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.read().await.check("ping")
    }

    async fn find_user(&self, _ctx: &StoreContext, user_id: DbId) -> StoreResult<Option<User>> {
        let state = self.read().await;
        state.check("find_user")?;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn find_object(
        &self,
        _ctx: &StoreContext,
        target: TargetRef,
    ) -> StoreResult<Option<ObjectInfo>> {
        let state = self.read().await;
        state.check("find_object")?;
        Ok(state.objects.get(&target).cloned())
    }

    async fn find_tags(&self, ctx: &StoreContext, value: &str) -> StoreResult<Vec<Annotation>> {
        let state = self.read().await;
        state.check("find_tags")?;
        Ok(state
            .annotations
            .values()
            .filter(|a| a.value.as_tag() == Some(value))
            .filter(|a| ctx.group_id.is_none() || a.group_id == ctx.group_id)
            .cloned()
            .collect())
    }

    async fn list_links(
        &self,
        _ctx: &StoreContext,
        target: TargetRef,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<LinkedAnnotation>> {
        let state = self.read().await;
        state.check("list_links")?;
        Ok(state
            .links
            .values()
            .filter(|link| link.target == target)
            .filter(|link| owner_id.map_or(true, |owner| link.owner_id == owner))
            .filter_map(|link| state.linked(link))
            .collect())
    }

    async fn list_roi_links(
        &self,
        _ctx: &StoreContext,
        image_id: DbId,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<LinkedAnnotation>> {
        let state = self.read().await;
        state.check("list_roi_links")?;
        let rois: BTreeSet<TargetRef> = state
            .objects
            .values()
            .filter(|o| o.kind == TargetKind::Roi && o.parent_id == Some(image_id))
            .map(|o| TargetRef::roi(o.id))
            .collect();
        Ok(state
            .links
            .values()
            .filter(|link| rois.contains(&link.target))
            .filter(|link| owner_id.map_or(true, |owner| link.owner_id == owner))
            .filter_map(|link| state.linked(link))
            .collect())
    }

    async fn find_comments(
        &self,
        _ctx: &StoreContext,
        namespace: &str,
    ) -> StoreResult<Vec<Annotation>> {
        let state = self.read().await;
        state.check("find_comments")?;
        Ok(state
            .annotations
            .values()
            .filter(|a| a.value.comment_in(namespace).is_some())
            .cloned()
            .collect())
    }

    async fn find_file_annotations(
        &self,
        _ctx: &StoreContext,
        target: TargetRef,
        name: &str,
    ) -> StoreResult<Vec<Annotation>> {
        let state = self.read().await;
        state.check("find_file_annotations")?;
        Ok(state
            .links
            .values()
            .filter(|link| link.target == target)
            .filter_map(|link| state.annotations.get(&link.annotation_id))
            .filter(|a| matches!(&a.value, AnnotationValue::File { name: n, .. } if n == name))
            .cloned()
            .collect())
    }

    async fn file_content(&self, _ctx: &StoreContext, annotation_id: DbId) -> StoreResult<Vec<u8>> {
        let state = self.read().await;
        state.check("file_content")?;
        state
            .files
            .get(&annotation_id)
            .cloned()
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
        let mut state = self.write().await;
        state.check("create_annotation")?;
        if let AnnotationValue::Comment {
            text,
            namespace: Some(ns),
        } = &value
        {
            let duplicate = state
                .annotations
                .values()
                .any(|a| a.value.comment_in(ns) == Some(text.as_str()));
            if duplicate {
                return Err(CoreError::Store(format!(
                    "duplicate comment '{text}' in namespace '{ns}'"
                )));
            }
        }
        let id = state.allocate_id();
        let annotation = Annotation {
            id,
            owner_id: ctx.user_id,
            group_id: ctx.group_id,
            value,
        };
        state.annotations.insert(id, annotation.clone());
        Ok(annotation)
    }

    async fn ensure_comment(
        &self,
        ctx: &StoreContext,
        namespace: &str,
        text: &str,
    ) -> StoreResult<EnsuredComment> {
        let mut state = self.write().await;
        state.check("ensure_comment")?;
        let existing = state
            .annotations
            .values()
            .find(|a| a.value.comment_in(namespace) == Some(text))
            .cloned();
        if let Some(annotation) = existing {
            return Ok(EnsuredComment {
                annotation,
                created: false,
            });
        }
        let id = state.allocate_id();
        let annotation = Annotation {
            id,
            owner_id: ctx.user_id,
            group_id: ctx.group_id,
            value: AnnotationValue::Comment {
                text: text.to_string(),
                namespace: Some(namespace.to_string()),
            },
        };
        state.annotations.insert(id, annotation.clone());
        Ok(EnsuredComment {
            annotation,
            created: true,
        })
    }

    async fn update_annotation(
        &self,
        _ctx: &StoreContext,
        annotation_id: DbId,
        value: AnnotationValue,
    ) -> StoreResult<Annotation> {
        let mut state = self.write().await;
        state.check("update_annotation")?;
        let annotation = state
            .annotations
            .get_mut(&annotation_id)
            .ok_or(CoreError::NotFound {
                entity: "Annotation",
                id: annotation_id,
            })?;
        annotation.value = value;
        Ok(annotation.clone())
    }

    async fn create_link(
        &self,
        ctx: &StoreContext,
        target: TargetRef,
        annotation_id: DbId,
    ) -> StoreResult<Option<AnnotationLink>> {
        let mut state = self.write().await;
        state.check("create_link")?;
        if !state.annotations.contains_key(&annotation_id) {
            return Err(CoreError::NotFound {
                entity: "Annotation",
                id: annotation_id,
            });
        }
        let duplicate = state.links.values().any(|link| {
            link.target == target
                && link.annotation_id == annotation_id
                && link.owner_id == ctx.user_id
        });
        if duplicate {
            return Ok(None);
        }
        let id = state.allocate_id();
        let link = AnnotationLink {
            id,
            target,
            annotation_id,
            owner_id: ctx.user_id,
        };
        state.links.insert(id, link.clone());
        Ok(Some(link))
    }

    async fn delete_links(&self, _ctx: &StoreContext, link_ids: &[DbId]) -> StoreResult<u64> {
        let mut state = self.write().await;
        state.check("delete_links")?;
        let removed = link_ids
            .iter()
            .filter(|id| state.links.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn annotatable_images(
        &self,
        _ctx: &StoreContext,
        dataset_id: DbId,
        tag_value: &str,
    ) -> StoreResult<Vec<ImageSummary>> {
        self.count_projection();
        let state = self.read().await;
        state.check("annotatable_images")?;
        Ok(state
            .objects
            .values()
            .filter(|o| o.kind == TargetKind::Image && o.parent_id == Some(dataset_id))
            .filter(|o| state.has_tag_link(TargetRef::image(o.id), tag_value, None))
            .map(|o| ImageSummary {
                id: o.id,
                name: o.name.clone().unwrap_or_default(),
            })
            .collect())
    }

    async fn shape_counts_by_type(
        &self,
        _ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<TypeCount>> {
        self.count_projection();
        let state = self.read().await;
        state.check("shape_counts_by_type")?;
        Ok(tally_by_label(
            state.owned_shapes(image_ids, owner_id).map(|(_, label)| label),
        ))
    }

    async fn shape_counts_by_image(
        &self,
        _ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<ImageTypeCount>> {
        self.count_projection();
        let state = self.read().await;
        state.check("shape_counts_by_image")?;
        let mut counts: BTreeMap<(DbId, &str), u64> = BTreeMap::new();
        for key in state.owned_shapes(image_ids, owner_id) {
            *counts.entry(key).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((image_id, label), count)| ImageTypeCount {
                image_id,
                label: label.to_string(),
                count,
            })
            .collect())
    }

    async fn image_counts_by_type(
        &self,
        _ctx: &StoreContext,
        image_ids: &[DbId],
        owner_id: DbId,
    ) -> StoreResult<Vec<TypeCount>> {
        self.count_projection();
        let state = self.read().await;
        state.check("image_counts_by_type")?;
        let distinct: BTreeSet<(DbId, &str)> = state.owned_shapes(image_ids, owner_id).collect();
        Ok(tally_by_label(distinct.into_iter().map(|(_, label)| label)))
    }

    async fn images_with_tag(
        &self,
        _ctx: &StoreContext,
        image_ids: &[DbId],
        tag_value: &str,
        owner_id: Option<DbId>,
    ) -> StoreResult<Vec<DbId>> {
        self.count_projection();
        let state = self.read().await;
        state.check("images_with_tag")?;
        Ok(image_ids
            .iter()
            .copied()
            .filter(|id| state.has_tag_link(TargetRef::image(*id), tag_value, owner_id))
            .collect())
    }
}
