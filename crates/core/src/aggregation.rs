//! Dataset-wide ROI annotation progress for one annotator.
//!
//! [`aggregate_dataset`] restricts a dataset to its annotatable images, then
//! counts the acting user's shapes by type and by image, measures per-type
//! image coverage, collects completion tags, and attaches the project's ROI
//! label dictionary. Any store failure aborts the whole report.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::Serialize;

use crate::annotation::{Markers, TargetRef};
use crate::error::CoreError;
use crate::labels::{resolve_labels, LabelDictionary};
use crate::scope::StoreContext;
use crate::store::{AnnotationStore, ImageSummary, TypeCount};
use crate::types::DbId;

/// Aggregated ROI annotation state of a dataset for the acting user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetReport {
    pub dataset_id: DbId,
    pub dataset_name: String,
    /// Annotatable images, ordered by name then id.
    pub image_ids: Vec<DbId>,
    /// Shape count per type label across the annotatable images.
    pub roi_type_count: BTreeMap<String, u64>,
    /// Shape count per type label for each image. Missing entries are zero.
    pub images_with_rois: BTreeMap<DbId, BTreeMap<String, u64>>,
    /// Number of distinct images carrying at least one shape of each type.
    pub images_per_roi: BTreeMap<String, u64>,
    /// Images the acting user tagged as ROI-complete, in `image_ids` order.
    pub completed_by_user: Vec<DbId>,
    /// Images anyone tagged as ROI-complete, in `image_ids` order.
    pub completed_by_any_user: Vec<DbId>,
    /// Wall-clock seconds spent building the report.
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi_labels: Option<LabelDictionary>,
}

impl DatasetReport {
    /// Per-type shape counts of one image; empty when it has none.
    pub fn image_counts(&self, image_id: DbId) -> BTreeMap<String, u64> {
        self.images_with_rois
            .get(&image_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `image_id` has at least one shape labelled `label`.
    pub fn has_shape_type(&self, image_id: DbId, label: &str) -> bool {
        self.images_with_rois
            .get(&image_id)
            .is_some_and(|counts| counts.contains_key(label))
    }
}

/// Order images by display name, ties broken by id, dropping duplicate ids.
pub fn sort_images(images: &mut Vec<ImageSummary>) {
    images.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    let mut seen = BTreeSet::new();
    images.retain(|image| seen.insert(image.id));
}

/// Members of `ids` present in `matches`, keeping the order of `ids`.
fn retain_order(ids: &[DbId], matches: Vec<DbId>) -> Vec<DbId> {
    let matches: BTreeSet<DbId> = matches.into_iter().collect();
    ids.iter().copied().filter(|id| matches.contains(id)).collect()
}

fn into_count_map(rows: Vec<TypeCount>) -> BTreeMap<String, u64> {
    rows.into_iter()
        .filter(|row| row.count > 0)
        .map(|row| (row.label, row.count))
        .collect()
}

/// Build the [`DatasetReport`] for `dataset_id` as seen by `ctx.user_id`.
pub async fn aggregate_dataset(
    store: &dyn AnnotationStore,
    ctx: &StoreContext,
    dataset_id: DbId,
    markers: &Markers,
) -> Result<DatasetReport, CoreError> {
    let started = Instant::now();

    let dataset_ref = TargetRef::dataset(dataset_id);
    let dataset = store
        .find_object(ctx, dataset_ref)
        .await?
        .ok_or_else(|| dataset_ref.not_found())?;

    let marked = store
        .list_links(ctx, dataset_ref, None)
        .await?
        .iter()
        .any(|linked| linked.annotation.value.as_tag() == Some(markers.dataset_annotate.as_str()));
    if !marked {
        return Err(CoreError::Precondition(format!(
            "Dataset {dataset_id} does not have the '{}' tag",
            markers.dataset_annotate
        )));
    }

    let mut images = store
        .annotatable_images(ctx, dataset_id, &markers.image_annotate)
        .await?;
    sort_images(&mut images);
    let image_ids: Vec<DbId> = images.iter().map(|image| image.id).collect();

    let mut report = DatasetReport {
        dataset_id,
        dataset_name: dataset.name.clone().unwrap_or_default(),
        ..DatasetReport::default()
    };

    if !image_ids.is_empty() {
        let owner_id = ctx.user_id;

        report.roi_type_count =
            into_count_map(store.shape_counts_by_type(ctx, &image_ids, owner_id).await?);

        for row in store.shape_counts_by_image(ctx, &image_ids, owner_id).await? {
            if row.count > 0 {
                report
                    .images_with_rois
                    .entry(row.image_id)
                    .or_default()
                    .insert(row.label, row.count);
            }
        }

        report.images_per_roi =
            into_count_map(store.image_counts_by_type(ctx, &image_ids, owner_id).await?);

        report.completed_by_user = retain_order(
            &image_ids,
            store
                .images_with_tag(ctx, &image_ids, &markers.roi_complete, Some(owner_id))
                .await?,
        );

        report.completed_by_any_user = retain_order(
            &image_ids,
            store
                .images_with_tag(ctx, &image_ids, &markers.roi_complete, None)
                .await?,
        );
    }

    report.roi_labels = resolve_labels(store, ctx, &dataset, &markers.label_file_suffix).await?;
    report.image_ids = image_ids;
    report.execution_time = started.elapsed().as_secs_f64();

    tracing::info!(
        user_id = ctx.user_id,
        dataset_id,
        images = report.image_ids.len(),
        shape_types = report.roi_type_count.len(),
        completed = report.completed_by_user.len(),
        elapsed_secs = report.execution_time,
        "Dataset ROI summary built",
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{DEFAULT_ANNOTATE_TAG, DEFAULT_ROI_COMPLETE_TAG};
    use crate::memory::MemoryStore;
    use assert_matches::assert_matches;

    struct Fixture {
        store: MemoryStore,
        user: i64,
        project: i64,
        dataset: i64,
        annotate_tag: i64,
        complete_tag: i64,
    }

    fn ctx(user_id: i64) -> StoreContext {
        StoreContext {
            user_id,
            group_id: None,
        }
    }

    fn counts(items: &[(&str, u64)]) -> BTreeMap<String, u64> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    /// A project with one dataset carrying the annotate tag.
    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;
        let project = store.add_project("Malaria", user).await;
        let dataset = store.add_dataset("Thick films", Some(project), user).await;
        let annotate_tag = store.add_tag(DEFAULT_ANNOTATE_TAG, user, None).await;
        let complete_tag = store.add_tag(DEFAULT_ROI_COMPLETE_TAG, user, None).await;
        store
            .add_link(TargetRef::dataset(dataset), annotate_tag, user)
            .await;
        Fixture {
            store,
            user,
            project,
            dataset,
            annotate_tag,
            complete_tag,
        }
    }

    impl Fixture {
        async fn annotatable_image(&self, name: &str) -> i64 {
            let image = self.store.add_image(name, self.dataset, self.user).await;
            self.store
                .add_link(TargetRef::image(image), self.annotate_tag, self.user)
                .await;
            image
        }

        async fn draw(&self, image: i64, owner: i64, labels: &[&str]) {
            let roi = self.store.add_roi(image, owner).await;
            for label in labels {
                self.store.add_shape(roi, Some(label), owner).await;
            }
        }
    }

    #[tokio::test]
    async fn counts_shapes_per_type_and_image() {
        let f = fixture().await;
        let img1 = f.annotatable_image("Img1").await;
        let img2 = f.annotatable_image("Img2").await;
        f.draw(img1, f.user, &["nucleus", "nucleus", "cell"]).await;
        f.draw(img2, f.user, &["cell"]).await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert_eq!(report.image_ids, vec![img1, img2]);
        assert_eq!(report.dataset_name, "Thick films");
        assert_eq!(
            report.roi_type_count,
            counts(&[("nucleus", 2), ("cell", 2)])
        );
        assert_eq!(
            report.images_with_rois[&img1],
            counts(&[("nucleus", 2), ("cell", 1)])
        );
        assert_eq!(report.images_with_rois[&img2], counts(&[("cell", 1)]));
        assert_eq!(report.images_per_roi, counts(&[("nucleus", 1), ("cell", 2)]));
        assert!(report.has_shape_type(img1, "nucleus"));
        assert!(!report.has_shape_type(img2, "nucleus"));
        assert!(report.execution_time >= 0.0);
    }

    #[tokio::test]
    async fn missing_dataset_tag_fails_before_any_projection() {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;
        let dataset = store.add_dataset("untagged", None, user).await;

        let err = aggregate_dataset(&store, &ctx(user), dataset, &Markers::default())
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::Precondition(_));
        assert_eq!(store.projection_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_dataset_is_not_found() {
        let f = fixture().await;

        let err = aggregate_dataset(&f.store, &ctx(f.user), 31337, &Markers::default())
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::NotFound { entity: "Dataset", id: 31337 });
    }

    #[tokio::test]
    async fn images_without_marker_are_excluded() {
        let f = fixture().await;
        let marked = f.annotatable_image("marked").await;
        let unmarked = f.store.add_image("unmarked", f.dataset, f.user).await;
        f.draw(marked, f.user, &["cell"]).await;
        f.draw(unmarked, f.user, &["cell", "cell"]).await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert_eq!(report.image_ids, vec![marked]);
        assert_eq!(report.roi_type_count, counts(&[("cell", 1)]));
        assert!(!report.images_with_rois.contains_key(&unmarked));
    }

    #[tokio::test]
    async fn other_users_shapes_are_not_counted() {
        let f = fixture().await;
        let other = f.store.add_user("second", "Second Reader").await;
        let image = f.annotatable_image("shared").await;
        let only_theirs = f.annotatable_image("theirs").await;
        f.draw(image, f.user, &["parasite"]).await;
        f.draw(image, other, &["parasite", "white_cell"]).await;
        f.draw(only_theirs, other, &["white_cell"]).await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert_eq!(report.roi_type_count, counts(&[("parasite", 1)]));
        assert_eq!(report.images_per_roi, counts(&[("parasite", 1)]));
        assert!(!report.images_with_rois.contains_key(&only_theirs));
    }

    #[tokio::test]
    async fn image_order_follows_names_not_insertion() {
        let f = fixture().await;
        let c = f.annotatable_image("c-slide").await;
        let a = f.annotatable_image("a-slide").await;
        let b2 = f.annotatable_image("b-slide").await;
        let b1 = f.annotatable_image("b-slide").await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert!(b2 < b1);
        assert_eq!(report.image_ids, vec![a, b2, b1, c]);
    }

    #[test]
    fn sort_images_breaks_ties_by_id_and_drops_duplicates() {
        let mut images = vec![
            ImageSummary { id: 9, name: "b".into() },
            ImageSummary { id: 3, name: "b".into() },
            ImageSummary { id: 5, name: "a".into() },
            ImageSummary { id: 3, name: "b".into() },
        ];
        sort_images(&mut images);
        let ids: Vec<_> = images.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![5, 3, 9]);
    }

    #[tokio::test]
    async fn completion_is_reported_per_user_and_dataset_wide() {
        let f = fixture().await;
        let other = f.store.add_user("second", "Second Reader").await;
        let mine = f.annotatable_image("mine").await;
        let theirs = f.annotatable_image("theirs").await;
        f.store
            .add_link(TargetRef::image(mine), f.complete_tag, f.user)
            .await;
        f.store
            .add_link(TargetRef::image(theirs), f.complete_tag, other)
            .await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert_eq!(report.completed_by_user, vec![mine]);
        assert_eq!(report.completed_by_any_user, vec![mine, theirs]);
    }

    #[tokio::test]
    async fn completion_lists_follow_image_order() {
        let f = fixture().await;
        let other = f.store.add_user("second", "Second Reader").await;
        let late = f.annotatable_image("z-slide").await;
        let early = f.annotatable_image("a-slide").await;
        for (image, owner) in [(late, f.user), (early, f.user), (early, other)] {
            f.store
                .add_link(TargetRef::image(image), f.complete_tag, owner)
                .await;
        }

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert!(late < early);
        assert_eq!(report.image_ids, vec![early, late]);
        assert_eq!(report.completed_by_user, vec![early, late]);
        assert_eq!(report.completed_by_any_user, vec![early, late]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["completed_by_user"], serde_json::json!([early, late]));
    }

    #[tokio::test]
    async fn empty_annotatable_set_skips_projections() {
        let f = fixture().await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert!(report.image_ids.is_empty());
        assert!(report.roi_type_count.is_empty());
        assert_eq!(f.store.projection_calls(), 1);
    }

    #[tokio::test]
    async fn label_file_is_attached_when_present() {
        let f = fixture().await;
        let file = f
            .store
            .add_file(
                "Malaria_RoiLabels.json",
                br#"{"FASTMAL:PARASITE": "Parasite"}"#,
                f.user,
            )
            .await;
        f.store
            .add_link(TargetRef::project(f.project), file, f.user)
            .await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        let labels = report.roi_labels.expect("labels should be resolved");
        assert_eq!(labels["FASTMAL:PARASITE"], "Parasite");
    }

    #[tokio::test]
    async fn absent_label_file_omits_field() {
        let f = fixture().await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert!(report.roi_labels.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("roi_labels").is_none());
    }

    #[tokio::test]
    async fn malformed_label_file_fails_the_report() {
        let f = fixture().await;
        let file = f
            .store
            .add_file("Malaria_RoiLabels.json", b"{'a': 1}", f.user)
            .await;
        f.store
            .add_link(TargetRef::project(f.project), file, f.user)
            .await;

        let err = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::MalformedLabelFile { .. });
    }

    #[tokio::test]
    async fn duplicate_label_files_are_ambiguous() {
        let f = fixture().await;
        for _ in 0..2 {
            let file = f
                .store
                .add_file("Malaria_RoiLabels.json", b"{}", f.user)
                .await;
            f.store
                .add_link(TargetRef::project(f.project), file, f.user)
                .await;
        }

        let err = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::AmbiguousLabelFile { matches, .. } if matches.len() == 2);
    }

    #[tokio::test]
    async fn store_failure_mid_pipeline_aborts() {
        let f = fixture().await;
        let image = f.annotatable_image("img").await;
        f.draw(image, f.user, &["cell"]).await;
        f.store.fail_operation("image_counts_by_type").await;

        let err = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::Store(_));
    }

    #[tokio::test]
    async fn unlabelled_shapes_are_ignored() {
        let f = fixture().await;
        let image = f.annotatable_image("img").await;
        let roi = f.store.add_roi(image, f.user).await;
        f.store.add_shape(roi, None, f.user).await;
        f.store.add_shape(roi, Some("cell"), f.user).await;

        let report = aggregate_dataset(&f.store, &ctx(f.user), f.dataset, &Markers::default())
            .await
            .unwrap();

        assert_eq!(report.roi_type_count, counts(&[("cell", 1)]));
        assert_eq!(report.image_counts(image), counts(&[("cell", 1)]));
    }
}
