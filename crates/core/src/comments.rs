//! Namespace-scoped free-text comments on ROIs.
//!
//! Within one namespace, equal text means the same comment entity. Linking a
//! comment reuses the existing entity wherever it was first created and never
//! links the same comment to a target twice.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::annotation::TargetRef;
use crate::error::CoreError;
use crate::scope::StoreContext;
use crate::store::AnnotationStore;
use crate::types::DbId;

/// Result of [`link_comments`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentLinkOutcome {
    /// Every requested comment, all of which are linked to the target now.
    pub linked: BTreeSet<String>,
    /// Requested comments that had to be created in the namespace.
    pub created: BTreeSet<String>,
    /// Requested comments linked by reusing an existing entity.
    pub reused: BTreeSet<String>,
    /// All comments in the namespace now linked to the target.
    pub comments: BTreeSet<String>,
}

/// Split comma-separated input into trimmed, non-empty, distinct comments.
pub fn parse_comment_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Link each comment in `raw_comments` to `target` within `namespace`.
pub async fn link_comments(
    store: &dyn AnnotationStore,
    ctx: &StoreContext,
    target: TargetRef,
    raw_comments: &str,
    namespace: &str,
) -> Result<CommentLinkOutcome, CoreError> {
    store
        .find_object(ctx, target)
        .await?
        .ok_or_else(|| target.not_found())?;

    let requested = parse_comment_list(raw_comments);

    let mut on_target: BTreeSet<String> = store
        .list_links(ctx, target, None)
        .await?
        .into_iter()
        .filter_map(|linked| linked.annotation.value.comment_in(namespace).map(str::to_string))
        .collect();

    let pool: BTreeMap<String, DbId> = store
        .find_comments(ctx, namespace)
        .await?
        .into_iter()
        .filter_map(|a| a.value.comment_in(namespace).map(|text| (text.to_string(), a.id)))
        .collect();

    let mut outcome = CommentLinkOutcome::default();

    for text in &requested {
        if on_target.contains(text) {
            continue;
        }
        let annotation_id = match pool.get(text) {
            Some(id) => {
                outcome.reused.insert(text.clone());
                *id
            }
            None => {
                let ensured = store.ensure_comment(ctx, namespace, text).await?;
                if ensured.created {
                    outcome.created.insert(text.clone());
                } else {
                    outcome.reused.insert(text.clone());
                }
                ensured.annotation.id
            }
        };
        store.create_link(ctx, target, annotation_id).await?;
        on_target.insert(text.clone());
    }

    tracing::info!(
        user_id = ctx.user_id,
        target_kind = target.kind.as_str(),
        target_id = target.id,
        requested = requested.len(),
        created = outcome.created.len(),
        reused = outcome.reused.len(),
        "Comments linked",
    );

    outcome.linked = requested;
    outcome.comments = on_target;
    Ok(outcome)
}

/// Comments in `namespace` on each ROI of `image_id`, keyed by ROI id.
///
/// ROIs without comments are omitted. Each list is sorted.
pub async fn list_roi_comments(
    store: &dyn AnnotationStore,
    ctx: &StoreContext,
    image_id: DbId,
    namespace: &str,
) -> Result<BTreeMap<String, Vec<String>>, CoreError> {
    let image = TargetRef::image(image_id);
    store
        .find_object(ctx, image)
        .await?
        .ok_or_else(|| image.not_found())?;

    let mut by_roi: BTreeMap<DbId, BTreeSet<String>> = BTreeMap::new();
    for linked in store.list_roi_links(ctx, image_id, None).await? {
        if let Some(text) = linked.annotation.value.comment_in(namespace) {
            by_roi
                .entry(linked.link.target.id)
                .or_default()
                .insert(text.to_string());
        }
    }

    Ok(by_roi
        .into_iter()
        .map(|(roi_id, texts)| (roi_id.to_string(), texts.into_iter().collect()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, AnnotationValue};
    use crate::memory::MemoryStore;
    use assert_matches::assert_matches;

    const NS: &str = "openmicroscopy.org/fastmal/roi_comment";

    fn ctx(user_id: i64) -> StoreContext {
        StoreContext {
            user_id,
            group_id: None,
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn comments_with_text(all: &[Annotation], text: &str) -> usize {
        all.iter()
            .filter(|a| a.value.comment_in(NS) == Some(text))
            .count()
    }

    async fn image_with_rois(store: &MemoryStore, user: i64, rois: usize) -> (i64, Vec<i64>) {
        let dataset = store.add_dataset("ds", None, user).await;
        let image = store.add_image("img", dataset, user).await;
        let mut ids = Vec::new();
        for _ in 0..rois {
            ids.push(store.add_roi(image, user).await);
        }
        (image, ids)
    }

    #[test]
    fn parse_trims_and_collapses_duplicates() {
        assert_eq!(parse_comment_list("a,b,a, b"), set(&["a", "b"]));
        assert_eq!(parse_comment_list(" , ,"), set(&[]));
        assert_eq!(
            parse_comment_list("out of focus,  debris "),
            set(&["debris", "out of focus"])
        );
    }

    #[tokio::test]
    async fn dedups_input_and_shares_entities_across_targets() {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;
        let (_, rois) = image_with_rois(&store, user, 2).await;

        let first = link_comments(&store, &ctx(user), TargetRef::roi(rois[0]), "a,b,a, b", NS)
            .await
            .unwrap();
        assert_eq!(first.linked, set(&["a", "b"]));
        assert_eq!(first.created, set(&["a", "b"]));

        let second = link_comments(&store, &ctx(user), TargetRef::roi(rois[1]), "b", NS)
            .await
            .unwrap();
        assert_eq!(second.reused, set(&["b"]));
        assert!(second.created.is_empty());

        let all = store.annotations().await;
        assert_eq!(comments_with_text(&all, "a"), 1);
        assert_eq!(comments_with_text(&all, "b"), 1);
        assert_eq!(store.links_on(TargetRef::roi(rois[0])).await.len(), 2);
        assert_eq!(store.links_on(TargetRef::roi(rois[1])).await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_new_comment_on_two_rois_shares_one_entity() {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;
        let (_, rois) = image_with_rois(&store, user, 2).await;
        store.yield_between_calls();
        let ctx = ctx(user);

        let (a, b) = tokio::join!(
            link_comments(&store, &ctx, TargetRef::roi(rois[0]), "blurred", NS),
            link_comments(&store, &ctx, TargetRef::roi(rois[1]), "blurred", NS),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.created.len() + b.created.len(), 1);
        assert_eq!(a.reused.len() + b.reused.len(), 1);
        assert_eq!(comments_with_text(&store.annotations().await, "blurred"), 1);
        let first = store.links_on(TargetRef::roi(rois[0])).await;
        let second = store.links_on(TargetRef::roi(rois[1])).await;
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].annotation_id, second[0].annotation_id);
    }

    #[tokio::test]
    async fn concurrent_repost_on_one_roi_links_once() {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;
        let (_, rois) = image_with_rois(&store, user, 1).await;
        store.yield_between_calls();
        let ctx = ctx(user);
        let target = TargetRef::roi(rois[0]);

        let (a, b) = tokio::join!(
            link_comments(&store, &ctx, target, "debris", NS),
            link_comments(&store, &ctx, target, "debris", NS),
        );

        assert_eq!(a.unwrap().comments, set(&["debris"]));
        assert_eq!(b.unwrap().comments, set(&["debris"]));
        assert_eq!(store.links_on(target).await.len(), 1);
    }

    #[tokio::test]
    async fn already_linked_comments_are_skipped() {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;
        let (_, rois) = image_with_rois(&store, user, 1).await;
        let target = TargetRef::roi(rois[0]);

        link_comments(&store, &ctx(user), target, "debris", NS)
            .await
            .unwrap();
        let again = link_comments(&store, &ctx(user), target, "debris, stain", NS)
            .await
            .unwrap();

        assert_eq!(again.created, set(&["stain"]));
        assert_eq!(again.comments, set(&["debris", "stain"]));
        assert_eq!(store.links_on(target).await.len(), 2);
    }

    #[tokio::test]
    async fn same_text_in_other_namespace_is_a_different_comment() {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;
        let (_, rois) = image_with_rois(&store, user, 1).await;
        store
            .add_annotation(
                user,
                None,
                AnnotationValue::Comment {
                    text: "debris".into(),
                    namespace: Some("other.namespace".into()),
                },
            )
            .await;

        let outcome = link_comments(&store, &ctx(user), TargetRef::roi(rois[0]), "debris", NS)
            .await
            .unwrap();

        assert_eq!(outcome.created, set(&["debris"]));
    }

    #[tokio::test]
    async fn list_groups_sorted_comments_by_roi() {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;
        let (image, rois) = image_with_rois(&store, user, 3).await;

        link_comments(&store, &ctx(user), TargetRef::roi(rois[0]), "stain,artefact", NS)
            .await
            .unwrap();
        link_comments(&store, &ctx(user), TargetRef::roi(rois[2]), "debris", NS)
            .await
            .unwrap();

        let listed = list_roi_comments(&store, &ctx(user), image, NS).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(
            listed[&rois[0].to_string()],
            vec!["artefact".to_string(), "stain".to_string()]
        );
        assert_eq!(listed[&rois[2].to_string()], vec!["debris".to_string()]);
        assert!(!listed.contains_key(&rois[1].to_string()));
    }

    #[tokio::test]
    async fn unknown_roi_is_not_found() {
        let store = MemoryStore::new();
        let user = store.add_user("annotator", "Ann Otator").await;

        let err = link_comments(&store, &ctx(user), TargetRef::roi(404), "a", NS)
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::NotFound { entity: "Roi", id: 404 });
    }
}
