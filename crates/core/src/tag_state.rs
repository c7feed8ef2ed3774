//! Idempotent tag-link state for annotation targets.
//!
//! [`set_tag_state`] makes the acting user's link between a tag and a target
//! match the requested state. Repeating a call with the same state is a no-op.

use serde::Serialize;

use crate::annotation::{Annotation, TargetRef};
use crate::error::CoreError;
use crate::scope::StoreContext;
use crate::store::AnnotationStore;

/// What [`set_tag_state`] did to the link set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagAction {
    Linked,
    Unlinked,
    Unchanged,
}

impl TagAction {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Linked => "Did not have link, added",
            Self::Unlinked => "Had link, removed",
            Self::Unchanged => "Nothing to do",
        }
    }
}

/// Result of a tag state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagStateOutcome {
    /// `true` when a link was created or removed.
    pub applied: bool,
    pub action: TagAction,
    pub message: String,
}

impl From<TagAction> for TagStateOutcome {
    fn from(action: TagAction) -> Self {
        Self {
            applied: action != TagAction::Unchanged,
            action,
            message: action.message().to_string(),
        }
    }
}

/// Resolve the single tag annotation valued `tag_value` in the active scope.
///
/// Zero or several matches are reported as [`CoreError::AmbiguousTag`].
pub async fn resolve_unique_tag(
    store: &dyn AnnotationStore,
    ctx: &StoreContext,
    tag_value: &str,
) -> Result<Annotation, CoreError> {
    let mut tags = store.find_tags(ctx, tag_value).await?;
    if tags.len() != 1 {
        return Err(CoreError::AmbiguousTag {
            value: tag_value.to_string(),
            matches: tags.iter().map(|t| t.id).collect(),
        });
    }
    Ok(tags.remove(0))
}

/// Ensure the acting user's link from `target` to the `tag_value` tag exists
/// when `desired_state` is true and is absent when it is false.
pub async fn set_tag_state(
    store: &dyn AnnotationStore,
    ctx: &StoreContext,
    target: TargetRef,
    tag_value: &str,
    desired_state: bool,
) -> Result<TagStateOutcome, CoreError> {
    store
        .find_object(ctx, target)
        .await?
        .ok_or_else(|| target.not_found())?;

    let tag = resolve_unique_tag(store, ctx, tag_value).await?;

    let existing: Vec<_> = store
        .list_links(ctx, target, Some(ctx.user_id))
        .await?
        .into_iter()
        .filter(|linked| linked.annotation.id == tag.id)
        .map(|linked| linked.link.id)
        .collect();

    // A concurrent call may have applied the same change since the lookup.
    let action = match (existing.is_empty(), desired_state) {
        (false, false) => match store.delete_links(ctx, &existing).await? {
            0 => TagAction::Unchanged,
            _ => TagAction::Unlinked,
        },
        (true, true) => match store.create_link(ctx, target, tag.id).await? {
            Some(_) => TagAction::Linked,
            None => TagAction::Unchanged,
        },
        _ => TagAction::Unchanged,
    };

    tracing::info!(
        user_id = ctx.user_id,
        target_kind = target.kind.as_str(),
        target_id = target.id,
        tag_id = tag.id,
        desired_state,
        action = ?action,
        "Tag state applied",
    );

    Ok(action.into())
}
