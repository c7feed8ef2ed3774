//! Single-key map annotations on shapes and other targets.
//!
//! A map annotation is identified by the key of its first entry. For each
//! (target, key, owner) there is at most one such annotation; writing a key
//! overwrites its value instead of appending a second annotation.

use serde::Serialize;

use crate::annotation::{Annotation, AnnotationValue, MapEntry, TargetRef};
use crate::error::CoreError;
use crate::scope::StoreContext;
use crate::store::AnnotationStore;
use crate::types::DbId;

/// Result of [`upsert_map_entry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MapEntryOutcome {
    /// A new annotation holding the pair was created and linked.
    Created { annotation_id: DbId, value: String },
    /// An existing annotation's value was overwritten.
    Updated {
        annotation_id: DbId,
        previous: String,
        value: String,
    },
    /// Read-only lookup found the key.
    Found { annotation_id: DbId, value: String },
    /// Read-only lookup did not find the key.
    NotFound,
}

impl MapEntryOutcome {
    pub fn created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// Current value for the key, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Created { value, .. } | Self::Updated { value, .. } | Self::Found { value, .. } => {
                Some(value)
            }
            Self::NotFound => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Created { .. } => "Created new annotation",
            Self::Updated { .. } => "Updated existing annotation",
            Self::Found { .. } => "Found existing annotation",
            Self::NotFound => "No annotation found",
        }
    }
}

/// Find the acting user's map annotation on `target` whose first key is `key`.
///
/// The first match in link order wins if duplicates exist.
pub async fn find_map_entry(
    store: &dyn AnnotationStore,
    ctx: &StoreContext,
    target: TargetRef,
    key: &str,
) -> Result<Option<Annotation>, CoreError> {
    let links = store.list_links(ctx, target, Some(ctx.user_id)).await?;
    Ok(links
        .into_iter()
        .map(|linked| linked.annotation)
        .find(|annotation| {
            annotation
                .value
                .first_map_entry()
                .is_some_and(|entry| entry.key == key)
        }))
}

/// Set `key` to `value` on `target`, or read it back when either is empty.
pub async fn upsert_map_entry(
    store: &dyn AnnotationStore,
    ctx: &StoreContext,
    target: TargetRef,
    key: &str,
    value: &str,
) -> Result<MapEntryOutcome, CoreError> {
    store
        .find_object(ctx, target)
        .await?
        .ok_or_else(|| target.not_found())?;

    let existing = find_map_entry(store, ctx, target, key).await?;

    if key.is_empty() || value.is_empty() {
        return Ok(match existing {
            Some(annotation) => MapEntryOutcome::Found {
                annotation_id: annotation.id,
                value: first_value(&annotation),
            },
            None => MapEntryOutcome::NotFound,
        });
    }

    let outcome = match existing {
        Some(annotation) => {
            let previous = first_value(&annotation);
            let mut entries = match annotation.value {
                AnnotationValue::Map { entries } => entries,
                _ => Vec::new(),
            };
            if let Some(first) = entries.first_mut() {
                first.value = value.to_string();
            }
            let updated = store
                .update_annotation(ctx, annotation.id, AnnotationValue::Map { entries })
                .await?;
            MapEntryOutcome::Updated {
                annotation_id: updated.id,
                previous,
                value: value.to_string(),
            }
        }
        None => {
            let created = store
                .create_annotation(
                    ctx,
                    AnnotationValue::Map {
                        entries: vec![MapEntry::new(key, value)],
                    },
                )
                .await?;
            store.create_link(ctx, target, created.id).await?;
            MapEntryOutcome::Created {
                annotation_id: created.id,
                value: value.to_string(),
            }
        }
    };

    tracing::info!(
        user_id = ctx.user_id,
        target_kind = target.kind.as_str(),
        target_id = target.id,
        key,
        created = outcome.created(),
        "Map annotation written",
    );

    Ok(outcome)
}

fn first_value(annotation: &Annotation) -> String {
    annotation
        .value
        .first_map_entry()
        .map(|entry| entry.value.clone())
        .unwrap_or_default()
}
