//! Handlers that set or clear tag links on images.
//!
//! Both endpoints run inside the session's active group so tag resolution
//! sees that group's tags only.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use fastmal_core::annotation::TargetRef;
use fastmal_core::scope::run_scoped;
use fastmal_core::tag_state::{set_tag_state, TagStateOutcome};
use fastmal_core::types::DbId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /images/{image_id}/tags/{tag_name}`.
#[derive(Debug, Deserialize)]
pub struct TagStateRequest {
    pub state: bool,
}

/// Parse a `true` / `false` path segment.
fn parse_state(raw: &str) -> AppResult<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(AppError::BadRequest(format!(
            "state must be 'true' or 'false', got '{other}'"
        ))),
    }
}

async fn apply(
    auth: &AuthUser,
    state: &AppState,
    image_id: DbId,
    tag_value: &str,
    desired_state: bool,
) -> AppResult<Json<DataResponse<TagStateOutcome>>> {
    let session = auth.session();
    let store = state.store.as_ref();

    let outcome = run_scoped(&session, auth.active_group, |ctx| async move {
        set_tag_state(store, &ctx, TargetRef::image(image_id), tag_value, desired_state).await
    })
    .await?;

    Ok(Json(DataResponse { data: outcome }))
}

/// PUT /api/v1/images/{image_id}/tags/{tag_name}
///
/// Make the caller's link between the image and the named tag match `state`.
pub async fn set_image_tag(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((image_id, tag_name)): Path<(DbId, String)>,
    Json(input): Json<TagStateRequest>,
) -> AppResult<impl IntoResponse> {
    if tag_name.trim().is_empty() {
        return Err(AppError::BadRequest("tag_name must not be empty".into()));
    }
    apply(&auth, &state, image_id, &tag_name, input.state).await
}

/// PUT /api/v1/images/{image_id}/roi-complete/{state}
///
/// Mark or unmark the image as ROI-complete for the caller.
pub async fn set_roi_complete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((image_id, raw_state)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let desired_state = parse_state(&raw_state)?;
    let tag_value = state.config.annotations.markers.roi_complete.clone();
    apply(&auth, &state, image_id, &tag_value, desired_state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn state_segment_accepts_only_lowercase_booleans() {
        assert!(parse_state("true").unwrap());
        assert!(!parse_state("false").unwrap());
        assert_matches!(parse_state("TRUE"), Err(AppError::BadRequest(_)));
        assert_matches!(parse_state("1"), Err(AppError::BadRequest(_)));
    }
}
