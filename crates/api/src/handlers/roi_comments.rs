//! Handlers for namespace-scoped ROI comments.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use fastmal_core::annotation::TargetRef;
use fastmal_core::comments::{link_comments, list_roi_comments};
use fastmal_core::scope::run_scoped;
use fastmal_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /rois/{roi_id}/comments`.
#[derive(Debug, Deserialize)]
pub struct AddRoiComments {
    /// Comma-separated comment texts.
    pub comments: String,
}

#[derive(Debug, Serialize)]
pub struct RoiCommentsResponse {
    pub roi_id: DbId,
    pub success: bool,
    /// Every comment in the namespace now linked to the ROI, sorted.
    pub comments: Vec<String>,
}

/// GET /api/v1/images/{image_id}/roi-comments
///
/// ROI id → sorted comments, for ROIs of the image that have any.
pub async fn list_image_roi_comments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = auth.session();
    let store = state.store.as_ref();
    let namespace = state.config.annotations.markers.comment_namespace.as_str();

    let comments: BTreeMap<String, Vec<String>> = run_scoped(&session, None, |ctx| async move {
        list_roi_comments(store, &ctx, image_id, namespace).await
    })
    .await?;

    Ok(Json(DataResponse { data: comments }))
}

/// POST /api/v1/rois/{roi_id}/comments
///
/// Link each listed comment to the ROI, reusing existing comment entities.
pub async fn add_roi_comments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(roi_id): Path<DbId>,
    Json(input): Json<AddRoiComments>,
) -> AppResult<impl IntoResponse> {
    let session = auth.session();
    let store = state.store.as_ref();
    let namespace = state.config.annotations.markers.comment_namespace.as_str();
    let raw = input.comments.as_str();

    let outcome = run_scoped(&session, None, |ctx| async move {
        link_comments(store, &ctx, TargetRef::roi(roi_id), raw, namespace).await
    })
    .await?;

    Ok(Json(DataResponse {
        data: RoiCommentsResponse {
            roi_id,
            success: true,
            comments: outcome.comments.into_iter().collect(),
        },
    }))
}
