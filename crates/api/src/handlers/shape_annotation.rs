//! Handlers for single-key map annotations on shapes.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use fastmal_core::annotation::TargetRef;
use fastmal_core::map_annotation::{upsert_map_entry, MapEntryOutcome};
use fastmal_core::scope::run_scoped;
use fastmal_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /shapes/{shape_id}/annotations/{key}`.
#[derive(Debug, Deserialize)]
pub struct SetShapeAnnotation {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ShapeAnnotationResponse {
    pub message: &'static str,
    /// Current value for the key; `null` when it has none.
    pub annotation_value: Option<String>,
}

impl From<MapEntryOutcome> for ShapeAnnotationResponse {
    fn from(outcome: MapEntryOutcome) -> Self {
        Self {
            message: outcome.message(),
            annotation_value: outcome.value().map(str::to_string),
        }
    }
}

async fn upsert(
    auth: &AuthUser,
    state: &AppState,
    shape_id: DbId,
    key: &str,
    value: &str,
) -> AppResult<ShapeAnnotationResponse> {
    let session = auth.session();
    let store = state.store.as_ref();

    let outcome = run_scoped(&session, None, |ctx| async move {
        upsert_map_entry(store, &ctx, TargetRef::shape(shape_id), key, value).await
    })
    .await?;

    Ok(outcome.into())
}

/// GET /api/v1/shapes/{shape_id}/annotations/{key}
///
/// Read the caller's value for `key` on the shape without writing.
pub async fn get_shape_annotation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((shape_id, key)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let data = upsert(&auth, &state, shape_id, &key, "").await?;
    Ok(Json(DataResponse { data }))
}

/// PUT /api/v1/shapes/{shape_id}/annotations/{key}
///
/// Set the caller's value for `key` on the shape. An empty value reads only.
pub async fn put_shape_annotation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((shape_id, key)): Path<(DbId, String)>,
    Json(input): Json<SetShapeAnnotation>,
) -> AppResult<impl IntoResponse> {
    let data = upsert(&auth, &state, shape_id, &key, &input.value).await?;
    Ok(Json(DataResponse { data }))
}
