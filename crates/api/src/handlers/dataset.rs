//! Handlers for dataset-wide ROI progress.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use fastmal_core::aggregation::aggregate_dataset;
use fastmal_core::error::CoreError;
use fastmal_core::roi_types::{tally_rows, tally_summary, FilmKind, TallyRow};
use fastmal_core::scope::run_scoped;
use fastmal_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters selecting the ROI type catalog (`?film=thick|thin`).
#[derive(Debug, Default, Deserialize)]
pub struct FilmParams {
    pub film: Option<String>,
}

impl FilmParams {
    pub fn film_kind(&self) -> AppResult<FilmKind> {
        match self.film.as_deref() {
            None | Some("") => Ok(FilmKind::default()),
            Some(raw) => Ok(FilmKind::parse(raw)?),
        }
    }
}

/// Per-image tally against dataset totals.
#[derive(Debug, Serialize)]
pub struct RoiTally {
    pub dataset_id: DbId,
    pub image_id: DbId,
    pub film: FilmKind,
    pub rows: Vec<TallyRow>,
    /// `"name = image/dataset; "` for each ROI type.
    pub summary: String,
}

/// GET /api/v1/datasets/{dataset_id}/roi-summary
///
/// The caller's ROI annotation progress over the dataset's annotatable images.
pub async fn get_roi_summary(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(dataset_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = auth.session();
    let store = state.store.as_ref();
    let markers = &state.config.annotations.markers;

    let report = run_scoped(&session, None, |ctx| async move {
        aggregate_dataset(store, &ctx, dataset_id, markers).await
    })
    .await?;

    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/datasets/{dataset_id}/images/{image_id}/roi-tally
///
/// Shape counts per ROI type on one image next to the dataset totals.
pub async fn get_roi_tally(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((dataset_id, image_id)): Path<(DbId, DbId)>,
    Query(params): Query<FilmParams>,
) -> AppResult<impl IntoResponse> {
    let film = params.film_kind()?;
    let session = auth.session();
    let store = state.store.as_ref();
    let markers = &state.config.annotations.markers;

    let report = run_scoped(&session, None, |ctx| async move {
        aggregate_dataset(store, &ctx, dataset_id, markers).await
    })
    .await?;

    if !report.image_ids.contains(&image_id) {
        return Err(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }
        .into());
    }

    let rows = tally_rows(film, &report.image_counts(image_id), &report.roi_type_count);
    let summary = tally_summary(&rows);

    Ok(Json(DataResponse {
        data: RoiTally {
            dataset_id,
            image_id,
            film,
            rows,
            summary,
        },
    }))
}
