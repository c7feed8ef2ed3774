use axum::extract::Query;
use axum::response::IntoResponse;
use axum::Json;
use fastmal_core::roi_types::{FilmKind, RoiType};
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::dataset::FilmParams;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;

#[derive(Debug, Serialize)]
pub struct RoiTypeCatalog {
    pub film: FilmKind,
    pub types: &'static [RoiType],
}

/// GET /api/v1/roi-types?film=thick|thin
///
/// The selectable ROI types for a film, selector entry first.
pub async fn list_roi_types(
    _auth: AuthUser,
    Query(params): Query<FilmParams>,
) -> AppResult<impl IntoResponse> {
    let film = params.film_kind()?;
    Ok(Json(DataResponse {
        data: RoiTypeCatalog {
            film,
            types: film.roi_types(),
        },
    }))
}
