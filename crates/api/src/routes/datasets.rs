use axum::routing::get;
use axum::Router;

use crate::handlers::dataset;
use crate::state::AppState;

/// Routes mounted at `/datasets`.
///
/// ```text
/// GET    /{dataset_id}/roi-summary                   get_roi_summary
/// GET    /{dataset_id}/images/{image_id}/roi-tally   get_roi_tally
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{dataset_id}/roi-summary", get(dataset::get_roi_summary))
        .route(
            "/{dataset_id}/images/{image_id}/roi-tally",
            get(dataset::get_roi_tally),
        )
}
