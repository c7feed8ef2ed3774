pub mod datasets;
pub mod health;
pub mod images;
pub mod rois;
pub mod shapes;

use axum::http::Method;
use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Every method mounted under `/api/v1`. CORS preflight allows exactly these.
pub const API_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::PUT];

/// Build the `/api/v1` route tree.
///
/// Every route requires a Bearer token.
///
/// ```text
/// /user                                            current user (GET)
/// /roi-types                                       ROI type catalog (GET, ?film=)
///
/// /images/{image_id}/tags/{tag_name}               set tag state (PUT)
/// /images/{image_id}/roi-complete/{state}          set ROI-complete tag (PUT)
/// /images/{image_id}/roi-comments                  comments per ROI (GET)
///
/// /datasets/{dataset_id}/roi-summary               aggregation report (GET)
/// /datasets/{dataset_id}/images/{image_id}/roi-tally
///                                                  per-image tally (GET, ?film=)
///
/// /shapes/{shape_id}/annotations/{key}             read, upsert (GET, PUT)
///
/// /rois/{roi_id}/comments                          link comments (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Identity of the caller.
        .route("/user", get(handlers::user::get_current_user))
        // Static ROI type catalog.
        .route("/roi-types", get(handlers::roi_types::list_roi_types))
        // Image tag toggles and ROI comments.
        .nest("/images", images::router())
        // Dataset progress.
        .nest("/datasets", datasets::router())
        // Shape key-value annotations.
        .nest("/shapes", shapes::router())
        // ROI comments.
        .nest("/rois", rois::router())
}
