use axum::routing::post;
use axum::Router;

use crate::handlers::roi_comments;
use crate::state::AppState;

/// Routes mounted at `/rois`.
///
/// ```text
/// POST   /{roi_id}/comments   add_roi_comments
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{roi_id}/comments", post(roi_comments::add_roi_comments))
}
