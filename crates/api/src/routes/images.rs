//! Route definitions for image-scoped annotations.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::{roi_comments, tag_state};
use crate::state::AppState;

/// Routes mounted at `/images`.
///
/// ```text
/// PUT    /{image_id}/tags/{tag_name}        set_image_tag
/// PUT    /{image_id}/roi-complete/{state}   set_roi_complete
/// GET    /{image_id}/roi-comments           list_image_roi_comments
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{image_id}/tags/{tag_name}", put(tag_state::set_image_tag))
        .route(
            "/{image_id}/roi-complete/{state}",
            put(tag_state::set_roi_complete),
        )
        .route(
            "/{image_id}/roi-comments",
            get(roi_comments::list_image_roi_comments),
        )
}
