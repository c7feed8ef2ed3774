use axum::routing::get;
use axum::Router;

use crate::handlers::shape_annotation;
use crate::state::AppState;

/// Routes mounted at `/shapes`.
///
/// ```text
/// GET    /{shape_id}/annotations/{key}   get_shape_annotation
/// PUT    /{shape_id}/annotations/{key}   put_shape_annotation
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{shape_id}/annotations/{key}",
        get(shape_annotation::get_shape_annotation).put(shape_annotation::put_shape_annotation),
    )
}
