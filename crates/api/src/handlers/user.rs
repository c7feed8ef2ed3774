use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use fastmal_core::error::CoreError;
use fastmal_core::scope::run_scoped;
use fastmal_core::types::DbId;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// The acting user plus the id of the user owning the session.
#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub id: DbId,
    pub name: String,
    pub full_name: String,
    pub session_user_id: DbId,
}

/// GET /api/v1/user
pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let session = auth.session();
    let store = state.store.as_ref();
    let user_id = auth.user_id;

    let user = run_scoped(&session, None, |ctx| async move {
        store
            .find_user(&ctx, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })
    })
    .await?;

    Ok(Json(DataResponse {
        data: CurrentUser {
            id: user.id,
            name: user.name,
            full_name: user.full_name,
            session_user_id: session.session_user_id(),
        },
    }))
}
