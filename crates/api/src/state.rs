use std::sync::Arc;

use fastmal_core::store::AnnotationStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Annotation store (Postgres in production, in-memory in tests).
    pub store: Arc<dyn AnnotationStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
