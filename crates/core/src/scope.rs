//! Visibility scope (group context) handling for store sessions.
//!
//! A [`Session`] carries the scope every store call is evaluated in. Entry
//! points switch scope with [`run_scoped`], which restores the previous scope
//! through [`ScopeGuard`]'s `Drop` impl. Restoration therefore happens on
//! success, on error, on panic, and when the request future is dropped
//! mid-flight.

use std::future::Future;
use std::sync::Mutex;

use crate::error::CoreError;
use crate::types::DbId;

/// Snapshot of who is acting and in which scope, passed to every store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreContext {
    pub user_id: DbId,
    /// Active group. `None` means the session's default visibility.
    pub group_id: Option<DbId>,
}

/// Per-connection session state.
#[derive(Debug)]
pub struct Session {
    user_id: DbId,
    session_user_id: DbId,
    scope: Mutex<Option<DbId>>,
}

impl Session {
    /// `session_user_id` is the login the session was established with; it
    /// differs from `user_id` when acting on another user's behalf.
    pub fn new(user_id: DbId, session_user_id: DbId, default_scope: Option<DbId>) -> Self {
        Self {
            user_id,
            session_user_id,
            scope: Mutex::new(default_scope),
        }
    }

    pub fn user_id(&self) -> DbId {
        self.user_id
    }

    pub fn session_user_id(&self) -> DbId {
        self.session_user_id
    }

    pub fn current_scope(&self) -> Option<DbId> {
        *self.scope.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn context(&self) -> StoreContext {
        StoreContext {
            user_id: self.user_id,
            group_id: self.current_scope(),
        }
    }

    fn replace_scope(&self, scope: Option<DbId>) -> Option<DbId> {
        let mut current = self.scope.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, scope)
    }

    /// Switch to `desired` (no-op when `None`) until the guard is dropped.
    pub fn enter_scope(&self, desired: Option<DbId>) -> ScopeGuard<'_> {
        let previous = match desired {
            Some(group_id) => self.replace_scope(Some(group_id)),
            None => self.current_scope(),
        };
        ScopeGuard {
            session: self,
            previous,
        }
    }
}

/// Restores the scope captured by [`Session::enter_scope`] when dropped.
#[must_use = "the previous scope is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    session: &'a Session,
    previous: Option<DbId>,
}

impl ScopeGuard<'_> {
    /// Scope that will be restored.
    pub fn previous(&self) -> Option<DbId> {
        self.previous
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.session.replace_scope(self.previous);
    }
}

/// Run `operation` with the session switched to `desired_scope`.
///
/// The operation receives the [`StoreContext`] for the switched scope. Its
/// result, including any error, is returned unchanged after the original
/// scope has been restored.
pub async fn run_scoped<F, Fut, T>(
    session: &Session,
    desired_scope: Option<DbId>,
    operation: F,
) -> Result<T, CoreError>
where
    F: FnOnce(StoreContext) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let guard = session.enter_scope(desired_scope);
    let ctx = session.context();
    tracing::debug!(
        user_id = ctx.user_id,
        group_id = ?ctx.group_id,
        previous_group_id = ?guard.previous(),
        "Entered scope",
    );

    let result = operation(ctx).await;

    drop(guard);
    result
}
