//! Optimistic mutation: snapshot, apply, commit, restore on failure.

use crate::types::Result;
use std::future::Future;
use tokio::sync::RwLock;

/// Applies a local change before the backend confirms it.
///
/// `apply` mutates the guarded state and returns whatever `restore` needs to
/// undo it, or `None` when there is nothing to change (nothing is committed
/// then). The lock is released while `commit` runs. A recoverable commit
/// failure restores the snapshot; an auth failure is returned as is and the
/// local change stays until the session is re-established.
pub async fn apply<S, P, R, A, C, Fut, U>(
    target: &RwLock<S>,
    apply: A,
    commit: C,
    restore: U,
) -> Result<Option<R>>
where
    A: FnOnce(&mut S) -> Option<P>,
    C: FnOnce() -> Fut,
    Fut: Future<Output = Result<R>>,
    U: FnOnce(&mut S, P),
{
    let snapshot = {
        let mut guard = target.write().await;
        match apply(&mut guard) {
            Some(snapshot) => snapshot,
            None => return Ok(None),
        }
    };

    match commit().await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recoverable() => {
            tracing::warn!("Rolling back optimistic update: {}", e);
            let mut guard = target.write().await;
            restore(&mut guard, snapshot);
            Err(e)
        }
        Err(e) => {
            tracing::warn!("Optimistic update failed without rollback: {}", e);
            Err(e)
        }
    }
}
