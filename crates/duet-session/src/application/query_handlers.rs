//! Query handlers for the session context.
//!
//! Read-only: these load stored rows and project them into views. Nothing
//! here takes the session lock.

use duet_core::error::DomainError;
use duet_core::repository::SessionRepository;
use uuid::Uuid;

use crate::domain::history::{ThreadHistories, reconstruct};
use crate::domain::snapshot::{Session, SessionSnapshot};

/// Lists the sessions owned by `owner_id`, newest first, each with both
/// histories.
///
/// # Errors
///
/// Returns `DomainError::Storage` if loading fails or a row is corrupt.
pub async fn list_sessions(
    owner_id: Uuid,
    repo: &dyn SessionRepository,
) -> Result<Vec<SessionSnapshot>, DomainError> {
    let mut snapshots = Vec::new();
    for stored in repo.list_sessions(owner_id).await? {
        let session = Session::from_stored(&stored)?;
        let turns = repo.load_turns(session.id).await?;
        snapshots.push(SessionSnapshot::assemble(&session, &reconstruct(&turns)));
    }
    Ok(snapshots)
}

/// Reconstructs both thread histories of a session from its log.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist.
pub async fn reconstruct_histories(
    session_id: Uuid,
    repo: &dyn SessionRepository,
) -> Result<ThreadHistories, DomainError> {
    if repo.load_session(session_id).await?.is_none() {
        return Err(DomainError::SessionNotFound(session_id));
    }
    let turns = repo.load_turns(session_id).await?;
    Ok(reconstruct(&turns))
}

/// Retrieves one session with both histories.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist and
/// `DomainError::Forbidden` if `owner_id` does not own it.
pub async fn get_session(
    session_id: Uuid,
    owner_id: Uuid,
    repo: &dyn SessionRepository,
) -> Result<SessionSnapshot, DomainError> {
    let stored = repo
        .load_session(session_id)
        .await?
        .ok_or(DomainError::SessionNotFound(session_id))?;
    if stored.owner_id != owner_id {
        return Err(DomainError::Forbidden { session_id });
    }
    let session = Session::from_stored(&stored)?;
    let histories = reconstruct_histories(session_id, repo).await?;
    Ok(SessionSnapshot::assemble(&session, &histories))
}
