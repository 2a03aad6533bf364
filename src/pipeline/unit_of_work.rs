use crate::database::session::{Session, TrackingMode};
use crate::error::DispatchError;
use crate::types::RequestKind;

/// Transaction boundary around exactly one request.
///
/// Commands run tracked and their staged writes are committed together once
/// the handler succeeds. Queries run untracked, so a commit attempted while
/// handling one fails fast.
pub struct UnitOfWork;

impl UnitOfWork {
    /// Put the session into the mode required by the request kind
    pub fn begin(kind: RequestKind, session: &mut Session) {
        match kind {
            RequestKind::Command => session.set_tracking(TrackingMode::Tracking),
            RequestKind::Query => session.as_no_tracking(),
        }
    }

    /// Commit every staged write; nothing is persisted on failure
    pub async fn commit(session: &mut Session) -> Result<usize, DispatchError> {
        match session.commit().await {
            Ok(written) => Ok(written),
            Err(err) => {
                session.discard();
                Err(err.into())
            }
        }
    }

    /// Drop staged writes after a failed handler
    pub fn rollback(session: &mut Session) {
        session.discard();
    }

    /// End an untracked request; anything staged by a query is dropped
    pub fn release(session: &mut Session) {
        if session.has_changes() {
            tracing::warn!(
                "Query staged {} write(s) that will not be committed",
                session.pending()
            );
            session.discard();
        }
    }
}
