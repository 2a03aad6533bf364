use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{OwnerId, TenantContext};
use crate::database::session::Session;
use crate::database::storage::Storage;
use crate::error::DispatchError;
use crate::pipeline::traits::Stage;
use crate::types::Cancellation;

/// Timing of one executed stage
#[derive(Debug, Clone, Copy)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// Per-request state that flows through the pipeline.
/// Never shared between concurrent requests.
pub struct RequestContext {
    pub request_id: Uuid,

    session: Session,
    cancellation: Cancellation,

    // Performance tracking
    pub current_stage: Option<Stage>,
    trace: Vec<StageTiming>,
}

impl RequestContext {
    pub fn new(storage: Arc<dyn Storage>, tenant: TenantContext, cancellation: Cancellation) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            session: Session::new(storage, tenant, cancellation.clone()),
            cancellation,
            current_stage: None,
            trace: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn tenant(&self) -> &TenantContext {
        self.session.tenant()
    }

    /// Owner id of the calling principal; fails closed
    pub fn owner_id(&self) -> Result<OwnerId, DispatchError> {
        Ok(self.tenant().resolve_owner_id()?)
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    pub fn check_cancelled(&self) -> Result<(), DispatchError> {
        if self.cancellation.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn record_stage(&mut self, stage: Stage, elapsed: Duration) {
        self.trace.push(StageTiming { stage, elapsed });
    }

    /// Stages executed so far, in order
    pub fn stages_executed(&self) -> Vec<Stage> {
        self.trace.iter().map(|t| t.stage).collect()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("session", &self.session)
            .field("current_stage", &self.current_stage)
            .field("trace", &self.trace)
            .finish()
    }
}
