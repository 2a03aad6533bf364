use async_trait::async_trait;

use crate::error::DispatchError;
use crate::pipeline::context::RequestContext;
use crate::types::RequestKind;

/// A typed request routed to exactly one handler
pub trait Request: Send + Sync + 'static {
    type Output: Send + 'static;

    const KIND: RequestKind;

    /// Name used in logs and registry errors
    const NAME: &'static str;
}

/// Request that mutates state; committed as one unit of work
pub trait Command: Request {}

/// Read-only request; runs against an untracked session
pub trait Query: Request {}

/// Declare a type as a [`Command`] with the given output
#[macro_export]
macro_rules! command {
    ($request:ty => $output:ty) => {
        impl $crate::pipeline::Request for $request {
            type Output = $output;
            const KIND: $crate::types::RequestKind = $crate::types::RequestKind::Command;
            const NAME: &'static str = stringify!($request);
        }

        impl $crate::pipeline::Command for $request {}
    };
}

/// Declare a type as a [`Query`] with the given output
#[macro_export]
macro_rules! query {
    ($request:ty => $output:ty) => {
        impl $crate::pipeline::Request for $request {
            type Output = $output;
            const KIND: $crate::types::RequestKind = $crate::types::RequestKind::Query;
            const NAME: &'static str = stringify!($request);
        }

        impl $crate::pipeline::Query for $request {}
    };
}

/// Domain logic for one request type
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: R, ctx: &mut RequestContext) -> Result<R::Output, DispatchError>;
}

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Stage {
    Validation = 0, // Every registered validator for the request type
    UnitOfWork = 1, // Session mode for the request kind
    Handler = 2,    // Domain logic
    Commit = 3,     // Staged writes applied in one transaction (commands only)
}

impl Stage {
    /// Stages executed for a request kind
    pub fn for_kind(kind: RequestKind) -> Vec<Self> {
        use Stage::*;

        match kind {
            RequestKind::Query => vec![Validation, UnitOfWork, Handler],
            RequestKind::Command => vec![Validation, UnitOfWork, Handler, Commit],
        }
    }
}
