// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Kind of request flowing through the dispatcher
/// Used by both the pipeline stages and the unit-of-work behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Command, // Mutates state, committed in one transaction
    Query,   // Read-only, runs with change tracking disabled
}

/// Result of an update or patch: the target either existed or it didn't.
/// Not-found is a result variant, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    NotFound,
}

/// Cancellation signal carried by a request from the transport down to every
/// storage call. Cloning shares the same underlying signal.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    receiver: Option<watch::Receiver<bool>>,
}

/// Sending half of a [`Cancellation`], held by whoever owns the request lifetime
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl Cancellation {
    /// A signal that never fires
    pub fn none() -> Self {
        Self { receiver: None }
    }

    /// Create a linked handle/signal pair
    pub fn new() -> (CancelHandle, Cancellation) {
        let (sender, receiver) = watch::channel(false);
        (CancelHandle { sender }, Cancellation { receiver: Some(receiver) })
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .map(|receiver| *receiver.borrow())
            .unwrap_or(false)
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}
