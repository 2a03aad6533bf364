use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::pipeline::error::RegistryError;
use crate::pipeline::traits::{Handler, Request};
use crate::types::RequestKind;

struct Registration {
    name: &'static str,
    kind: RequestKind,
    // Arc<dyn Handler<R>> for the registered request type
    handler: Box<dyn Any + Send + Sync>,
}

/// Static map from request type to its single handler, built once at startup
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TypeId, Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `R`. A second handler for the same type is rejected.
    pub fn register<R, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        R: Request,
        H: Handler<R>,
    {
        let type_id = TypeId::of::<R>();
        if self.handlers.contains_key(&type_id) {
            return Err(RegistryError::DuplicateHandler { request: R::NAME });
        }

        let handler: Arc<dyn Handler<R>> = Arc::new(handler);
        self.handlers.insert(
            type_id,
            Registration {
                name: R::NAME,
                kind: R::KIND,
                handler: Box::new(handler),
            },
        );

        tracing::debug!("Registered handler for '{}' ({:?})", R::NAME, R::KIND);
        Ok(())
    }

    pub fn resolve<R: Request>(&self) -> Option<Arc<dyn Handler<R>>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|registration| registration.handler.downcast_ref::<Arc<dyn Handler<R>>>())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered request names and kinds, sorted by name
    pub fn registered(&self) -> Vec<(&'static str, RequestKind)> {
        let mut entries: Vec<_> = self.handlers.values().map(|r| (r.name, r.kind)).collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.registered())
            .finish()
    }
}
