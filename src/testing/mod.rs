use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::database::MemoryStorage;
use crate::error::DispatchError;
use crate::handlers;
use crate::pipeline::{Dispatcher, Request, RequestContext};

/// Test utilities: a fully registered dispatcher over a fresh in-memory engine
pub struct TestContext {
    storage: Arc<MemoryStorage>,
    dispatcher: Dispatcher,
}

/// A named tenant with its own owner id
#[derive(Debug, Clone)]
pub struct TestTenant {
    pub name: String,
    pub user_id: Uuid,
    pub principal: Principal,
}

impl TestContext {
    /// Create a new test context with every application handler registered
    pub fn new() -> anyhow::Result<Self> {
        let storage = Arc::new(MemoryStorage::new());
        let dispatcher = handlers::dispatcher(storage.clone())
            .map_err(|e| anyhow::anyhow!("Failed to build dispatcher: {}", e))?;

        Ok(Self { storage, dispatcher })
    }

    /// Create a tenant whose principal carries a fresh owner id
    pub fn create_test_tenant(&self, name: &str) -> TestTenant {
        let user_id = Uuid::new_v4();

        TestTenant {
            name: format!("test_{}_{}", name, user_id.simple()),
            user_id,
            principal: Principal::for_user(user_id),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Raw engine, for assertions that bypass the owner filter
    pub fn storage(&self) -> &Arc<MemoryStorage> {
        &self.storage
    }

    /// Request context acting as `tenant`
    pub fn context_for(&self, tenant: &TestTenant) -> RequestContext {
        self.dispatcher.context(Some(tenant.principal.clone()))
    }

    /// Request context with no principal
    pub fn anonymous(&self) -> RequestContext {
        self.dispatcher.context(None)
    }

    /// Dispatch one request in its own context acting as `tenant`
    pub async fn send_as<R: Request>(&self, tenant: &TestTenant, request: R) -> Result<R::Output, DispatchError> {
        let mut ctx = self.context_for(tenant);
        self.dispatcher.dispatch(request, &mut ctx).await
    }

    /// Dispatch one request in its own anonymous context
    pub async fn send<R: Request>(&self, request: R) -> Result<R::Output, DispatchError> {
        let mut ctx = self.anonymous();
        self.dispatcher.dispatch(request, &mut ctx).await
    }
}
