use std::sync::Arc;
use std::time::Instant;

use crate::auth::{Principal, TenantContext};
use crate::config;
use crate::database::storage::Storage;
use crate::error::DispatchError;
use crate::pipeline::context::RequestContext;
use crate::pipeline::error::RegistryError;
use crate::pipeline::registry::HandlerRegistry;
use crate::pipeline::traits::{Command, Handler, Query, Request, Stage};
use crate::pipeline::unit_of_work::UnitOfWork;
use crate::pipeline::validation::{ValidationBehavior, Validator, ValidatorRegistry};
use crate::types::{Cancellation, RequestKind};

/// Startup wiring for a [`Dispatcher`]
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HandlerRegistry,
    validators: ValidatorRegistry,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single handler for `R`
    pub fn handler<R, H>(&mut self, handler: H) -> Result<&mut Self, RegistryError>
    where
        R: Request,
        H: Handler<R>,
    {
        self.handlers.register::<R, H>(handler)?;
        Ok(self)
    }

    /// Add a validator for `R`; any number may be registered
    pub fn validator<R, V>(&mut self, validator: V) -> &mut Self
    where
        R: Request,
        V: Validator<R>,
    {
        self.validators.register::<R, V>(validator);
        self
    }

    pub fn build(self, storage: Arc<dyn Storage>) -> Dispatcher {
        tracing::info!("Dispatcher ready with {} handler(s)", self.handlers.len());
        Dispatcher {
            handlers: self.handlers,
            validators: self.validators,
            storage,
        }
    }
}

/// Routes typed requests to their handler through the behavior chain:
/// validation, unit-of-work mode, handler, commit.
///
/// Shared across concurrent requests; all per-request state lives in the
/// [`RequestContext`] passed to each call.
pub struct Dispatcher {
    handlers: HandlerRegistry,
    validators: ValidatorRegistry,
    storage: Arc<dyn Storage>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Fresh context for one request on behalf of `principal`
    pub fn context(&self, principal: Option<Principal>) -> RequestContext {
        self.context_with_cancellation(principal, Cancellation::none())
    }

    pub fn context_with_cancellation(
        &self,
        principal: Option<Principal>,
        cancellation: Cancellation,
    ) -> RequestContext {
        RequestContext::new(self.storage.clone(), TenantContext::new(principal), cancellation)
    }

    pub async fn execute_query<Q: Query>(
        &self,
        query: Q,
        ctx: &mut RequestContext,
    ) -> Result<Q::Output, DispatchError> {
        self.dispatch(query, ctx).await
    }

    pub async fn execute_command<C: Command>(
        &self,
        command: C,
        ctx: &mut RequestContext,
    ) -> Result<C::Output, DispatchError> {
        self.dispatch(command, ctx).await
    }

    /// Run a command that produces no value
    pub async fn execute_void<C>(&self, command: C, ctx: &mut RequestContext) -> Result<(), DispatchError>
    where
        C: Command<Output = ()>,
    {
        self.dispatch(command, ctx).await
    }

    /// Execute one request through the full pipeline
    pub async fn dispatch<R: Request>(
        &self,
        request: R,
        ctx: &mut RequestContext,
    ) -> Result<R::Output, DispatchError> {
        let handler = self
            .handlers
            .resolve::<R>()
            .ok_or(DispatchError::HandlerNotRegistered(R::NAME))?;

        let start_time = Instant::now();
        let stages = Stage::for_kind(R::KIND);

        tracing::info!(
            "Pipeline starting: request={}, kind={:?}, id={}, stages={:?}",
            R::NAME,
            R::KIND,
            ctx.request_id,
            stages
        );

        // Stage 0: validation, before any session work
        let stage_start = self.enter(ctx, Stage::Validation);
        let validated = ValidationBehavior::run(&self.validators, &request);
        self.leave(ctx, Stage::Validation, stage_start);
        if let Err(err) = validated {
            tracing::warn!("Pipeline: {} rejected by validation: {}", R::NAME, err);
            return Err(err);
        }
        ctx.check_cancelled()?;

        // Stage 1: session mode
        let stage_start = self.enter(ctx, Stage::UnitOfWork);
        UnitOfWork::begin(R::KIND, ctx.session_mut());
        self.leave(ctx, Stage::UnitOfWork, stage_start);

        // Stage 2: handler
        let stage_start = self.enter(ctx, Stage::Handler);
        let result = handler.handle(request, ctx).await;
        self.leave(ctx, Stage::Handler, stage_start);

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                UnitOfWork::rollback(ctx.session_mut());
                tracing::warn!(
                    "Pipeline: {} failed in {:?}: {}",
                    R::NAME,
                    start_time.elapsed(),
                    err
                );
                return Err(err);
            }
        };

        // Stage 3: commit (commands only)
        match R::KIND {
            RequestKind::Command => {
                let stage_start = self.enter(ctx, Stage::Commit);
                let committed = UnitOfWork::commit(ctx.session_mut()).await;
                self.leave(ctx, Stage::Commit, stage_start);
                if let Err(err) = committed {
                    tracing::warn!("Pipeline: {} commit failed: {}", R::NAME, err);
                    return Err(err);
                }
            }
            RequestKind::Query => UnitOfWork::release(ctx.session_mut()),
        }

        ctx.current_stage = None;
        let elapsed = start_time.elapsed();
        let threshold = config::config().pipeline.slow_request_threshold_ms;
        if elapsed.as_millis() > u128::from(threshold) {
            tracing::warn!("Slow request: {} took {:?} (threshold {}ms)", R::NAME, elapsed, threshold);
        }

        tracing::info!("Pipeline completed: request={}, elapsed={:?}", R::NAME, elapsed);
        Ok(output)
    }

    fn enter(&self, ctx: &mut RequestContext, stage: Stage) -> Instant {
        ctx.current_stage = Some(stage);
        Instant::now()
    }

    fn leave(&self, ctx: &mut RequestContext, stage: Stage, started: Instant) {
        let elapsed = started.elapsed();
        ctx.record_stage(stage, elapsed);
        if config::config().pipeline.debug_logging {
            tracing::debug!("Stage {:?} completed in {:?}", stage, elapsed);
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers)
            .finish()
    }
}
