use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::DispatchError;
use crate::handlers::bookstore::*;
use crate::handlers::time_tracking::*;
use crate::pipeline::{Dispatcher, Request, RequestContext};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown request type '{0}'")]
    UnknownRequest(String),

    #[error("Invalid payload for {request}: {source}")]
    InvalidPayload {
        request: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unresolved reference '{0}'")]
    UnresolvedReference(String),
}

/// A sequence of requests replayed against one dispatcher
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

/// One request of a script.
///
/// `user` names the principal the request runs as; the same name maps to the
/// same owner id for the whole run, a UUID is used as-is and no user means an
/// anonymous request. String values of the form `$name` or `$name.field` in
/// the payload are replaced with the output saved by an earlier step's
/// `save_as`. A leading `$$` stands for a literal `$`.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub request: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "empty_payload")]
    pub payload: Value,
    #[serde(default)]
    pub save_as: Option<String>,
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

impl Script {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Outcome of one dispatched step
#[derive(Debug)]
pub struct StepReport {
    pub index: usize,
    pub request: String,
    pub user: Option<String>,
    pub result: Result<Value, DispatchError>,
}

impl StepReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

// Deserialize the payload into the request type whose name matches and
// dispatch it, serializing the output.
macro_rules! route {
    ($name:expr, $payload:expr, $dispatcher:expr, $ctx:expr; $($request:ty),+ $(,)?) => {
        $(
            if $name == <$request as Request>::NAME {
                let request: $request = serde_json::from_value($payload).map_err(|source| {
                    ScriptError::InvalidPayload { request: $name.to_string(), source }
                })?;
                return match $dispatcher.dispatch(request, $ctx).await {
                    Ok(output) => Ok(Ok(serde_json::to_value(output)?)),
                    Err(err) => Ok(Err(err)),
                };
            }
        )+
    };
}

async fn dispatch_named(
    dispatcher: &Dispatcher,
    name: &str,
    payload: Value,
    ctx: &mut RequestContext,
) -> Result<Result<Value, DispatchError>, ScriptError> {
    route!(name, payload, dispatcher, ctx;
        CreateAuthor, UpdateAuthor, PatchAuthor, DeleteAuthor, GetAuthor, GetAuthors,
        CreateProductCategory, UpdateProductCategory, DeleteProductCategory,
        GetProductCategory, GetProductCategories,
        CreateBook, UpdateBook, PatchBook, GetBook, GetBooks,
        GetProduct, GetProducts, SearchProducts, DeleteProduct,
        CreateProject, UpdateProject, PatchProject, DeleteProject, GetProject, GetProjects,
        CreateWorkTask, StartWorkTask, UpdateWorkTask, PatchWorkTask, DeleteWorkTask,
        GetWorkTask, ListWorkTasks,
    );

    Err(ScriptError::UnknownRequest(name.to_string()))
}

/// Replays script steps, keeping named users and saved outputs across steps
pub struct ScriptRunner<'a> {
    dispatcher: &'a Dispatcher,
    users: HashMap<String, Uuid>,
    saved: HashMap<String, Value>,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            dispatcher,
            users: HashMap::new(),
            saved: HashMap::new(),
        }
    }

    /// Run every step in order. A request that fails is reported and the run
    /// continues; a malformed step aborts the run.
    pub async fn run(&mut self, script: Script) -> Result<Vec<StepReport>, ScriptError> {
        let mut reports = Vec::with_capacity(script.steps.len());
        for (index, step) in script.steps.into_iter().enumerate() {
            reports.push(self.run_step(index, step).await?);
        }
        Ok(reports)
    }

    pub async fn run_step(&mut self, index: usize, step: Step) -> Result<StepReport, ScriptError> {
        let payload = self.resolve(step.payload)?;
        let principal = self.principal_for(step.user.as_deref());
        let mut ctx = self.dispatcher.context(principal);

        tracing::debug!("Script step {}: {} as {:?}", index, step.request, step.user);
        let result = dispatch_named(self.dispatcher, &step.request, payload, &mut ctx).await?;

        if let (Ok(output), Some(name)) = (&result, &step.save_as) {
            self.saved.insert(name.clone(), output.clone());
        }

        Ok(StepReport {
            index,
            request: step.request,
            user: step.user,
            result,
        })
    }

    fn principal_for(&mut self, user: Option<&str>) -> Option<Principal> {
        let user = user?;
        let user_id = match Uuid::parse_str(user) {
            Ok(id) => id,
            Err(_) => *self.users.entry(user.to_string()).or_insert_with(Uuid::new_v4),
        };
        Some(Principal::for_user(user_id))
    }

    fn resolve(&self, value: Value) -> Result<Value, ScriptError> {
        match value {
            Value::String(text) if text.starts_with("$$") => Ok(Value::String(text[1..].to_string())),
            Value::String(text) if text.starts_with('$') => self.lookup(&text[1..]),
            Value::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|item| self.resolve(item))
                    .collect::<Result<_, _>>()?,
            )),
            Value::Object(map) => {
                let mut resolved = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    resolved.insert(key, self.resolve(item)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other),
        }
    }

    fn lookup(&self, reference: &str) -> Result<Value, ScriptError> {
        let (name, path) = match reference.split_once('.') {
            Some((name, path)) => (name, Some(path)),
            None => (reference, None),
        };

        let saved = self
            .saved
            .get(name)
            .ok_or_else(|| ScriptError::UnresolvedReference(reference.to_string()))?;

        let value = match path {
            Some(path) => saved.pointer(&format!("/{}", path.replace('.', "/"))),
            None => Some(saved),
        };
        value
            .cloned()
            .ok_or_else(|| ScriptError::UnresolvedReference(reference.to_string()))
    }
}
