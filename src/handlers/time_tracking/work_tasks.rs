use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{Project, WorkTask};
use crate::database::session::Session;
use crate::error::DispatchError;
use crate::pipeline::{DispatcherBuilder, FieldError, Handler, RegistryError, RequestContext, Rules, Validator};
use crate::services::{apply_changes, Changeset, Field, Overwrite};
use crate::types::Outcome;
use crate::{command, query};

// ========================================
// Requests
// ========================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkTask {
    pub project_id: Option<Uuid>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub date: DateTime<Utc>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}
command!(CreateWorkTask => WorkTask);

/// Open a running task (no end time)
#[derive(Debug, Clone, Deserialize)]
pub struct StartWorkTask {
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub start: NaiveTime,
}
command!(StartWorkTask => Uuid);

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWorkTask {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub date: DateTime<Utc>,
    pub start: NaiveTime,
    pub end: NaiveTime,
}
command!(UpdateWorkTask => Outcome);

#[derive(Debug, Clone, Deserialize)]
pub struct PatchWorkTask {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}
command!(PatchWorkTask => Outcome);

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteWorkTask {
    pub id: Uuid,
}
command!(DeleteWorkTask => ());

#[derive(Debug, Clone, Deserialize)]
pub struct GetWorkTask {
    pub id: Uuid,
}
query!(GetWorkTask => Option<WorkTask>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListWorkTasks {}
query!(ListWorkTasks => WorkTaskList);

// ========================================
// Responses
// ========================================

/// A work task with its project resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkTaskView {
    pub id: Uuid,
    pub project: Option<Project>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub date: DateTime<Utc>,
    pub start: NaiveTime,
    pub end: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkTaskDay {
    pub date: NaiveDate,
    pub tasks: Vec<WorkTaskView>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WorkTaskList {
    pub active_work_task: Option<WorkTaskView>,
    /// Newest day first
    pub days: Vec<WorkTaskDay>,
}

// ========================================
// Validators
// ========================================

fn project_id_rule(rules: &mut Rules, project_id: Option<Uuid>) {
    rules.when(project_id, |rules, id| {
        rules.not_nil("ProjectId", id);
    });
}

pub struct CreateWorkTaskValidator;

impl Validator<CreateWorkTask> for CreateWorkTaskValidator {
    fn validate(&self, request: &CreateWorkTask) -> Vec<FieldError> {
        let mut rules = Rules::new();
        rules.greater_than("End", request.end, request.start);
        project_id_rule(&mut rules, request.project_id);
        rules.finish()
    }
}

pub struct UpdateWorkTaskValidator;

impl Validator<UpdateWorkTask> for UpdateWorkTaskValidator {
    fn validate(&self, request: &UpdateWorkTask) -> Vec<FieldError> {
        let mut rules = Rules::new();
        rules
            .not_nil("Id", request.id)
            .greater_than("End", request.end, request.start);
        project_id_rule(&mut rules, request.project_id);
        rules.finish()
    }
}

pub struct PatchWorkTaskValidator;

impl Validator<PatchWorkTask> for PatchWorkTaskValidator {
    fn validate(&self, request: &PatchWorkTask) -> Vec<FieldError> {
        let mut rules = Rules::new();
        rules.not_nil("Id", request.id);
        project_id_rule(&mut rules, request.project_id);
        rules.finish()
    }
}

// ========================================
// Guards
// ========================================

async fn ensure_project_exists(session: &Session, project_id: Option<Uuid>) -> Result<(), DispatchError> {
    let Some(id) = project_id else {
        return Ok(());
    };

    if session.find::<Project>(id).await?.is_none() {
        return Err(DispatchError::validation(
            "ProjectId",
            format!("Project with id '{}' not found.", id),
        ));
    }
    Ok(())
}

fn ensure_end_after_start(start: NaiveTime, end: Option<NaiveTime>) -> Result<(), DispatchError> {
    match end {
        Some(end) if end <= start => Err(DispatchError::validation(
            "End",
            format!("'End' must be greater than '{}'.", start),
        )),
        _ => Ok(()),
    }
}

struct WorkTaskChanges {
    project_id: Field<Option<Uuid>>,
    description: Field<Option<String>>,
    details: Field<Option<String>>,
    date: Field<DateTime<Utc>>,
    start: Field<NaiveTime>,
    end: Field<Option<NaiveTime>>,
}

impl From<UpdateWorkTask> for WorkTaskChanges {
    fn from(request: UpdateWorkTask) -> Self {
        let strategy = Overwrite::Always;
        Self {
            project_id: strategy.nullable(request.project_id),
            description: strategy.nullable(request.description),
            details: strategy.nullable(request.details),
            date: strategy.required(Some(request.date)),
            start: strategy.required(Some(request.start)),
            end: strategy.nullable(Some(request.end)),
        }
    }
}

impl From<PatchWorkTask> for WorkTaskChanges {
    fn from(request: PatchWorkTask) -> Self {
        let strategy = Overwrite::SkipIfAbsent;
        Self {
            project_id: strategy.nullable(request.project_id),
            description: strategy.nullable(request.description),
            details: strategy.nullable(request.details),
            date: strategy.required(request.date),
            start: strategy.required(request.start),
            end: strategy.nullable(request.end),
        }
    }
}

#[async_trait]
impl Changeset<WorkTask> for WorkTaskChanges {
    async fn check(&self, current: &WorkTask, session: &Session) -> Result<(), DispatchError> {
        // A patch may move only one end of the interval
        let start = self.start.as_set().copied().unwrap_or(current.start);
        let end = match &self.end {
            Field::Set(end) => *end,
            Field::Keep => current.end,
        };
        ensure_end_after_start(start, end)?;

        if let Some(project_id) = self.project_id.as_set() {
            ensure_project_exists(session, *project_id).await?;
        }
        Ok(())
    }

    fn apply(self, task: &mut WorkTask) {
        self.project_id.apply_to(&mut task.project_id);
        self.description.apply_to(&mut task.description);
        self.details.apply_to(&mut task.details);
        self.date.apply_to(&mut task.date);
        self.start.apply_to(&mut task.start);
        self.end.apply_to(&mut task.end);
    }
}

// ========================================
// Handlers
// ========================================

pub struct CreateWorkTaskHandler;

#[async_trait]
impl Handler<CreateWorkTask> for CreateWorkTaskHandler {
    async fn handle(&self, request: CreateWorkTask, ctx: &mut RequestContext) -> Result<WorkTask, DispatchError> {
        ensure_project_exists(ctx.session(), request.project_id).await?;

        let task = WorkTask {
            id: Uuid::new_v4(),
            project_id: request.project_id,
            description: request.description,
            details: request.details,
            date: request.date,
            start: request.start,
            end: Some(request.end),
        };
        ctx.session_mut().add(&task)?;
        Ok(task)
    }
}

pub struct StartWorkTaskHandler;

#[async_trait]
impl Handler<StartWorkTask> for StartWorkTaskHandler {
    async fn handle(&self, request: StartWorkTask, ctx: &mut RequestContext) -> Result<Uuid, DispatchError> {
        if ctx.session().any(|task: &WorkTask| task.is_running()).await? {
            tracing::warn!("Refusing to start a work task while another one is running");
            return Err(DispatchError::validation(
                "Description",
                "Cannot start task, there is already a running task.",
            ));
        }

        let task = WorkTask {
            id: Uuid::new_v4(),
            project_id: None,
            description: request.description,
            details: None,
            date: request.date,
            start: request.start,
            end: None,
        };
        ctx.session_mut().add(&task)?;
        Ok(task.id)
    }
}

pub struct UpdateWorkTaskHandler;

#[async_trait]
impl Handler<UpdateWorkTask> for UpdateWorkTaskHandler {
    async fn handle(&self, request: UpdateWorkTask, ctx: &mut RequestContext) -> Result<Outcome, DispatchError> {
        let id = request.id;
        apply_changes::<WorkTask, _>(ctx.session_mut(), id, WorkTaskChanges::from(request)).await
    }
}

pub struct PatchWorkTaskHandler;

#[async_trait]
impl Handler<PatchWorkTask> for PatchWorkTaskHandler {
    async fn handle(&self, request: PatchWorkTask, ctx: &mut RequestContext) -> Result<Outcome, DispatchError> {
        let id = request.id;
        apply_changes::<WorkTask, _>(ctx.session_mut(), id, WorkTaskChanges::from(request)).await
    }
}

pub struct DeleteWorkTaskHandler;

#[async_trait]
impl Handler<DeleteWorkTask> for DeleteWorkTaskHandler {
    async fn handle(&self, request: DeleteWorkTask, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        ctx.session_mut().remove::<WorkTask>(request.id).await?;
        Ok(())
    }
}

pub struct GetWorkTaskHandler;

#[async_trait]
impl Handler<GetWorkTask> for GetWorkTaskHandler {
    async fn handle(&self, request: GetWorkTask, ctx: &mut RequestContext) -> Result<Option<WorkTask>, DispatchError> {
        Ok(ctx.session().find::<WorkTask>(request.id).await?)
    }
}

pub struct ListWorkTasksHandler;

#[async_trait]
impl Handler<ListWorkTasks> for ListWorkTasksHandler {
    async fn handle(&self, _request: ListWorkTasks, ctx: &mut RequestContext) -> Result<WorkTaskList, DispatchError> {
        let mut tasks = ctx.session().list::<WorkTask>().await?;
        let projects: HashMap<Uuid, Project> = ctx
            .session()
            .list::<Project>()
            .await?
            .into_iter()
            .map(|project| (project.id, project))
            .collect();

        tasks.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.start.cmp(&a.start)));

        let views: Vec<WorkTaskView> = tasks
            .into_iter()
            .map(|task| WorkTaskView {
                id: task.id,
                project: task.project_id.and_then(|id| projects.get(&id).cloned()),
                description: task.description,
                details: task.details,
                date: task.date,
                start: task.start,
                end: task.end,
            })
            .collect();

        let active_work_task = views.iter().find(|view| view.end.is_none()).cloned();

        let mut days: Vec<WorkTaskDay> = Vec::new();
        for view in views {
            let date = view.date.date_naive();
            match days.last_mut() {
                Some(day) if day.date == date => day.tasks.push(view),
                _ => days.push(WorkTaskDay { date, tasks: vec![view] }),
            }
        }

        tracing::debug!("Listed work tasks across {} day(s)", days.len());
        Ok(WorkTaskList { active_work_task, days })
    }
}

pub fn register(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    builder
        .handler::<CreateWorkTask, _>(CreateWorkTaskHandler)?
        .handler::<StartWorkTask, _>(StartWorkTaskHandler)?
        .handler::<UpdateWorkTask, _>(UpdateWorkTaskHandler)?
        .handler::<PatchWorkTask, _>(PatchWorkTaskHandler)?
        .handler::<DeleteWorkTask, _>(DeleteWorkTaskHandler)?
        .handler::<GetWorkTask, _>(GetWorkTaskHandler)?
        .handler::<ListWorkTasks, _>(ListWorkTasksHandler)?
        .validator::<CreateWorkTask, _>(CreateWorkTaskValidator)
        .validator::<UpdateWorkTask, _>(UpdateWorkTaskValidator)
        .validator::<PatchWorkTask, _>(PatchWorkTaskValidator);
    Ok(())
}
