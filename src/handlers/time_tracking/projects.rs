use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::Project;
use crate::error::DispatchError;
use crate::filter::Paging;
use crate::pipeline::{DispatcherBuilder, FieldError, Handler, RegistryError, RequestContext, Rules, Validator};
use crate::services::{apply_changes, Changeset, Field, Overwrite};
use crate::types::Outcome;
use crate::{command, query};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub details: Option<String>,
    pub hourly_rate: Option<i32>,
    pub currency: Option<String>,
    pub hex_color: Option<String>,
}
command!(CreateProject => Uuid);

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProject {
    pub id: Uuid,
    pub name: String,
    pub details: Option<String>,
    pub hourly_rate: Option<i32>,
    pub currency: Option<String>,
    pub hex_color: Option<String>,
}
command!(UpdateProject => Outcome);

#[derive(Debug, Clone, Deserialize)]
pub struct PatchProject {
    pub id: Uuid,
    pub name: Option<String>,
    pub details: Option<String>,
    pub hourly_rate: Option<i32>,
    pub currency: Option<String>,
    pub hex_color: Option<String>,
}
command!(PatchProject => Outcome);

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteProject {
    pub id: Uuid,
}
command!(DeleteProject => ());

#[derive(Debug, Clone, Deserialize)]
pub struct GetProject {
    pub id: Uuid,
}
query!(GetProject => Option<Project>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetProjects {
    pub page_size: Option<i64>,
    pub offset: Option<i64>,
}
query!(GetProjects => Vec<Project>);

pub struct CreateProjectValidator;

impl Validator<CreateProject> for CreateProjectValidator {
    fn validate(&self, request: &CreateProject) -> Vec<FieldError> {
        Rules::new().not_empty("Name", &request.name).finish()
    }
}

pub struct UpdateProjectValidator;

impl Validator<UpdateProject> for UpdateProjectValidator {
    fn validate(&self, request: &UpdateProject) -> Vec<FieldError> {
        Rules::new()
            .not_nil("Id", request.id)
            .not_empty("Name", &request.name)
            .finish()
    }
}

pub struct PatchProjectValidator;

impl Validator<PatchProject> for PatchProjectValidator {
    fn validate(&self, request: &PatchProject) -> Vec<FieldError> {
        Rules::new()
            .not_nil("Id", request.id)
            .when(request.name.as_deref(), |rules, name| {
                rules.not_empty("Name", name);
            })
            .finish()
    }
}

struct ProjectChanges {
    name: Field<String>,
    details: Field<Option<String>>,
    hourly_rate: Field<Option<i32>>,
    currency: Field<Option<String>>,
    hex_color: Field<Option<String>>,
}

impl Changeset<Project> for ProjectChanges {
    fn apply(self, project: &mut Project) {
        self.name.apply_to(&mut project.name);
        self.details.apply_to(&mut project.details);
        self.hourly_rate.apply_to(&mut project.hourly_rate);
        self.currency.apply_to(&mut project.currency);
        self.hex_color.apply_to(&mut project.hex_color);
    }
}

impl ProjectChanges {
    fn lower(
        strategy: Overwrite,
        name: Option<String>,
        details: Option<String>,
        hourly_rate: Option<i32>,
        currency: Option<String>,
        hex_color: Option<String>,
    ) -> Self {
        Self {
            name: strategy.required(name),
            details: strategy.nullable(details),
            hourly_rate: strategy.nullable(hourly_rate),
            currency: strategy.nullable(currency),
            hex_color: strategy.nullable(hex_color),
        }
    }
}

pub struct CreateProjectHandler;

#[async_trait]
impl Handler<CreateProject> for CreateProjectHandler {
    async fn handle(&self, request: CreateProject, ctx: &mut RequestContext) -> Result<Uuid, DispatchError> {
        let project = Project {
            id: Uuid::new_v4(),
            name: request.name,
            details: request.details,
            hourly_rate: request.hourly_rate,
            currency: request.currency,
            hex_color: request.hex_color,
        };
        ctx.session_mut().add(&project)?;
        Ok(project.id)
    }
}

pub struct UpdateProjectHandler;

#[async_trait]
impl Handler<UpdateProject> for UpdateProjectHandler {
    async fn handle(&self, request: UpdateProject, ctx: &mut RequestContext) -> Result<Outcome, DispatchError> {
        let changes = ProjectChanges::lower(
            Overwrite::Always,
            Some(request.name),
            request.details,
            request.hourly_rate,
            request.currency,
            request.hex_color,
        );
        apply_changes::<Project, _>(ctx.session_mut(), request.id, changes).await
    }
}

pub struct PatchProjectHandler;

#[async_trait]
impl Handler<PatchProject> for PatchProjectHandler {
    async fn handle(&self, request: PatchProject, ctx: &mut RequestContext) -> Result<Outcome, DispatchError> {
        let changes = ProjectChanges::lower(
            Overwrite::SkipIfAbsent,
            request.name,
            request.details,
            request.hourly_rate,
            request.currency,
            request.hex_color,
        );
        apply_changes::<Project, _>(ctx.session_mut(), request.id, changes).await
    }
}

pub struct DeleteProjectHandler;

#[async_trait]
impl Handler<DeleteProject> for DeleteProjectHandler {
    async fn handle(&self, request: DeleteProject, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        ctx.session_mut().remove::<Project>(request.id).await?;
        Ok(())
    }
}

pub struct GetProjectHandler;

#[async_trait]
impl Handler<GetProject> for GetProjectHandler {
    async fn handle(&self, request: GetProject, ctx: &mut RequestContext) -> Result<Option<Project>, DispatchError> {
        Ok(ctx.session().find::<Project>(request.id).await?)
    }
}

pub struct GetProjectsHandler;

#[async_trait]
impl Handler<GetProjects> for GetProjectsHandler {
    async fn handle(&self, request: GetProjects, ctx: &mut RequestContext) -> Result<Vec<Project>, DispatchError> {
        let paging = Paging::normalize(request.page_size, request.offset);
        let mut projects = ctx.session().list::<Project>().await?;
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paging.apply(projects))
    }
}

pub fn register(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    builder
        .handler::<CreateProject, _>(CreateProjectHandler)?
        .handler::<UpdateProject, _>(UpdateProjectHandler)?
        .handler::<PatchProject, _>(PatchProjectHandler)?
        .handler::<DeleteProject, _>(DeleteProjectHandler)?
        .handler::<GetProject, _>(GetProjectHandler)?
        .handler::<GetProjects, _>(GetProjectsHandler)?
        .validator::<CreateProject, _>(CreateProjectValidator)
        .validator::<UpdateProject, _>(UpdateProjectValidator)
        .validator::<PatchProject, _>(PatchProjectValidator);
    Ok(())
}
