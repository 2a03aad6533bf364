use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::Author;
use crate::error::DispatchError;
use crate::filter::Paging;
use crate::pipeline::{DispatcherBuilder, FieldError, Handler, RegistryError, RequestContext, Rules, Validator};
use crate::services::{apply_changes, ensure_author_not_referenced, Changeset, Field, Overwrite};
use crate::types::Outcome;
use crate::{command, query};

// ========================================
// Requests
// ========================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuthor {
    pub name: String,
    pub description: Option<String>,
}
command!(CreateAuthor => Author);

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAuthor {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}
command!(UpdateAuthor => Outcome);

#[derive(Debug, Clone, Deserialize)]
pub struct PatchAuthor {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
}
command!(PatchAuthor => Outcome);

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAuthor {
    pub id: Uuid,
}
command!(DeleteAuthor => ());

#[derive(Debug, Clone, Deserialize)]
pub struct GetAuthor {
    pub id: Uuid,
}
query!(GetAuthor => Option<Author>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetAuthors {
    pub page_size: Option<i64>,
    pub offset: Option<i64>,
}
query!(GetAuthors => Vec<Author>);

// ========================================
// Validators
// ========================================

pub struct CreateAuthorValidator;

impl Validator<CreateAuthor> for CreateAuthorValidator {
    fn validate(&self, request: &CreateAuthor) -> Vec<FieldError> {
        Rules::new().not_empty("Name", &request.name).finish()
    }
}

pub struct UpdateAuthorValidator;

impl Validator<UpdateAuthor> for UpdateAuthorValidator {
    fn validate(&self, request: &UpdateAuthor) -> Vec<FieldError> {
        Rules::new()
            .not_nil("Id", request.id)
            .not_empty("Name", &request.name)
            .finish()
    }
}

pub struct PatchAuthorValidator;

impl Validator<PatchAuthor> for PatchAuthorValidator {
    fn validate(&self, request: &PatchAuthor) -> Vec<FieldError> {
        Rules::new()
            .not_nil("Id", request.id)
            .when(request.name.as_deref(), |rules, name| {
                rules.not_empty("Name", name);
            })
            .finish()
    }
}

// ========================================
// Changes
// ========================================

struct AuthorChanges {
    name: Field<String>,
    description: Field<Option<String>>,
}

impl AuthorChanges {
    fn lower(strategy: Overwrite, name: Option<String>, description: Option<String>) -> Self {
        Self {
            name: strategy.required(name),
            description: strategy.nullable(description),
        }
    }
}

impl Changeset<Author> for AuthorChanges {
    fn apply(self, author: &mut Author) {
        self.name.apply_to(&mut author.name);
        self.description.apply_to(&mut author.description);
    }
}

// ========================================
// Handlers
// ========================================

pub struct CreateAuthorHandler;

#[async_trait]
impl Handler<CreateAuthor> for CreateAuthorHandler {
    async fn handle(&self, request: CreateAuthor, ctx: &mut RequestContext) -> Result<Author, DispatchError> {
        let author = Author {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
        };
        ctx.session_mut().add(&author)?;
        Ok(author)
    }
}

pub struct UpdateAuthorHandler;

#[async_trait]
impl Handler<UpdateAuthor> for UpdateAuthorHandler {
    async fn handle(&self, request: UpdateAuthor, ctx: &mut RequestContext) -> Result<Outcome, DispatchError> {
        let changes = AuthorChanges::lower(Overwrite::Always, Some(request.name), request.description);
        apply_changes::<Author, _>(ctx.session_mut(), request.id, changes).await
    }
}

pub struct PatchAuthorHandler;

#[async_trait]
impl Handler<PatchAuthor> for PatchAuthorHandler {
    async fn handle(&self, request: PatchAuthor, ctx: &mut RequestContext) -> Result<Outcome, DispatchError> {
        let changes = AuthorChanges::lower(Overwrite::SkipIfAbsent, request.name, request.description);
        apply_changes::<Author, _>(ctx.session_mut(), request.id, changes).await
    }
}

pub struct DeleteAuthorHandler;

#[async_trait]
impl Handler<DeleteAuthor> for DeleteAuthorHandler {
    async fn handle(&self, request: DeleteAuthor, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        let session = ctx.session_mut();
        if session.find::<Author>(request.id).await?.is_none() {
            return Ok(());
        }

        ensure_author_not_referenced(session, request.id).await?;
        session.remove::<Author>(request.id).await?;
        Ok(())
    }
}

pub struct GetAuthorHandler;

#[async_trait]
impl Handler<GetAuthor> for GetAuthorHandler {
    async fn handle(&self, request: GetAuthor, ctx: &mut RequestContext) -> Result<Option<Author>, DispatchError> {
        Ok(ctx.session().find::<Author>(request.id).await?)
    }
}

pub struct GetAuthorsHandler;

#[async_trait]
impl Handler<GetAuthors> for GetAuthorsHandler {
    async fn handle(&self, request: GetAuthors, ctx: &mut RequestContext) -> Result<Vec<Author>, DispatchError> {
        let paging = Paging::normalize(request.page_size, request.offset);
        let mut authors = ctx.session().list::<Author>().await?;
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paging.apply(authors))
    }
}

pub fn register(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    builder
        .handler::<CreateAuthor, _>(CreateAuthorHandler)?
        .handler::<UpdateAuthor, _>(UpdateAuthorHandler)?
        .handler::<PatchAuthor, _>(PatchAuthorHandler)?
        .handler::<DeleteAuthor, _>(DeleteAuthorHandler)?
        .handler::<GetAuthor, _>(GetAuthorHandler)?
        .handler::<GetAuthors, _>(GetAuthorsHandler)?
        .validator::<CreateAuthor, _>(CreateAuthorValidator)
        .validator::<UpdateAuthor, _>(UpdateAuthorValidator)
        .validator::<PatchAuthor, _>(PatchAuthorValidator);
    Ok(())
}
