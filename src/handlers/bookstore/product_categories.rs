use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::ProductCategory;
use crate::database::session::Session;
use crate::error::DispatchError;
use crate::filter::Paging;
use crate::pipeline::{DispatcherBuilder, FieldError, Handler, RegistryError, RequestContext, Rules, Validator};
use crate::services::{
    apply_changes, ensure_category_not_referenced, validate_subcategories, Changeset, Field, Overwrite,
};
use crate::types::Outcome;
use crate::{command, query};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductCategory {
    pub name: String,
    pub is_top_level_category: Option<bool>,
    pub subcategories: Option<Vec<Uuid>>,
}
command!(CreateProductCategory => ProductCategory);

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProductCategory {
    pub id: Uuid,
    pub name: String,
    pub is_top_level_category: bool,
    pub subcategories: Vec<Uuid>,
}
command!(UpdateProductCategory => Outcome);

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteProductCategory {
    pub id: Uuid,
}
command!(DeleteProductCategory => ());

#[derive(Debug, Clone, Deserialize)]
pub struct GetProductCategory {
    pub id: Uuid,
}
query!(GetProductCategory => Option<ProductCategory>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetProductCategories {
    pub page_size: Option<i64>,
    pub offset: Option<i64>,
}
query!(GetProductCategories => Vec<ProductCategory>);

pub struct CreateProductCategoryValidator;

impl Validator<CreateProductCategory> for CreateProductCategoryValidator {
    fn validate(&self, request: &CreateProductCategory) -> Vec<FieldError> {
        Rules::new().not_empty("Name", &request.name).finish()
    }
}

pub struct UpdateProductCategoryValidator;

impl Validator<UpdateProductCategory> for UpdateProductCategoryValidator {
    fn validate(&self, request: &UpdateProductCategory) -> Vec<FieldError> {
        Rules::new()
            .not_nil("Id", request.id)
            .not_empty("Name", &request.name)
            .finish()
    }
}

struct CategoryChanges {
    name: Field<String>,
    is_top_level_category: Field<bool>,
    subcategories: Field<Vec<Uuid>>,
}

#[async_trait]
impl Changeset<ProductCategory> for CategoryChanges {
    async fn check(&self, current: &ProductCategory, session: &Session) -> Result<(), DispatchError> {
        match self.subcategories.as_set() {
            Some(subcategories) => validate_subcategories(session, current.id, subcategories).await,
            None => Ok(()),
        }
    }

    fn apply(self, category: &mut ProductCategory) {
        self.name.apply_to(&mut category.name);
        self.is_top_level_category.apply_to(&mut category.is_top_level_category);
        self.subcategories.apply_to(&mut category.subcategories);
    }
}

pub struct CreateProductCategoryHandler;

#[async_trait]
impl Handler<CreateProductCategory> for CreateProductCategoryHandler {
    async fn handle(
        &self,
        request: CreateProductCategory,
        ctx: &mut RequestContext,
    ) -> Result<ProductCategory, DispatchError> {
        let category = ProductCategory {
            id: Uuid::new_v4(),
            name: request.name,
            is_top_level_category: request.is_top_level_category.unwrap_or(false),
            subcategories: request.subcategories.unwrap_or_default(),
        };

        let session = ctx.session_mut();
        validate_subcategories(session, category.id, &category.subcategories).await?;
        session.add(&category)?;
        Ok(category)
    }
}

pub struct UpdateProductCategoryHandler;

#[async_trait]
impl Handler<UpdateProductCategory> for UpdateProductCategoryHandler {
    async fn handle(
        &self,
        request: UpdateProductCategory,
        ctx: &mut RequestContext,
    ) -> Result<Outcome, DispatchError> {
        let strategy = Overwrite::Always;
        let changes = CategoryChanges {
            name: strategy.required(Some(request.name)),
            is_top_level_category: strategy.required(Some(request.is_top_level_category)),
            subcategories: strategy.required(Some(request.subcategories)),
        };
        apply_changes::<ProductCategory, _>(ctx.session_mut(), request.id, changes).await
    }
}

pub struct DeleteProductCategoryHandler;

#[async_trait]
impl Handler<DeleteProductCategory> for DeleteProductCategoryHandler {
    async fn handle(&self, request: DeleteProductCategory, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        let session = ctx.session_mut();
        if session.find::<ProductCategory>(request.id).await?.is_none() {
            return Ok(());
        }

        ensure_category_not_referenced(session, request.id).await?;
        session.remove::<ProductCategory>(request.id).await?;
        Ok(())
    }
}

pub struct GetProductCategoryHandler;

#[async_trait]
impl Handler<GetProductCategory> for GetProductCategoryHandler {
    async fn handle(
        &self,
        request: GetProductCategory,
        ctx: &mut RequestContext,
    ) -> Result<Option<ProductCategory>, DispatchError> {
        Ok(ctx.session().find::<ProductCategory>(request.id).await?)
    }
}

pub struct GetProductCategoriesHandler;

#[async_trait]
impl Handler<GetProductCategories> for GetProductCategoriesHandler {
    async fn handle(
        &self,
        request: GetProductCategories,
        ctx: &mut RequestContext,
    ) -> Result<Vec<ProductCategory>, DispatchError> {
        let paging = Paging::normalize(request.page_size, request.offset);
        let mut categories = ctx.session().list::<ProductCategory>().await?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paging.apply(categories))
    }
}

pub fn register(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    builder
        .handler::<CreateProductCategory, _>(CreateProductCategoryHandler)?
        .handler::<UpdateProductCategory, _>(UpdateProductCategoryHandler)?
        .handler::<DeleteProductCategory, _>(DeleteProductCategoryHandler)?
        .handler::<GetProductCategory, _>(GetProductCategoryHandler)?
        .handler::<GetProductCategories, _>(GetProductCategoriesHandler)?
        .validator::<CreateProductCategory, _>(CreateProductCategoryValidator)
        .validator::<UpdateProductCategory, _>(UpdateProductCategoryValidator);
    Ok(())
}
