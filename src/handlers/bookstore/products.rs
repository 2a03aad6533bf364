use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::config;
use crate::database::models::Product;
use crate::error::DispatchError;
use crate::filter::Paging;
use crate::pipeline::{DispatcherBuilder, Handler, RegistryError, RequestContext};
use crate::{command, query};

#[derive(Debug, Clone, Deserialize)]
pub struct GetProduct {
    pub id: Uuid,
}
query!(GetProduct => Option<Product>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetProducts {
    pub page_size: Option<i64>,
    pub offset: Option<i64>,
}
query!(GetProducts => Vec<Product>);

/// Case-insensitive substring search on product names
#[derive(Debug, Clone, Deserialize)]
pub struct SearchProducts {
    #[serde(default)]
    pub search_term: String,
}
query!(SearchProducts => Vec<Product>);

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteProduct {
    pub id: Uuid,
}
command!(DeleteProduct => ());

fn by_name(products: &mut [Product]) {
    products.sort_by(|a, b| a.name().cmp(b.name()));
}

pub struct GetProductHandler;

#[async_trait]
impl Handler<GetProduct> for GetProductHandler {
    async fn handle(&self, request: GetProduct, ctx: &mut RequestContext) -> Result<Option<Product>, DispatchError> {
        Ok(ctx.session().find::<Product>(request.id).await?)
    }
}

pub struct GetProductsHandler;

#[async_trait]
impl Handler<GetProducts> for GetProductsHandler {
    async fn handle(&self, request: GetProducts, ctx: &mut RequestContext) -> Result<Vec<Product>, DispatchError> {
        let paging = Paging::normalize(request.page_size, request.offset);
        let mut products = ctx.session().list::<Product>().await?;
        by_name(&mut products);
        Ok(paging.apply(products))
    }
}

pub struct SearchProductsHandler;

#[async_trait]
impl Handler<SearchProducts> for SearchProductsHandler {
    async fn handle(&self, request: SearchProducts, ctx: &mut RequestContext) -> Result<Vec<Product>, DispatchError> {
        let term = request.search_term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let mut products = ctx
            .session()
            .query::<Product, _>(move |p| p.name().to_lowercase().contains(&term))
            .await?;
        by_name(&mut products);
        products.truncate(config::config().paging.max_page_size);
        Ok(products)
    }
}

pub struct DeleteProductHandler;

#[async_trait]
impl Handler<DeleteProduct> for DeleteProductHandler {
    async fn handle(&self, request: DeleteProduct, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        ctx.session_mut().remove::<Product>(request.id).await?;
        Ok(())
    }
}

pub fn register(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    builder
        .handler::<GetProduct, _>(GetProductHandler)?
        .handler::<GetProducts, _>(GetProductsHandler)?
        .handler::<SearchProducts, _>(SearchProductsHandler)?
        .handler::<DeleteProduct, _>(DeleteProductHandler)?;
    Ok(())
}
