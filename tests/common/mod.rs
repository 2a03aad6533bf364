#![allow(dead_code)]

use std::sync::Once;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

use devbook_api_rust::database::models::{Author, Book, ProductCategory};
use devbook_api_rust::handlers::bookstore::{CreateAuthor, CreateBook, CreateProductCategory};
use devbook_api_rust::testing::TestContext;
use devbook_api_rust::DispatchError;

static TRACING: Once = Once::new();

/// Fresh dispatcher over an empty in-memory store
pub fn context() -> Result<TestContext> {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
    TestContext::new()
}

pub async fn create_author(ctx: &TestContext, name: &str) -> Result<Author> {
    ctx.send(CreateAuthor {
        name: name.to_string(),
        description: Some(format!("About {}", name)),
    })
    .await
    .context("create author")
}

pub async fn create_category(ctx: &TestContext, name: &str, subcategories: Vec<Uuid>) -> Result<ProductCategory> {
    ctx.send(CreateProductCategory {
        name: name.to_string(),
        is_top_level_category: Some(subcategories.is_empty()),
        subcategories: Some(subcategories),
    })
    .await
    .context("create category")
}

pub fn new_book(name: &str, author_id: Uuid, product_category_ids: Vec<Uuid>) -> CreateBook {
    CreateBook {
        name: name.to_string(),
        author_id,
        retail_price: Decimal::new(3999, 2),
        price: Decimal::new(2999, 2),
        discount_amount: Decimal::ZERO,
        description: None,
        cover_image_url: None,
        product_category_ids,
    }
}

pub async fn create_book(ctx: &TestContext, name: &str, author_id: Uuid, category_ids: Vec<Uuid>) -> Result<Book> {
    ctx.send(new_book(name, author_id, category_ids))
        .await
        .context("create book")
}

/// Names of the fields a validation error reports on
pub fn failed_fields<T: std::fmt::Debug>(result: Result<T, DispatchError>) -> Vec<String> {
    match result {
        Err(DispatchError::Validation(errors)) => errors.fields().map(str::to_string).collect(),
        other => panic!("expected a validation error, got {:?}", other),
    }
}

/// First message reported on `field`
pub fn field_message<T: std::fmt::Debug>(result: Result<T, DispatchError>, field: &str) -> String {
    match result {
        Err(DispatchError::Validation(errors)) => errors
            .get(field)
            .and_then(|messages| messages.first().cloned())
            .unwrap_or_else(|| panic!("no error reported on '{}': {:?}", field, errors)),
        other => panic!("expected a validation error, got {:?}", other),
    }
}
