use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Author, Book, Product};
use crate::database::session::Session;
use crate::error::DispatchError;
use crate::filter::Paging;
use crate::pipeline::{DispatcherBuilder, FieldError, Handler, RegistryError, RequestContext, Rules, Validator};
use crate::services::{apply_changes, ensure_categories_exist, Changeset, Field, Overwrite};
use crate::types::Outcome;
use crate::{command, query};

const CATEGORY_IDS_FIELD: &str = "ProductCategoryIds";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBook {
    pub name: String,
    pub author_id: Uuid,
    pub retail_price: Decimal,
    pub price: Decimal,
    pub discount_amount: Decimal,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub product_category_ids: Vec<Uuid>,
}
command!(CreateBook => Book);

/// Full replacement of a book; omitted optional fields are cleared,
/// including the author
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBook {
    pub id: Uuid,
    pub name: String,
    pub author_id: Option<Uuid>,
    pub retail_price: Decimal,
    pub price: Decimal,
    pub discount_amount: Decimal,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub product_category_ids: Vec<Uuid>,
}
command!(UpdateBook => Outcome);

/// Partial change of a book; only supplied fields change
#[derive(Debug, Clone, Deserialize)]
pub struct PatchBook {
    pub id: Uuid,
    pub name: Option<String>,
    pub author_id: Option<Uuid>,
    pub retail_price: Option<Decimal>,
    pub price: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub product_category_ids: Option<Vec<Uuid>>,
}
command!(PatchBook => Outcome);

#[derive(Debug, Clone, Deserialize)]
pub struct GetBook {
    pub id: Uuid,
}
query!(GetBook => Option<Book>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetBooks {
    pub page_size: Option<i64>,
    pub offset: Option<i64>,
}
query!(GetBooks => Vec<Book>);

// ========================================
// Validators
// ========================================

fn price_rules(rules: &mut Rules, retail_price: Option<Decimal>, price: Option<Decimal>, discount: Option<Decimal>) {
    rules
        .when(retail_price, |rules, value| {
            rules.greater_than("RetailPrice", value, Decimal::ZERO);
        })
        .when(price, |rules, value| {
            rules.greater_than("Price", value, Decimal::ZERO);
        })
        .when(discount, |rules, value| {
            rules.greater_or_equal("DiscountAmount", value, Decimal::ZERO);
        });
}

pub struct CreateBookValidator;

impl Validator<CreateBook> for CreateBookValidator {
    fn validate(&self, request: &CreateBook) -> Vec<FieldError> {
        let mut rules = Rules::new();
        rules
            .not_empty("Name", &request.name)
            .not_nil("AuthorId", request.author_id);
        price_rules(
            &mut rules,
            Some(request.retail_price),
            Some(request.price),
            Some(request.discount_amount),
        );
        rules.finish()
    }
}

pub struct UpdateBookValidator;

impl Validator<UpdateBook> for UpdateBookValidator {
    fn validate(&self, request: &UpdateBook) -> Vec<FieldError> {
        let mut rules = Rules::new();
        rules
            .not_nil("Id", request.id)
            .not_empty("Name", &request.name)
            .when(request.author_id, |rules, author_id| {
                rules.not_nil("AuthorId", author_id);
            });
        price_rules(
            &mut rules,
            Some(request.retail_price),
            Some(request.price),
            Some(request.discount_amount),
        );
        rules.finish()
    }
}

pub struct PatchBookValidator;

impl Validator<PatchBook> for PatchBookValidator {
    fn validate(&self, request: &PatchBook) -> Vec<FieldError> {
        let mut rules = Rules::new();
        rules
            .not_nil("Id", request.id)
            .when(request.name.as_deref(), |rules, name| {
                rules.not_empty("Name", name);
            })
            .when(request.author_id, |rules, author_id| {
                rules.not_nil("AuthorId", author_id);
            });
        price_rules(&mut rules, request.retail_price, request.price, request.discount_amount);
        rules.finish()
    }
}

// ========================================
// Changes
// ========================================

async fn ensure_author_exists(session: &Session, author_id: Uuid) -> Result<(), DispatchError> {
    if session.find::<Author>(author_id).await?.is_none() {
        return Err(DispatchError::validation(
            "AuthorId",
            format!("AuthorId '{}' not found.", author_id),
        ));
    }
    Ok(())
}

struct BookChanges {
    name: Field<String>,
    author_id: Field<Option<Uuid>>,
    retail_price: Field<Decimal>,
    price: Field<Decimal>,
    discount_amount: Field<Decimal>,
    description: Field<Option<String>>,
    cover_image_url: Field<Option<String>>,
    product_category_ids: Field<Vec<Uuid>>,
}

impl From<UpdateBook> for BookChanges {
    fn from(request: UpdateBook) -> Self {
        let strategy = Overwrite::Always;
        Self {
            name: strategy.required(Some(request.name)),
            author_id: strategy.nullable(request.author_id),
            retail_price: strategy.required(Some(request.retail_price)),
            price: strategy.required(Some(request.price)),
            discount_amount: strategy.required(Some(request.discount_amount)),
            description: strategy.nullable(request.description),
            cover_image_url: strategy.nullable(request.cover_image_url),
            product_category_ids: strategy.required(Some(request.product_category_ids)),
        }
    }
}

impl From<PatchBook> for BookChanges {
    fn from(request: PatchBook) -> Self {
        let strategy = Overwrite::SkipIfAbsent;
        Self {
            name: strategy.required(request.name),
            author_id: strategy.nullable(request.author_id),
            retail_price: strategy.required(request.retail_price),
            price: strategy.required(request.price),
            discount_amount: strategy.required(request.discount_amount),
            description: strategy.nullable(request.description),
            cover_image_url: strategy.nullable(request.cover_image_url),
            product_category_ids: strategy.required(request.product_category_ids),
        }
    }
}

#[async_trait]
impl Changeset<Product> for BookChanges {
    async fn check(&self, _current: &Product, session: &Session) -> Result<(), DispatchError> {
        if let Some(Some(author_id)) = self.author_id.as_set() {
            ensure_author_exists(session, *author_id).await?;
        }
        if let Some(ids) = self.product_category_ids.as_set() {
            ensure_categories_exist(session, CATEGORY_IDS_FIELD, ids).await?;
        }
        Ok(())
    }

    fn apply(self, product: &mut Product) {
        let Product::Book(book) = product;
        self.name.apply_to(&mut book.name);
        self.author_id.apply_to(&mut book.author_id);
        self.retail_price.apply_to(&mut book.retail_price);
        self.price.apply_to(&mut book.price);
        self.discount_amount.apply_to(&mut book.discount_amount);
        self.description.apply_to(&mut book.description);
        self.cover_image_url.apply_to(&mut book.cover_image_url);
        self.product_category_ids.apply_to(&mut book.product_category_ids);
    }
}

// ========================================
// Handlers
// ========================================

pub struct CreateBookHandler;

#[async_trait]
impl Handler<CreateBook> for CreateBookHandler {
    async fn handle(&self, request: CreateBook, ctx: &mut RequestContext) -> Result<Book, DispatchError> {
        let session = ctx.session_mut();
        ensure_author_exists(session, request.author_id).await?;
        ensure_categories_exist(session, CATEGORY_IDS_FIELD, &request.product_category_ids).await?;

        let book = Book {
            id: Uuid::new_v4(),
            name: request.name,
            retail_price: request.retail_price,
            price: request.price,
            discount_amount: request.discount_amount,
            description: request.description,
            cover_image_url: request.cover_image_url,
            product_category_ids: request.product_category_ids,
            author_id: Some(request.author_id),
        };
        session.add(&Product::Book(book.clone()))?;
        Ok(book)
    }
}

pub struct UpdateBookHandler;

#[async_trait]
impl Handler<UpdateBook> for UpdateBookHandler {
    async fn handle(&self, request: UpdateBook, ctx: &mut RequestContext) -> Result<Outcome, DispatchError> {
        let id = request.id;
        apply_changes::<Product, _>(ctx.session_mut(), id, BookChanges::from(request)).await
    }
}

pub struct PatchBookHandler;

#[async_trait]
impl Handler<PatchBook> for PatchBookHandler {
    async fn handle(&self, request: PatchBook, ctx: &mut RequestContext) -> Result<Outcome, DispatchError> {
        let id = request.id;
        apply_changes::<Product, _>(ctx.session_mut(), id, BookChanges::from(request)).await
    }
}

pub struct GetBookHandler;

#[async_trait]
impl Handler<GetBook> for GetBookHandler {
    async fn handle(&self, request: GetBook, ctx: &mut RequestContext) -> Result<Option<Book>, DispatchError> {
        let product = ctx.session().find::<Product>(request.id).await?;
        Ok(product.and_then(Product::into_book))
    }
}

pub struct GetBooksHandler;

#[async_trait]
impl Handler<GetBooks> for GetBooksHandler {
    async fn handle(&self, request: GetBooks, ctx: &mut RequestContext) -> Result<Vec<Book>, DispatchError> {
        let paging = Paging::normalize(request.page_size, request.offset);
        let mut books: Vec<Book> = ctx
            .session()
            .list::<Product>()
            .await?
            .into_iter()
            .filter_map(Product::into_book)
            .collect();
        books.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paging.apply(books))
    }
}

pub fn register(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    builder
        .handler::<CreateBook, _>(CreateBookHandler)?
        .handler::<UpdateBook, _>(UpdateBookHandler)?
        .handler::<PatchBook, _>(PatchBookHandler)?
        .handler::<GetBook, _>(GetBookHandler)?
        .handler::<GetBooks, _>(GetBooksHandler)?
        .validator::<CreateBook, _>(CreateBookValidator)
        .validator::<UpdateBook, _>(UpdateBookValidator)
        .validator::<PatchBook, _>(PatchBookValidator);
    Ok(())
}
