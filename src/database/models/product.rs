use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::entity::Entity;

/// Discriminator stored with every product row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    Book,
}

/// Catalog product. Rows of every variant share one collection and are told
/// apart by the `product_type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "product_type")]
pub enum Product {
    Book(Book),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub name: String,
    pub retail_price: Decimal,
    pub price: Decimal,
    pub discount_amount: Decimal,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub product_category_ids: Vec<Uuid>,
    pub author_id: Option<Uuid>,
}

impl Product {
    pub fn product_type(&self) -> ProductType {
        match self {
            Product::Book(_) => ProductType::Book,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Product::Book(book) => &book.name,
        }
    }

    pub fn author_id(&self) -> Option<Uuid> {
        match self {
            Product::Book(book) => book.author_id,
        }
    }

    pub fn product_category_ids(&self) -> &[Uuid] {
        match self {
            Product::Book(book) => &book.product_category_ids,
        }
    }

    pub fn into_book(self) -> Option<Book> {
        match self {
            Product::Book(book) => Some(book),
        }
    }
}

impl From<Book> for Product {
    fn from(book: Book) -> Self {
        Product::Book(book)
    }
}

impl Entity for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> Uuid {
        match self {
            Product::Book(book) => book.id,
        }
    }
}
