// Catalog requests: authors, product categories, books and products.
// Catalog entities are shared between principals.

pub mod authors;
pub mod books;
pub mod product_categories;
pub mod products;

pub use authors::*;
pub use books::*;
pub use product_categories::*;
pub use products::*;

use crate::pipeline::{DispatcherBuilder, RegistryError};

pub fn register(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    authors::register(builder)?;
    product_categories::register(builder)?;
    books::register(builder)?;
    products::register(builder)?;
    Ok(())
}
