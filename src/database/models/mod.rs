pub mod author;
pub mod product;
pub mod product_category;
pub mod project;
pub mod work_task;

pub use author::Author;
pub use product::{Book, Product, ProductType};
pub use product_category::ProductCategory;
pub use project::Project;
pub use work_task::WorkTask;
