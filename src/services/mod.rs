pub mod category_graph;
pub mod changes;
pub mod referential_integrity;

pub use category_graph::{ensure_categories_exist, validate_subcategories};
pub use changes::{apply_changes, Changeset, Field, Overwrite};
pub use referential_integrity::{
    ensure_author_not_referenced, ensure_category_not_referenced, ensure_not_referenced,
};
