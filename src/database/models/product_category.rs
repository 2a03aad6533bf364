use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub is_top_level_category: bool,
    /// Ids of child categories; never contains `id` itself
    #[serde(default)]
    pub subcategories: Vec<Uuid>,
}

impl Entity for ProductCategory {
    const COLLECTION: &'static str = "product_categories";

    fn id(&self) -> Uuid {
        self.id
    }
}
