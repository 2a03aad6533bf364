use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl Entity for Author {
    const COLLECTION: &'static str = "authors";

    fn id(&self) -> Uuid {
        self.id
    }
}
