use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::entity::{Entity, EntityScope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub details: Option<String>,
    pub hourly_rate: Option<i32>,
    pub currency: Option<String>,
    pub hex_color: Option<String>,
}

impl Entity for Project {
    const COLLECTION: &'static str = "projects";
    const SCOPE: EntityScope = EntityScope::TenantOwned;

    fn id(&self) -> Uuid {
        self.id
    }
}
