use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::entity::{Entity, EntityScope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkTask {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub date: DateTime<Utc>,
    pub start: NaiveTime,
    /// `None` while the task is running
    pub end: Option<NaiveTime>,
}

impl WorkTask {
    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }
}

impl Entity for WorkTask {
    const COLLECTION: &'static str = "work_tasks";
    const SCOPE: EntityScope = EntityScope::TenantOwned;

    fn id(&self) -> Uuid {
        self.id
    }
}
