use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// How rows of an entity type are partitioned between principals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityScope {
    /// Catalog data visible to every caller
    Shared,
    /// Rows belong to one owner; every read is filtered and every insert is stamped
    TenantOwned,
    /// Identity-store types used while authenticating; never owner filtered
    Identity,
}

impl EntityScope {
    pub fn is_tenant_owned(&self) -> bool {
        matches!(self, EntityScope::TenantOwned)
    }
}

/// A persisted object with a stable id assigned at creation
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Storage collection holding rows of this type
    const COLLECTION: &'static str;

    const SCOPE: EntityScope = EntityScope::Shared;

    fn id(&self) -> Uuid;
}
