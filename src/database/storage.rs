use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::record::{Record, RecordError};

/// Errors raised by a storage engine
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Commit failed: {0}")]
    CommitFailed(String),
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

/// One staged write
#[derive(Debug, Clone)]
pub enum Mutation {
    Insert { collection: String, record: Record },
    Update { collection: String, record: Record },
    Delete { collection: String, id: Uuid },
}

/// Writes applied together in one storage transaction
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    mutations: Vec<Mutation>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: impl Into<String>, record: Record) {
        self.mutations.push(Mutation::Insert { collection: collection.into(), record });
    }

    pub fn update(&mut self, collection: impl Into<String>, record: Record) {
        self.mutations.push(Mutation::Update { collection: collection.into(), record });
    }

    pub fn delete(&mut self, collection: impl Into<String>, id: Uuid) {
        self.mutations.push(Mutation::Delete { collection: collection.into(), id });
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Persistence engine consumed by the session
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load one row by id
    async fn load(&self, collection: &str, id: Uuid) -> Result<Option<Record>, StorageError>;

    /// Load every row of a collection
    async fn scan(&self, collection: &str) -> Result<Vec<Record>, StorageError>;

    /// Apply all mutations atomically; either every write lands or none does.
    /// Returns the number of rows written.
    async fn apply(&self, changes: ChangeSet) -> Result<usize, StorageError>;
}

type Collections = HashMap<String, BTreeMap<Uuid, Record>>;

/// In-memory storage engine. Commits are serialised by a write lock and a
/// change set is validated in full before any row is touched.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    collections: RwLock<Collections>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored in a collection, ignoring any ownership
    pub async fn row_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    fn check(collections: &Collections, mutations: &[Mutation]) -> Result<(), StorageError> {
        let mut inserted: HashSet<(&str, Uuid)> = HashSet::new();

        for mutation in mutations {
            match mutation {
                Mutation::Insert { collection, record } => {
                    let id = record.id().ok_or(RecordError::MissingId)?;
                    let exists = collections
                        .get(collection.as_str())
                        .map(|rows| rows.contains_key(&id))
                        .unwrap_or(false);
                    if exists || !inserted.insert((collection.as_str(), id)) {
                        return Err(StorageError::CommitFailed(format!(
                            "duplicate id '{}' in '{}'",
                            id, collection
                        )));
                    }
                }
                Mutation::Update { collection, record } => {
                    let id = record.id().ok_or(RecordError::MissingId)?;
                    let exists = collections
                        .get(collection.as_str())
                        .map(|rows| rows.contains_key(&id))
                        .unwrap_or(false);
                    if !exists && !inserted.contains(&(collection.as_str(), id)) {
                        return Err(StorageError::CommitFailed(format!(
                            "row '{}' in '{}' no longer exists",
                            id, collection
                        )));
                    }
                }
                Mutation::Delete { .. } => {}
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, collection: &str, id: Uuid) -> Result<Option<Record>, StorageError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|rows| rows.get(&id))
            .map(|record| Record::from_stored(record.clone().into_map())))
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Record>, StorageError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|rows| {
                rows.values()
                    .map(|record| Record::from_stored(record.clone().into_map()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn apply(&self, changes: ChangeSet) -> Result<usize, StorageError> {
        let mut collections = self.collections.write().await;
        Self::check(&collections, changes.mutations())?;

        let written = changes.len();
        for mutation in changes.into_mutations() {
            match mutation {
                Mutation::Insert { collection, record } => {
                    let id = record.id().ok_or(RecordError::MissingId)?;
                    collections.entry(collection).or_default().insert(id, record);
                }
                Mutation::Update { collection, mut record } => {
                    let id = record.id().ok_or(RecordError::MissingId)?;
                    let rows = collections.entry(collection).or_default();
                    if let Some(owner) = rows.get(&id).and_then(|existing| existing.owner_id()) {
                        record.set_owner_id(owner);
                    }
                    rows.insert(id, record);
                }
                Mutation::Delete { collection, id } => {
                    if let Some(rows) = collections.get_mut(&collection) {
                        rows.remove(&id);
                    }
                }
            }
        }

        tracing::debug!("Applied change set with {} mutation(s)", written);
        Ok(written)
    }
}
