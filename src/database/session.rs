use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{OwnerId, TenantContext, TenantError};
use crate::database::entity::{Entity, EntityScope};
use crate::database::record::{Record, RecordError};
use crate::database::storage::{ChangeSet, Storage, StorageError};
use crate::types::Cancellation;

/// Whether the session stages writes for commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    Tracking,
    NoTracking,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Tenant(#[from] TenantError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("Cannot commit: session is in no-tracking mode")]
    NoTracking,
    #[error("{collection} '{id}' does not exist in this session")]
    NotVisible { collection: &'static str, id: Uuid },
    #[error("Request was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug)]
struct Entry {
    collection: &'static str,
    id: Uuid,
    scope: EntityScope,
    state: EntryState,
    record: Record,
}

/// Per-request view of storage.
///
/// Reads see the committed rows overlaid with this session's staged writes.
/// Every operation on a tenant-owned type is filtered by the owner resolved
/// from the tenant context, and inserted tenant-owned rows are stamped with
/// that owner at commit. Staged writes reach storage only through `commit`,
/// as one change set.
pub struct Session {
    storage: Arc<dyn Storage>,
    tenant: TenantContext,
    cancellation: Cancellation,
    mode: TrackingMode,
    entries: Vec<Entry>,
}

impl Session {
    pub fn new(storage: Arc<dyn Storage>, tenant: TenantContext, cancellation: Cancellation) -> Self {
        Self {
            storage,
            tenant,
            cancellation,
            mode: TrackingMode::Tracking,
            entries: Vec::new(),
        }
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn is_tracking(&self) -> bool {
        self.mode == TrackingMode::Tracking
    }

    pub fn set_tracking(&mut self, mode: TrackingMode) {
        self.mode = mode;
    }

    /// Switch to read-only mode; any later commit fails
    pub fn as_no_tracking(&mut self) {
        self.set_tracking(TrackingMode::NoTracking);
    }

    pub fn has_changes(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Number of staged writes
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Drop every staged write
    pub fn discard(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!("Discarding {} staged write(s)", self.entries.len());
        }
        self.entries.clear();
    }

    // ========================================
    // Reads
    // ========================================

    /// Load one entity by id; `None` when absent or owned by someone else
    pub async fn find<E: Entity>(&self, id: Uuid) -> Result<Option<E>, SessionError> {
        match self.lookup::<E>(id).await? {
            Some(record) => Ok(Some(record.to_entity()?)),
            None => Ok(None),
        }
    }

    /// Every visible entity of a type matching `predicate`
    pub async fn query<E, F>(&self, predicate: F) -> Result<Vec<E>, SessionError>
    where
        E: Entity,
        F: Fn(&E) -> bool + Send,
    {
        let records = self.visible_records::<E>().await?;
        let mut entities = Vec::with_capacity(records.len());
        for record in records {
            let entity: E = record.to_entity()?;
            if predicate(&entity) {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// Every visible entity of a type
    pub async fn list<E: Entity>(&self) -> Result<Vec<E>, SessionError> {
        self.query(|_: &E| true).await
    }

    pub async fn any<E, F>(&self, predicate: F) -> Result<bool, SessionError>
    where
        E: Entity,
        F: Fn(&E) -> bool + Send,
    {
        Ok(!self.query(predicate).await?.is_empty())
    }

    pub async fn count<E, F>(&self, predicate: F) -> Result<usize, SessionError>
    where
        E: Entity,
        F: Fn(&E) -> bool + Send,
    {
        Ok(self.query(predicate).await?.len())
    }

    // ========================================
    // Writes
    // ========================================

    /// Stage a new entity for insert
    pub fn add<E: Entity>(&mut self, entity: &E) -> Result<(), SessionError> {
        self.check_cancelled()?;
        self.owner_scope::<E>()?;

        let record = Record::from_entity(entity)?;
        tracing::debug!("Staging insert into '{}' ({})", E::COLLECTION, entity.id());
        self.entries.push(Entry {
            collection: E::COLLECTION,
            id: entity.id(),
            scope: E::SCOPE,
            state: EntryState::Added,
            record,
        });
        Ok(())
    }

    /// Stage an overwrite of an existing, visible entity
    pub async fn update<E: Entity>(&mut self, entity: &E) -> Result<(), SessionError> {
        let id = entity.id();
        let mut current = self
            .lookup::<E>(id)
            .await?
            .ok_or(SessionError::NotVisible { collection: E::COLLECTION, id })?;

        current.overwrite_from(Record::from_entity(entity)?);

        match self.entry_mut(E::COLLECTION, id) {
            Some(entry) => entry.record = current,
            None => {
                tracing::debug!(
                    "Staging update of '{}' ({}) fields: {:?}",
                    E::COLLECTION,
                    id,
                    current.changed_fields()
                );
                self.entries.push(Entry {
                    collection: E::COLLECTION,
                    id,
                    scope: E::SCOPE,
                    state: EntryState::Modified,
                    record: current,
                });
            }
        }
        Ok(())
    }

    /// Stage removal of a visible entity. Returns false when nothing visible
    /// carries the id.
    pub async fn remove<E: Entity>(&mut self, id: Uuid) -> Result<bool, SessionError> {
        if self.lookup::<E>(id).await?.is_none() {
            return Ok(false);
        }

        let staged = self
            .entries
            .iter()
            .position(|e| e.collection == E::COLLECTION && e.id == id);

        match staged {
            Some(index) if self.entries[index].state == EntryState::Added => {
                self.entries.remove(index);
            }
            Some(index) => {
                self.entries[index].state = EntryState::Deleted;
            }
            None => {
                tracing::debug!("Staging delete from '{}' ({})", E::COLLECTION, id);
                self.entries.push(Entry {
                    collection: E::COLLECTION,
                    id,
                    scope: E::SCOPE,
                    state: EntryState::Deleted,
                    record: Record::new(),
                });
            }
        }
        Ok(true)
    }

    /// Apply every staged write to storage in one change set.
    ///
    /// Fails fast in no-tracking mode and when the request was cancelled.
    /// Staged writes are consumed whether or not storage accepts them.
    pub async fn commit(&mut self) -> Result<usize, SessionError> {
        if !self.is_tracking() {
            return Err(SessionError::NoTracking);
        }
        self.check_cancelled()?;

        if self.entries.is_empty() {
            return Ok(0);
        }

        let entries = std::mem::take(&mut self.entries);
        let mut changes = ChangeSet::new();
        for entry in entries {
            match entry.state {
                EntryState::Added => {
                    let mut record = entry.record;
                    if entry.scope.is_tenant_owned() {
                        record.set_owner_id(self.tenant.resolve_owner_id()?);
                    }
                    changes.insert(entry.collection, record);
                }
                EntryState::Modified => changes.update(entry.collection, entry.record),
                EntryState::Deleted => changes.delete(entry.collection, entry.id),
            }
        }

        let written = self.storage.apply(changes).await?;
        tracing::debug!("Committed {} write(s)", written);
        Ok(written)
    }

    // ========================================
    // Internals
    // ========================================

    fn check_cancelled(&self) -> Result<(), SessionError> {
        if self.cancellation.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }

    /// Owner every row of `E` must carry, or `None` for unscoped types.
    /// Fails closed when a tenant-owned type is touched without an owner.
    fn owner_scope<E: Entity>(&self) -> Result<Option<OwnerId>, SessionError> {
        match E::SCOPE {
            EntityScope::TenantOwned => Ok(Some(self.tenant.resolve_owner_id()?)),
            EntityScope::Shared | EntityScope::Identity => Ok(None),
        }
    }

    fn entry(&self, collection: &str, id: Uuid) -> Option<&Entry> {
        self.entries.iter().find(|e| e.collection == collection && e.id == id)
    }

    fn entry_mut(&mut self, collection: &str, id: Uuid) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.collection == collection && e.id == id)
    }

    fn is_visible(record: &Record, state: Option<EntryState>, owner: Option<OwnerId>) -> bool {
        match (owner, state) {
            (None, _) => true,
            // Rows added in this session are stamped with the session owner at commit
            (Some(_), Some(EntryState::Added)) => true,
            (Some(owner), _) => record.owner_id() == Some(owner),
        }
    }

    async fn lookup<E: Entity>(&self, id: Uuid) -> Result<Option<Record>, SessionError> {
        self.check_cancelled()?;
        let owner = self.owner_scope::<E>()?;

        if let Some(entry) = self.entry(E::COLLECTION, id) {
            return Ok(match entry.state {
                EntryState::Deleted => None,
                state => Some(entry.record.clone())
                    .filter(|r| Self::is_visible(r, Some(state), owner)),
            });
        }

        let record = self.storage.load(E::COLLECTION, id).await?;
        Ok(record.filter(|r| Self::is_visible(r, None, owner)))
    }

    async fn visible_records<E: Entity>(&self) -> Result<Vec<Record>, SessionError> {
        self.check_cancelled()?;
        let owner = self.owner_scope::<E>()?;

        let mut records = Vec::new();
        for record in self.storage.scan(E::COLLECTION).await? {
            let Some(id) = record.id() else { continue };
            match self.entry(E::COLLECTION, id) {
                Some(entry) if entry.state == EntryState::Deleted => {}
                Some(entry) => records.push(entry.record.clone()),
                None => {
                    if Self::is_visible(&record, None, owner) {
                        records.push(record);
                    }
                }
            }
        }

        records.extend(
            self.entries
                .iter()
                .filter(|e| e.collection == E::COLLECTION && e.state == EntryState::Added)
                .map(|e| e.record.clone()),
        );

        Ok(records)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("pending", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::database::storage::MemoryStorage;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Diary {
        id: Uuid,
        text: String,
    }

    impl Entity for Diary {
        const COLLECTION: &'static str = "diaries";
        const SCOPE: EntityScope = EntityScope::TenantOwned;

        fn id(&self) -> Uuid {
            self.id
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Login {
        id: Uuid,
        email: String,
    }

    impl Entity for Login {
        const COLLECTION: &'static str = "logins";
        const SCOPE: EntityScope = EntityScope::Identity;

        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn tenant(user: Uuid) -> TenantContext {
        TenantContext::with_owner_claim(
            Some(Principal::authenticated("user").with_claim("sub", user.to_string())),
            "sub",
        )
    }

    fn session(storage: &Arc<MemoryStorage>, tenant: TenantContext) -> Session {
        Session::new(storage.clone(), tenant, Cancellation::none())
    }

    #[tokio::test]
    async fn test_owner_filter_isolates_rows() {
        let storage = Arc::new(MemoryStorage::new());
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let entry = Diary { id: Uuid::new_v4(), text: "secret".to_string() };

        let mut writer = session(&storage, tenant(alice));
        writer.add(&entry).unwrap();
        writer.commit().await.unwrap();

        let reader = session(&storage, tenant(bob));
        assert!(reader.find::<Diary>(entry.id).await.unwrap().is_none());
        assert!(reader.list::<Diary>().await.unwrap().is_empty());

        let owner = session(&storage, tenant(alice));
        assert_eq!(owner.find::<Diary>(entry.id).await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn test_tenant_owned_access_fails_closed() {
        let storage = Arc::new(MemoryStorage::new());
        let anonymous = session(&storage, TenantContext::with_owner_claim(None, "sub"));

        assert!(matches!(
            anonymous.list::<Diary>().await,
            Err(SessionError::Tenant(TenantError::AccessDenied))
        ));
    }

    #[tokio::test]
    async fn test_identity_types_bypass_owner_filter() {
        let storage = Arc::new(MemoryStorage::new());
        let mut anonymous = session(&storage, TenantContext::with_owner_claim(None, "sub"));
        let login = Login { id: Uuid::new_v4(), email: "a@b.c".to_string() };

        anonymous.add(&login).unwrap();
        anonymous.commit().await.unwrap();

        let other = session(&storage, tenant(Uuid::new_v4()));
        assert_eq!(other.find::<Login>(login.id).await.unwrap(), Some(login));
    }

    #[tokio::test]
    async fn test_no_tracking_commit_fails_fast() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = session(&storage, tenant(Uuid::new_v4()));
        session.as_no_tracking();

        assert!(matches!(session.commit().await, Err(SessionError::NoTracking)));
    }

    #[tokio::test]
    async fn test_update_of_foreign_row_is_not_visible() {
        let storage = Arc::new(MemoryStorage::new());
        let entry = Diary { id: Uuid::new_v4(), text: "mine".to_string() };

        let mut writer = session(&storage, tenant(Uuid::new_v4()));
        writer.add(&entry).unwrap();
        writer.commit().await.unwrap();

        let mut intruder = session(&storage, tenant(Uuid::new_v4()));
        let result = intruder.update(&Diary { text: "theirs".to_string(), ..entry.clone() }).await;
        assert!(matches!(result, Err(SessionError::NotVisible { .. })));
        assert!(!intruder.remove::<Diary>(entry.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_staged_writes_are_visible_before_commit() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = session(&storage, tenant(Uuid::new_v4()));
        let entry = Diary { id: Uuid::new_v4(), text: "draft".to_string() };

        session.add(&entry).unwrap();
        assert_eq!(session.count(|d: &Diary| d.text == "draft").await.unwrap(), 1);

        assert!(session.remove::<Diary>(entry.id).await.unwrap());
        assert!(!session.has_changes());
        assert_eq!(storage.row_count("diaries").await, 0);
    }

    #[tokio::test]
    async fn test_cancelled_session_rejects_calls() {
        let storage = Arc::new(MemoryStorage::new());
        let (handle, signal) = Cancellation::new();
        let mut session = Session::new(storage.clone(), tenant(Uuid::new_v4()), signal);

        session.add(&Diary { id: Uuid::new_v4(), text: "late".to_string() }).unwrap();
        handle.cancel();

        assert!(matches!(session.commit().await, Err(SessionError::Cancelled)));
        assert_eq!(storage.row_count("diaries").await, 0);
    }
}
