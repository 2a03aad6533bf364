pub mod entity;
pub mod models;
pub mod record;
pub mod session;
pub mod storage;

pub use entity::{Entity, EntityScope};
pub use record::{Record, RecordError};
pub use session::{Session, SessionError, TrackingMode};
pub use storage::{ChangeSet, MemoryStorage, Mutation, Storage, StorageError};
