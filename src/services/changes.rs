use async_trait::async_trait;
use uuid::Uuid;

use crate::database::entity::Entity;
use crate::database::session::Session;
use crate::error::DispatchError;
use crate::types::Outcome;

/// How command fields are lowered into field changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    /// Patch: absent fields keep their stored value
    SkipIfAbsent,
    /// Update: every field is authoritative, including `None`
    Always,
}

/// A single field change
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Keep,
    Set(T),
}

impl<T> Field<T> {
    pub fn apply_to(self, target: &mut T) {
        if let Field::Set(value) = self {
            *target = value;
        }
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Field::Set(value) => Some(value),
            Field::Keep => None,
        }
    }
}

impl Overwrite {
    /// Lower a field the entity always has a value for. An absent value is
    /// kept under either strategy.
    pub fn required<T>(self, value: Option<T>) -> Field<T> {
        match value {
            Some(value) => Field::Set(value),
            None => Field::Keep,
        }
    }

    /// Lower a nullable field. Under `Always` an absent value clears it.
    pub fn nullable<T>(self, value: Option<T>) -> Field<Option<T>> {
        match (self, value) {
            (Overwrite::Always, value) => Field::Set(value),
            (Overwrite::SkipIfAbsent, Some(value)) => Field::Set(Some(value)),
            (Overwrite::SkipIfAbsent, None) => Field::Keep,
        }
    }
}

/// Field changes for one entity type, lowered from an Update or Patch command
#[async_trait]
pub trait Changeset<E: Entity>: Send + Sync {
    /// Guards run against the stored entity before anything is applied
    async fn check(&self, _current: &E, _session: &Session) -> Result<(), DispatchError> {
        Ok(())
    }

    fn apply(self, entity: &mut E);
}

/// Load the entity, run the changeset's guards, apply it and stage the write.
/// Returns `NotFound` when no entity with `id` is visible to the caller.
pub async fn apply_changes<E, C>(session: &mut Session, id: Uuid, changes: C) -> Result<Outcome, DispatchError>
where
    E: Entity,
    C: Changeset<E>,
{
    let Some(mut entity) = session.find::<E>(id).await? else {
        tracing::debug!("No '{}' with id {} to change", E::COLLECTION, id);
        return Ok(Outcome::NotFound);
    };

    changes.check(&entity, session).await?;
    changes.apply(&mut entity);
    session.update(&entity).await?;

    Ok(Outcome::Success)
}
