use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::pipeline::error::{FieldError, ValidationErrors};
use crate::pipeline::traits::Request;

/// Input rules for one request type. Yields zero or more field failures.
pub trait Validator<R>: Send + Sync + 'static {
    fn validate(&self, request: &R) -> Vec<FieldError>;
}

/// Validators per request type, run in registration order
#[derive(Default)]
pub struct ValidatorRegistry {
    // Vec<Arc<dyn Validator<R>>> keyed by the request type
    validators: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R, V>(&mut self, validator: V)
    where
        R: Request,
        V: Validator<R>,
    {
        let validator: Arc<dyn Validator<R>> = Arc::new(validator);
        let entry = self
            .validators
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(Vec::<Arc<dyn Validator<R>>>::new()));

        if let Some(list) = entry.downcast_mut::<Vec<Arc<dyn Validator<R>>>>() {
            list.push(validator);
        }

        tracing::debug!("Registered validator for '{}'", R::NAME);
    }

    pub fn validators_for<R: Request>(&self) -> &[Arc<dyn Validator<R>>] {
        self.validators
            .get(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_ref::<Vec<Arc<dyn Validator<R>>>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Runs every validator registered for the request type before the handler
pub struct ValidationBehavior;

impl ValidationBehavior {
    pub fn run<R: Request>(registry: &ValidatorRegistry, request: &R) -> Result<(), DispatchError> {
        let validators = registry.validators_for::<R>();
        if validators.is_empty() {
            return Ok(());
        }

        let failures = validators.iter().flat_map(|v| v.validate(request));
        let errors = ValidationErrors::from_failures(failures);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Validation(errors))
        }
    }
}

/// Collects rule failures for one request
#[derive(Debug, Default)]
pub struct Rules {
    failures: Vec<FieldError>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure unless `ok` holds
    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.failures.push(FieldError::new(field, message));
        }
        self
    }

    pub fn not_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            field,
            !value.trim().is_empty(),
            format!("'{}' must not be empty.", field),
        )
    }

    /// The nil UUID counts as empty
    pub fn not_nil(&mut self, field: &str, value: Uuid) -> &mut Self {
        self.check(field, !value.is_nil(), format!("'{}' must not be empty.", field))
    }

    pub fn greater_than<T: PartialOrd + Display>(&mut self, field: &str, value: T, bound: T) -> &mut Self {
        let message = format!("'{}' must be greater than '{}'.", field, bound);
        self.check(field, value > bound, message)
    }

    pub fn greater_or_equal<T: PartialOrd + Display>(
        &mut self,
        field: &str,
        value: T,
        bound: T,
    ) -> &mut Self {
        let message = format!("'{}' must be greater than or equal to '{}'.", field, bound);
        self.check(field, value >= bound, message)
    }

    /// Apply `rule` only when the optional value is present
    pub fn when<T>(&mut self, value: Option<T>, rule: impl FnOnce(&mut Self, T)) -> &mut Self {
        if let Some(value) = value {
            rule(self, value);
        }
        self
    }

    pub fn finish(&mut self) -> Vec<FieldError> {
        std::mem::take(&mut self.failures)
    }
}
