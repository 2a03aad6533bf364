// handlers/mod.rs - request handlers grouped by feature area
//
// Each feature module declares its request types, their validators and one
// handler per request, and exposes a `register` function that wires them into
// a DispatcherBuilder. Registration happens once at startup.
//
// src/handlers/
// ├── bookstore/      ← shared catalog (authors, categories, books, products)
// └── time_tracking/  ← tenant-owned projects and work tasks

pub mod bookstore;
pub mod time_tracking;

use std::sync::Arc;

use crate::database::Storage;
use crate::pipeline::{Dispatcher, DispatcherBuilder, RegistryError};

/// Register every handler and validator of the application
pub fn register_all(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    bookstore::register(builder)?;
    time_tracking::register(builder)?;
    Ok(())
}

/// Dispatcher with the full application registered over `storage`
pub fn dispatcher(storage: Arc<dyn Storage>) -> Result<Dispatcher, RegistryError> {
    let mut builder = Dispatcher::builder();
    register_all(&mut builder)?;

    Ok(builder.build(storage))
}
