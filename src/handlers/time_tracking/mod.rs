// Personal time tracking. Projects and work tasks are tenant-owned: every
// read is filtered to the caller and anonymous callers are refused.

pub mod projects;
pub mod work_tasks;

pub use projects::*;
pub use work_tasks::*;

use crate::pipeline::{DispatcherBuilder, RegistryError};

pub fn register(builder: &mut DispatcherBuilder) -> Result<(), RegistryError> {
    projects::register(builder)?;
    work_tasks::register(builder)?;
    Ok(())
}
