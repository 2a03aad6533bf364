// Request execution pipeline: typed requests dispatched to one handler
// through validation, unit-of-work mode, handler and commit stages

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod traits;
pub mod unit_of_work;
pub mod validation;

// Re-export core types
pub use context::{RequestContext, StageTiming};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{FieldError, RegistryError, ValidationErrors};
pub use registry::HandlerRegistry;
pub use traits::{Command, Handler, Query, Request, Stage};
pub use unit_of_work::UnitOfWork;
pub use validation::{Rules, ValidationBehavior, Validator, ValidatorRegistry};
