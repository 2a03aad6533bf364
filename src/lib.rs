pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod pipeline;
pub mod services;
pub mod testing;
pub mod types;

pub use error::DispatchError;
pub use pipeline::{Dispatcher, DispatcherBuilder, RequestContext};
