pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod io;
pub mod paths;
pub mod requirement;
pub mod spec;
pub mod syntax;
pub mod task;
pub mod trace;
pub mod types;
pub mod validate;

pub use error::{Result, SpecError};
