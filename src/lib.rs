pub use crate::errors::{ErrorKind, ErrorReporting, GraftError, SourceContext};

pub mod context;
pub mod driver;
pub mod errors;
pub mod expanders;
pub mod harness;
pub mod registry;
pub mod syntax;
