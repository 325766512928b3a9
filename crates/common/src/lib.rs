pub mod config;
pub mod error;
pub mod exchange;
pub mod types;

pub use config::Config;
pub use error::{ConfigurationError, Error, Result};
pub use exchange::ExecutionHost;
pub use types::*;
