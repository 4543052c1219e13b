//! GapFinder Core — data model, configuration, error types.

pub mod config;
pub mod error;
pub mod types;

pub use config::GapFinderConfig;
pub use error::{Error, Result};
pub use types::*;
