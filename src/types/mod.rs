//! Shared types

mod error;

pub use error::{MigrationError, Result};
