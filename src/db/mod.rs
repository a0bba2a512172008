//! Database layer
//!
//! MongoDB access plus the document schemas of the unified and legacy
//! project collections.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
