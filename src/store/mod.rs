//! Local persistence module.
//!
//! This module provides the versioned [`LocalStore`] that mirrors server
//! resources on disk. Records live as JSON documents under named partition
//! directories; the schema version and its additive migration steps are
//! defined in [`schema`].

pub mod local;
pub mod schema;

pub use local::LocalStore;
pub use schema::{Partition, StoreIndex, SCHEMA_VERSION};
