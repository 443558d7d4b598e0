//! smellscale-state — persistence for the singleton `ScaleState`.
//!
//! # Architecture
//!
//! ```text
//! ScaleStore (process-wide lock, load / save / update, legacy migration)
//!   └── dyn BlobStore
//!       ├── RedbStore      (default; one JSON blob in a redb table)
//!       └── JsonFileStore  (flat scaleData.json, temp-file + rename writes)
//! ```
//!
//! `ScaleStore` is `Clone` + `Send` + `Sync` and is shared between the HTTP
//! handlers and the schedule driver. Every read-modify-write goes through
//! [`ScaleStore::update`], which holds the lock across load and save.

pub mod backend;
pub mod error;
pub mod file_store;
pub mod redb_store;
pub mod store;
pub mod tables;

pub use backend::BlobStore;
pub use error::{StateError, StateResult};
pub use file_store::JsonFileStore;
pub use redb_store::RedbStore;
pub use store::ScaleStore;
