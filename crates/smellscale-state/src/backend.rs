//! The persistence seam behind `ScaleStore`.

use crate::error::StateResult;

/// A single-slot blob store.
///
/// Implementations only move bytes; encoding, defaults and locking live in
/// `ScaleStore`.
pub trait BlobStore: Send + Sync {
    /// Read the current blob, `None` if nothing has been written yet.
    fn read_blob(&self) -> StateResult<Option<Vec<u8>>>;

    /// Replace the current blob. Readers see either the old or the new blob.
    fn write_blob(&self, bytes: &[u8]) -> StateResult<()>;

    /// Keep a copy of a blob that could not be decoded so it can be
    /// inspected later. The live slot is left untouched.
    fn stash_corrupt(&self, bytes: &[u8]) -> StateResult<()>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}
