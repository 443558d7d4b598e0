//! redb table definitions for the Smell Scale state store.

use redb::TableDefinition;

/// JSON blobs keyed by name. The live state sits under [`CURRENT_KEY`];
/// unreadable blobs are set aside under `corrupt:{rfc3339}`.
pub const SCALE_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("scale_state");

/// Key of the live `ScaleState` blob.
pub const CURRENT_KEY: &str = "current";

/// Key prefix for blobs that failed to deserialize.
pub const CORRUPT_PREFIX: &str = "corrupt:";
