// src/matching/error.rs
use thiserror::Error;

use crate::models::EntityKind;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum MatchError {
    /// The reference store could not be read. The affected index is unusable.
    #[error("reference store unavailable while loading {kind} records: {source}")]
    StoreUnavailable {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },

    /// A loaded row is missing a required field. Skipped during loading.
    #[error("malformed {kind} record {id}: {reason}")]
    MalformedRecord {
        kind: EntityKind,
        id: i64,
        reason: &'static str,
    },
}

impl MatchError {
    pub fn store_unavailable(kind: EntityKind, source: StoreError) -> Self {
        MatchError::StoreUnavailable { kind, source }
    }
}
