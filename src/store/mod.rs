// src/store/mod.rs
pub mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgReferenceStore;

use crate::models::{EntityKind, ScopeKey, StoreRow};

/// Read-only access to canonical records.
///
/// Implementations return rows in a stable order; the matchers rely on it
/// for tie-breaking.
#[allow(async_fn_in_trait)]
pub trait ReferenceStore {
    /// Every record of one kind.
    async fn load_all(&self, kind: EntityKind) -> Result<Vec<StoreRow>, StoreError>;

    /// Records of one kind within a scope. Cities arrive already normalized.
    async fn load_scoped(
        &self,
        kind: EntityKind,
        scope: &ScopeKey,
    ) -> Result<Vec<StoreRow>, StoreError>;
}
