// src/matching/funding_source.rs
use log::info;

use super::error::MatchError;
use super::index::{load_records, NameIndex};
use super::normalize::normalize;
use crate::models::{EntityKind, NO_MATCH};
use crate::store::ReferenceStore;

/// Exact-only matcher for funding agencies. Agency names come from a small,
/// stable vocabulary, so there is no fuzzy stage.
pub struct FundingSourceMatcher {
    index: NameIndex,
}

impl FundingSourceMatcher {
    pub async fn load<S: ReferenceStore>(store: &S) -> Result<Self, MatchError> {
        let records = load_records(store, EntityKind::FundingSource).await?;
        let index = NameIndex::from_records(&records);
        info!("[FUNDING_SOURCE] Indexed {} agency names", index.len());
        Ok(Self { index })
    }

    pub fn find_match(&self, name: &str) -> i64 {
        self.index.get(&normalize(name)).unwrap_or(NO_MATCH)
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }
}
