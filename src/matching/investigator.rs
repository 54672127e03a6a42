// src/matching/investigator.rs
use log::{debug, info};

use super::abbreviation::match_abbreviation;
use super::error::MatchError;
use super::index::{load_records, load_scoped_records, InvestigatorIndex};
use super::normalize::normalize;
use super::similarity::closest_within;
use crate::models::{CanonicalRecord, EntityKind, ScopeKey, NO_MATCH};
use crate::store::ReferenceStore;

/// Resolves investigator names within the roster of their institution.
pub struct InvestigatorMatcher {
    index: InvestigatorIndex,
    cutoff: f64,
}

impl InvestigatorMatcher {
    pub async fn load<S: ReferenceStore>(store: &S, cutoff: f64) -> Result<Self, MatchError> {
        let records = load_records(store, EntityKind::Investigator).await?;
        let index = InvestigatorIndex::from_records(&records);
        info!(
            "[INVESTIGATOR] Indexed {} investigators across {} institutions",
            index.investigators(),
            index.institutions()
        );
        Ok(Self { index, cutoff })
    }

    /// Returns the canonical id for `name` at `institution_id`, or `NO_MATCH`.
    ///
    /// Never looks outside the given institution. Order: exact name,
    /// abbreviation, then the closest name within the cutoff.
    pub fn find_match(&self, name: &str, institution_id: i64) -> i64 {
        let roster = match self.index.roster(institution_id) {
            Some(roster) => roster,
            None => return NO_MATCH,
        };
        let name = normalize(name);
        if name.is_empty() {
            return NO_MATCH;
        }
        if let Some(id) = roster.get(&name) {
            return id;
        }
        let id = match_abbreviation(&name, roster.candidates());
        if id != NO_MATCH {
            debug!("[INVESTIGATOR] abbreviation hit '{}' -> {}", name, id);
            return id;
        }
        let id = closest_within(&name, roster.candidates(), self.cutoff);
        if id != NO_MATCH {
            debug!("[INVESTIGATOR] fuzzy hit '{}' at {} -> {}", name, institution_id, id);
        }
        id
    }

    /// Replaces the roster of `institution_id` with `records`.
    ///
    /// Call after persisting a new investigator so later occurrences of the
    /// same person resolve to the new id.
    pub fn refresh_investigators(&mut self, institution_id: i64, records: &[CanonicalRecord]) {
        self.index.replace(institution_id, records);
        debug!(
            "[INVESTIGATOR] Refreshed roster of institution {} ({} investigators)",
            institution_id,
            records.len()
        );
    }

    /// Re-reads one institution's investigators from the store and replaces
    /// its roster. Returns the new roster size.
    pub async fn reload_institution<S: ReferenceStore>(
        &mut self,
        store: &S,
        institution_id: i64,
    ) -> Result<usize, MatchError> {
        let scope = ScopeKey::Institution(institution_id);
        let records = load_scoped_records(store, EntityKind::Investigator, &scope).await?;
        self.refresh_investigators(institution_id, &records);
        Ok(records.len())
    }

    pub fn index(&self) -> &InvestigatorIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_INVESTIGATOR_CUTOFF;
    use crate::matching::index::validate_rows;
    use crate::models::StoreRow;
    use crate::store::memory::{MemoryStore, Snapshot};

    fn at(institution_id: i64) -> Option<ScopeKey> {
        Some(ScopeKey::Institution(institution_id))
    }

    fn store() -> MemoryStore {
        MemoryStore::new(Snapshot {
            investigators: vec![
                StoreRow::new(1, "J Smith", at(14)),
                StoreRow::new(2, "Li Kim", at(14)),
                StoreRow::new(3, "Maria Gonzalez", at(14)),
                StoreRow::new(4, "Anna Berg", at(20)),
                StoreRow::new(5, "Anna Borg", at(20)),
                StoreRow::new(6, "Peter Olsen", at(20)),
            ],
            ..Default::default()
        })
    }

    async fn matcher(store: &MemoryStore) -> InvestigatorMatcher {
        InvestigatorMatcher::load(store, DEFAULT_INVESTIGATOR_CUTOFF)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_exact_round_trip_for_every_record() {
        let store = store();
        let m = matcher(&store).await;
        let rows = store.load_all(EntityKind::Investigator).await.unwrap();
        for row in rows {
            let Some(ScopeKey::Institution(institution_id)) = row.scope else {
                panic!("unscoped fixture row");
            };
            assert_eq!(m.find_match(row.name.as_deref().unwrap(), institution_id), row.id);
        }
    }

    #[tokio::test]
    async fn test_unknown_institution_never_falls_through() {
        let m = matcher(&store()).await;
        assert_eq!(m.find_match("J Smith", 99), NO_MATCH);
        assert_eq!(m.find_match("J Smith", 20), NO_MATCH);
        assert_eq!(m.find_match("J Smith", 14), 1);
    }

    #[tokio::test]
    async fn test_normalized_exact_hit() {
        let m = matcher(&store()).await;
        assert_eq!(m.find_match("  j. smith ", 14), 1);
    }

    #[tokio::test]
    async fn test_abbreviation_stage() {
        let m = matcher(&store()).await;
        // "li kim" with its first three characters dropped is "kim".
        // Fuzzy alone would reject it: 3 edits over 6 characters.
        assert_eq!(m.find_match("Kim", 14), 2);
    }

    #[tokio::test]
    async fn test_fuzzy_stage_within_cutoff() {
        let m = matcher(&store()).await;
        assert_eq!(m.find_match("Maria Gonzales", 14), 3);
        assert_eq!(m.find_match("Peter Olson", 20), 6);
        assert_eq!(m.find_match("Someone Else", 14), NO_MATCH);
    }

    #[tokio::test]
    async fn test_fuzzy_cutoff_is_inclusive() {
        let store = MemoryStore::new(Snapshot {
            investigators: vec![StoreRow::new(8, "abcde", at(3))],
            ..Default::default()
        });
        let m = matcher(&store).await;
        // 2 edits over 5 characters: exactly 0.4.
        assert_eq!(m.find_match("abcxy", 3), 8);
        // 3 edits over 5 characters.
        assert_eq!(m.find_match("abxyz", 3), NO_MATCH);
    }

    #[tokio::test]
    async fn test_fuzzy_tie_keeps_first_candidate() {
        let m = matcher(&store()).await;
        // "anna bxrg" is one substitution from both "anna berg" and "anna borg".
        assert_eq!(m.find_match("Anna Bxrg", 20), 4);
    }

    #[tokio::test]
    async fn test_refresh_replaces_roster() {
        let store = store();
        let mut m = matcher(&store).await;
        assert_eq!(m.find_match("Kwame Mensah", 14), NO_MATCH);

        let records = validate_rows(
            EntityKind::Investigator,
            vec![StoreRow::new(77, "Kwame Mensah", at(14))],
        );
        m.refresh_investigators(14, &records);
        assert_eq!(m.find_match("Kwame Mensah", 14), 77);
        // Wholesale replacement: the old roster is gone.
        assert_eq!(m.find_match("J Smith", 14), NO_MATCH);
        // Other institutions are untouched.
        assert_eq!(m.find_match("Peter Olsen", 20), 6);
    }

    #[tokio::test]
    async fn test_refresh_creates_roster_for_new_institution() {
        let store = store();
        let mut m = matcher(&store).await;
        let new_id = store.insert_investigator("Ada Obi", 99).unwrap();
        assert_eq!(m.find_match("Ada Obi", 99), NO_MATCH);
        assert_eq!(m.reload_institution(&store, 99).await.unwrap(), 1);
        assert_eq!(m.find_match("Ada Obi", 99), new_id);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_existing_roster() {
        let store = store();
        let mut m = matcher(&store).await;
        store.set_unavailable(true);
        assert!(m.reload_institution(&store, 14).await.is_err());
        assert_eq!(m.find_match("J Smith", 14), 1);
    }
}
