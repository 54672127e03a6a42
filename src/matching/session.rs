// src/matching/session.rs
use std::time::Instant;

use super::error::MatchError;
use super::funding_source::FundingSourceMatcher;
use super::institution::InstitutionMatcher;
use super::investigator::InvestigatorMatcher;
use crate::config::MatchingConfig;
use crate::models::{CanonicalRecord, EntityKind, MatchQuery};
use crate::store::ReferenceStore;
use crate::utils::logging::LinkingLogger;

/// One matcher per entity kind, each with its own index, loaded together.
///
/// Meant for a single caller at a time; the institution matcher fills its
/// city cache as queries arrive.
pub struct MatchingSession<S> {
    store: S,
    pub institutions: InstitutionMatcher<S>,
    pub investigators: InvestigatorMatcher,
    pub funding_sources: FundingSourceMatcher,
}

impl<S: ReferenceStore + Clone> MatchingSession<S> {
    /// Loads every index. Any store failure aborts the whole session.
    pub async fn load(store: S, config: &MatchingConfig) -> Result<Self, MatchError> {
        let start = Instant::now();
        let institutions = InstitutionMatcher::load(store.clone(), config.institution_cutoff).await?;
        let investigators = InvestigatorMatcher::load(&store, config.investigator_cutoff).await?;
        let funding_sources = FundingSourceMatcher::load(&store).await?;

        LinkingLogger::new(EntityKind::Institution)
            .log_index_loaded(institutions.index().primary().len(), start.elapsed());
        LinkingLogger::new(EntityKind::Investigator)
            .log_index_loaded(investigators.index().investigators(), start.elapsed());
        LinkingLogger::new(EntityKind::FundingSource)
            .log_index_loaded(funding_sources.index().len(), start.elapsed());

        Ok(Self {
            store,
            institutions,
            investigators,
            funding_sources,
        })
    }

    /// Dispatches a query to the matcher for `kind`. A context of the wrong
    /// shape counts as absent.
    pub async fn resolve(&mut self, kind: EntityKind, query: &MatchQuery) -> Result<i64, MatchError> {
        match kind {
            EntityKind::Institution => {
                self.institutions
                    .find_match(&query.raw_name, query.city())
                    .await
            }
            EntityKind::Investigator => Ok(self
                .investigators
                .find_match(&query.raw_name, query.institution_id())),
            EntityKind::FundingSource => Ok(self.funding_sources.find_match(&query.raw_name)),
        }
    }

    pub fn refresh_investigators(&mut self, institution_id: i64, records: &[CanonicalRecord]) {
        self.investigators
            .refresh_investigators(institution_id, records);
    }

    /// Store-backed refresh of one institution's investigator roster.
    pub async fn reload_investigators(&mut self, institution_id: i64) -> Result<usize, MatchError> {
        self.investigators
            .reload_institution(&self.store, institution_id)
            .await
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
