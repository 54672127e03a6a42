// src/linking/linker.rs
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::cleanup::{
    city_from_address, clean_institution_name, fix_capitalization, parse_project_date,
    split_investigators,
};
use super::writer::ProjectWriter;
use crate::matching::{MatchError, MatchingSession};
use crate::models::{EntityKind, InstitutionRef, InvestigatorRef, Project, NO_MATCH};
use crate::store::ReferenceStore;
use crate::utils::logging::{KindStats, LinkingLogger};

/// Institution text as found on a result page: one or more candidate lines
/// (a bare name, or the lines of an address) and an optional city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionMention {
    pub lines: Vec<String>,
    pub city: Option<String>,
}

impl InstitutionMention {
    /// The given city, or one recovered from the last address line.
    pub fn city(&self) -> String {
        self.city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| city_from_address(&self.lines))
            .unwrap_or_default()
    }
}

/// A project as handed over by the extraction side, names still free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedProject {
    pub project_number: String,
    pub title: String,
    pub source_url: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub more_info: Option<String>,
    pub objective: Option<String>,
    pub accession_number: Option<String>,
    pub project_type: Option<String>,
    pub institution: Option<InstitutionMention>,
    /// Names, each entry possibly a semicolon separated list.
    pub investigators: Vec<String>,
    pub funding_source: Option<String>,
}

/// Result of handing a linked project to a writer.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    Duplicate,
    Inserted {
        project_id: i64,
        investigator_ids: Vec<i64>,
        new_investigator_ids: Vec<i64>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkStats {
    pub projects: usize,
    pub duplicates: usize,
    pub new_investigators: usize,
    pub institutions: KindStats,
    pub investigators: KindStats,
    pub funding_sources: KindStats,
}

/// Resolves extracted projects against the reference indices and keeps the
/// investigator rosters current as new investigators are written.
pub struct ProjectLinker<S> {
    session: MatchingSession<S>,
    stats: LinkStats,
}

impl<S: ReferenceStore + Clone> ProjectLinker<S> {
    pub fn new(session: MatchingSession<S>) -> Self {
        Self {
            session,
            stats: LinkStats::default(),
        }
    }

    /// Builds a typed project, attaching matched entities as references and
    /// unmatched ones as comments.
    pub async fn link(&mut self, extracted: &ExtractedProject) -> Result<Project, MatchError> {
        let mut project = Project::new(extracted.project_number.trim(), extracted.title.trim());
        project.source_url = extracted.source_url.clone();
        project.start_date = extracted.start_date.as_deref().and_then(parse_project_date);
        project.end_date = extracted.end_date.as_deref().and_then(parse_project_date);
        project.more_info = extracted.more_info.clone();
        project.objective = extracted.objective.clone();
        project.accession_number = extracted.accession_number.clone();
        project.project_type = extracted.project_type.clone();
        self.stats.projects += 1;

        let institution = match &extracted.institution {
            Some(mention) => self.link_institution(&mut project, mention).await?,
            None => None,
        };

        let names: Vec<String> = extracted
            .investigators
            .iter()
            .flat_map(|entry| split_investigators(entry))
            .map(|name| fix_capitalization(&name))
            .collect();
        match institution {
            Some(institution_id) => {
                for name in names {
                    let id = self.session.investigators.find_match(&name, institution_id);
                    self.stats.investigators.record(id);
                    project.add_investigator(InvestigatorRef { id, name, institution_id });
                }
            }
            // Investigators are only resolved within a matched institution.
            None if !names.is_empty() => {
                project.add_comment(&format!("Investigators:\n{}", names.join("\n")));
            }
            None => {}
        }

        if let Some(raw) = extracted.funding_source.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let name = fix_capitalization(raw);
            let id = self.session.funding_sources.find_match(&name);
            self.stats.funding_sources.record(id);
            if id != NO_MATCH {
                project.funding_source_id = Some(id);
            } else {
                project.add_comment(&format!("Funding Source:\n{}", name));
            }
        }

        Ok(project)
    }

    async fn link_institution(
        &mut self,
        project: &mut Project,
        mention: &InstitutionMention,
    ) -> Result<Option<i64>, MatchError> {
        let city = mention.city();
        for line in &mention.lines {
            let name = clean_institution_name(line);
            if name.is_empty() {
                continue;
            }
            let id = self.session.institutions.find_match(&name, &city).await?;
            if id != NO_MATCH {
                self.stats.institutions.record(id);
                project.add_institution(InstitutionRef { id, name });
                return Ok(Some(id));
            }
        }
        self.stats.institutions.record(NO_MATCH);
        let text: Vec<String> = mention
            .lines
            .iter()
            .map(|line| fix_capitalization(line.trim()))
            .filter(|line| !line.is_empty())
            .collect();
        if !text.is_empty() {
            project.add_comment(&format!("Institution:\n{}", text.join("\n")));
        }
        Ok(None)
    }

    /// Writes a linked project. New investigators are inserted first and the
    /// roster of their institution is reloaded right away, so a person who
    /// appears again (in this project or a later one) reuses the new id.
    ///
    /// The writes are not atomic: investigator rows and links are separate
    /// statements from the project insert. If the project insert fails, the
    /// new investigators stay in the store and in the roster, and a retry
    /// links to them instead of inserting them again.
    pub async fn persist<W: ProjectWriter>(&mut self, writer: &W, project: &Project) -> Result<PersistOutcome> {
        if writer
            .is_duplicate(project)
            .await
            .with_context(|| format!("Failed duplicate check for project {}", project.project_number))?
        {
            debug!("Skipping duplicate project {} '{}'", project.project_number, project.title);
            self.stats.duplicates += 1;
            return Ok(PersistOutcome::Duplicate);
        }

        let mut investigator_ids = Vec::with_capacity(project.investigators().len());
        let mut new_investigator_ids = Vec::new();
        for investigator in project.investigators() {
            let mut id = investigator.id;
            if id == NO_MATCH {
                // An earlier insert in this loop may already cover this name.
                id = self
                    .session
                    .investigators
                    .find_match(&investigator.name, investigator.institution_id);
            }
            if id == NO_MATCH {
                id = writer
                    .insert_investigator(&investigator.name, investigator.institution_id)
                    .await
                    .with_context(|| format!("Failed to insert investigator '{}'", investigator.name))?;
                self.session
                    .reload_investigators(investigator.institution_id)
                    .await
                    .context("Failed to refresh investigator roster")?;
                new_investigator_ids.push(id);
                self.stats.new_investigators += 1;
            }
            investigator_ids.push(id);
        }

        let project_id = writer
            .insert_project(project)
            .await
            .with_context(|| format!("Failed to insert project {}", project.project_number))?;
        let mut linked = HashSet::new();
        for &investigator_id in &investigator_ids {
            if linked.insert(investigator_id) {
                writer
                    .link_investigator(project_id, investigator_id)
                    .await
                    .context("Failed to link investigator to project")?;
            }
        }

        Ok(PersistOutcome::Inserted {
            project_id,
            investigator_ids,
            new_investigator_ids,
        })
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn session(&self) -> &MatchingSession<S> {
        &self.session
    }

    pub fn log_summary(&self) {
        info!(
            "Linked {} projects ({} duplicates skipped, {} new investigators)",
            self.stats.projects, self.stats.duplicates, self.stats.new_investigators
        );
        LinkingLogger::new(EntityKind::Institution).log_match_stats(&self.stats.institutions);
        LinkingLogger::new(EntityKind::Investigator).log_match_stats(&self.stats.investigators);
        LinkingLogger::new(EntityKind::FundingSource).log_match_stats(&self.stats.funding_sources);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingConfig;
    use crate::models::{ScopeKey, StoreRow};
    use crate::store::memory::{MemoryStore, Snapshot};
    use crate::store::StoreError;

    fn store() -> MemoryStore {
        MemoryStore::new(Snapshot {
            institutions: vec![
                StoreRow::new(7, "Texas A&M University", Some(ScopeKey::City("College Station".into()))),
                StoreRow::new(30, "Cornell University", Some(ScopeKey::City("Ithaca".into()))),
            ],
            investigators: vec![
                StoreRow::new(1, "Smith, John", Some(ScopeKey::Institution(30))),
                StoreRow::new(2, "Smith, John", Some(ScopeKey::Institution(7))),
            ],
            funding_sources: vec![StoreRow::new(3, "National Institutes of Health", None)],
            ..Default::default()
        })
    }

    async fn linker(store: &MemoryStore) -> ProjectLinker<MemoryStore> {
        let session = MatchingSession::load(store.clone(), &MatchingConfig::default())
            .await
            .unwrap();
        ProjectLinker::new(session)
    }

    fn cris_project(number: &str, investigators: &str) -> ExtractedProject {
        ExtractedProject {
            project_number: number.to_string(),
            title: "Salmonella on sprouts".to_string(),
            start_date: Some("2019-09-01".to_string()),
            institution: Some(InstitutionMention {
                lines: vec![
                    "Dept of Food Science".to_string(),
                    "CORNEL UNIVERSITY".to_string(),
                    "Ithaca, NY 14853".to_string(),
                ],
                city: None,
            }),
            investigators: vec![investigators.to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_link_resolves_institution_from_address_lines() {
        let store = store();
        let mut linker = linker(&store).await;
        let project = linker
            .link(&cris_project("NYC-1", "SMITH, JOHN, .; Doe, Jane"))
            .await
            .unwrap();
        assert_eq!(project.institutions().len(), 1);
        assert_eq!(project.institutions()[0].id, 30);
        let ids: Vec<i64> = project.investigators().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, NO_MATCH]);
        assert_eq!(project.investigators()[0].name, "Smith, John");
        assert_eq!(project.start_date, chrono::NaiveDate::from_ymd_opt(2019, 9, 1));
        assert_eq!(project.comments(), None);
    }

    #[tokio::test]
    async fn test_univ_is_spelled_out_before_matching() {
        let store = store();
        let mut linker = linker(&store).await;
        let extracted = ExtractedProject {
            project_number: "TEX-1".into(),
            title: "Beef carcass washes".into(),
            institution: Some(InstitutionMention {
                lines: vec!["TEXAS A&amp;M UNIV".into()],
                city: Some("COLLEGE STATION".into()),
            }),
            ..Default::default()
        };
        let project = linker.link(&extracted).await.unwrap();
        assert_eq!(project.institutions()[0].id, 7);
        assert_eq!(project.institutions()[0].name, "TEXAS A&M UNIVERSITY");
    }

    #[tokio::test]
    async fn test_unmatched_entities_become_comments() {
        let store = store();
        let mut linker = linker(&store).await;
        let extracted = ExtractedProject {
            project_number: "X-1".into(),
            title: "Unknown lab".into(),
            institution: Some(InstitutionMention {
                lines: vec!["ACME FOOD LABS".into()],
                city: Some("Springfield".into()),
            }),
            investigators: vec!["Smith, John".into()],
            funding_source: Some("NATIONAL INSTITUTES OF HEALH".into()),
            ..Default::default()
        };
        let project = linker.link(&extracted).await.unwrap();
        assert!(project.institutions().is_empty());
        assert!(project.investigators().is_empty());
        assert_eq!(project.funding_source_id, None);
        assert_eq!(
            project.comments(),
            Some(
                "Institution:\nAcme Food Labs\n\nInvestigators:\nSmith, John\n\nFunding Source:\nNational Institutes of Healh"
            )
        );
        let stats = linker.stats();
        assert_eq!(stats.institutions, KindStats { attempted: 1, matched: 0 });
        assert_eq!(stats.funding_sources, KindStats { attempted: 1, matched: 0 });
    }

    #[tokio::test]
    async fn test_funding_source_exact_match() {
        let store = store();
        let mut linker = linker(&store).await;
        let extracted = ExtractedProject {
            project_number: "N-1".into(),
            title: "Norovirus".into(),
            funding_source: Some("NATIONAL INSTITUTES OF HEALTH".into()),
            ..Default::default()
        };
        let project = linker.link(&extracted).await.unwrap();
        assert_eq!(project.funding_source_id, Some(3));
        assert_eq!(project.comments(), None);
    }

    #[tokio::test]
    async fn test_new_investigator_is_inserted_once_across_projects() {
        let store = store();
        let mut linker = linker(&store).await;

        let first = linker.link(&cris_project("NYC-1", "Doe, Jane")).await.unwrap();
        let outcome = linker.persist(&store, &first).await.unwrap();
        let PersistOutcome::Inserted { new_investigator_ids, investigator_ids, project_id } = outcome else {
            panic!("expected an insert");
        };
        assert_eq!(new_investigator_ids.len(), 1);
        assert_eq!(investigator_ids, new_investigator_ids);

        let second = linker.link(&cris_project("NYC-2", "DOE, JANE")).await.unwrap();
        assert_eq!(second.investigators()[0].id, new_investigator_ids[0]);
        let outcome = linker.persist(&store, &second).await.unwrap();
        let PersistOutcome::Inserted { new_investigator_ids: none_new, project_id: second_id, .. } = outcome else {
            panic!("expected an insert");
        };
        assert!(none_new.is_empty());
        assert_eq!(linker.stats().new_investigators, 1);
        assert_eq!(
            store.investigator_links().unwrap(),
            vec![(project_id, new_investigator_ids[0]), (second_id, new_investigator_ids[0])]
        );
    }

    #[tokio::test]
    async fn test_same_new_name_twice_in_one_project() {
        let store = store();
        let mut linker = linker(&store).await;
        let project = linker
            .link(&cris_project("NYC-3", "Doe, Jane; Doe, Jane"))
            .await
            .unwrap();
        let outcome = linker.persist(&store, &project).await.unwrap();
        let PersistOutcome::Inserted { investigator_ids, new_investigator_ids, .. } = outcome else {
            panic!("expected an insert");
        };
        assert_eq!(new_investigator_ids.len(), 1);
        assert_eq!(investigator_ids, vec![new_investigator_ids[0], new_investigator_ids[0]]);
        assert_eq!(store.investigator_links().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_project_is_skipped() {
        let store = store();
        let mut linker = linker(&store).await;
        let project = linker.link(&cris_project("NYC-1", "Smith, John")).await.unwrap();
        assert!(matches!(
            linker.persist(&store, &project).await.unwrap(),
            PersistOutcome::Inserted { .. }
        ));
        assert_eq!(linker.persist(&store, &project).await.unwrap(), PersistOutcome::Duplicate);
        assert_eq!(store.projects().unwrap().len(), 1);
        assert_eq!(linker.stats().duplicates, 1);
    }

    /// Memory writer whose project inserts can be switched off.
    struct FailingProjectWriter {
        store: MemoryStore,
        fail_projects: std::cell::Cell<bool>,
    }

    impl ProjectWriter for FailingProjectWriter {
        async fn is_duplicate(&self, project: &Project) -> Result<bool, StoreError> {
            self.store.is_duplicate(project).await
        }

        async fn insert_project(&self, project: &Project) -> Result<i64, StoreError> {
            if self.fail_projects.get() {
                return Err(StoreError::Unavailable("project table locked".to_string()));
            }
            self.store.insert_project(project).await
        }

        async fn insert_investigator(&self, name: &str, institution_id: i64) -> Result<i64, StoreError> {
            ProjectWriter::insert_investigator(&self.store, name, institution_id).await
        }

        async fn link_investigator(&self, project_id: i64, investigator_id: i64) -> Result<(), StoreError> {
            self.store.link_investigator(project_id, investigator_id).await
        }
    }

    #[tokio::test]
    async fn test_failed_project_insert_keeps_new_investigator_for_retry() {
        let store = store();
        let writer = FailingProjectWriter {
            store: store.clone(),
            fail_projects: std::cell::Cell::new(true),
        };
        let mut linker = linker(&store).await;
        let project = linker.link(&cris_project("NYC-4", "Doe, Jane")).await.unwrap();

        assert!(linker.persist(&writer, &project).await.is_err());
        assert!(store.projects().unwrap().is_empty());
        assert!(store.investigator_links().unwrap().is_empty());
        let orphan = linker.session().investigators.find_match("Doe, Jane", 30);
        assert_ne!(orphan, NO_MATCH);

        writer.fail_projects.set(false);
        let outcome = linker.persist(&writer, &project).await.unwrap();
        let PersistOutcome::Inserted { project_id, investigator_ids, new_investigator_ids } = outcome else {
            panic!("expected an insert");
        };
        assert!(new_investigator_ids.is_empty());
        assert_eq!(investigator_ids, vec![orphan]);
        assert_eq!(store.investigator_links().unwrap(), vec![(project_id, orphan)]);
        assert_eq!(linker.stats().new_investigators, 1);
    }

    #[tokio::test]
    async fn test_store_failure_during_link_propagates() {
        let store = store();
        let mut linker = linker(&store).await;
        store.set_unavailable(true);
        let result = linker.link(&cris_project("NYC-1", "Smith, John")).await;
        assert!(matches!(result, Err(MatchError::StoreUnavailable { .. })));
    }
}
