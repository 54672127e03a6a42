// src/models/project.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::core::NO_MATCH;

/// An institution attached to a project. Only matched institutions are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionRef {
    pub id: i64,
    pub name: String,
}

/// An investigator attached to a project. `id == NO_MATCH` until the writer
/// inserts a new canonical record for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigatorRef {
    pub id: i64,
    pub name: String,
    pub institution_id: i64,
}

impl InvestigatorRef {
    pub fn is_new(&self) -> bool {
        self.id == NO_MATCH
    }
}

/// A research project ready for persistence.
///
/// Institutions and investigators are only ever appended through
/// [`Project::add_institution`] and [`Project::add_investigator`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub project_number: String,
    pub title: String,
    pub source_url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub more_info: Option<String>,
    pub objective: Option<String>,
    pub accession_number: Option<String>,
    pub project_type: Option<String>,
    pub funding_source_id: Option<i64>,
    comments: Option<String>,
    institutions: Vec<InstitutionRef>,
    investigators: Vec<InvestigatorRef>,
}

impl Project {
    pub fn new(project_number: &str, title: &str) -> Self {
        Self {
            project_number: project_number.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Appends a comment, separated from earlier ones by a blank line.
    pub fn add_comment(&mut self, comment: &str) {
        match &mut self.comments {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(comment);
            }
            None => self.comments = Some(comment.to_string()),
        }
    }

    pub fn add_institution(&mut self, institution: InstitutionRef) {
        self.institutions.push(institution);
    }

    pub fn add_investigator(&mut self, investigator: InvestigatorRef) {
        self.investigators.push(investigator);
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    pub fn institutions(&self) -> &[InstitutionRef] {
        &self.institutions
    }

    pub fn investigators(&self) -> &[InvestigatorRef] {
        &self.investigators
    }

    /// Investigators that still need a canonical record.
    pub fn new_investigators(&self) -> impl Iterator<Item = &InvestigatorRef> {
        self.investigators.iter().filter(|inv| inv.is_new())
    }
}
