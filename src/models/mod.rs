pub mod core;
pub mod project;

pub use self::core::{
    CanonicalRecord, EntityKind, MatchContext, MatchQuery, ScopeKey, StoreRow, NO_MATCH,
};
pub use self::project::{InstitutionRef, InvestigatorRef, Project};
