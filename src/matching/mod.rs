pub mod abbreviation;
pub mod error;
pub mod funding_source;
pub mod index;
pub mod institution;
pub mod investigator;
pub mod normalize;
pub mod session;
pub mod similarity;

pub use error::MatchError;
pub use funding_source::FundingSourceMatcher;
pub use institution::InstitutionMatcher;
pub use investigator::InvestigatorMatcher;
pub use normalize::normalize;
pub use session::MatchingSession;
pub use similarity::levenshtein_ratio;
