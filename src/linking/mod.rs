pub mod cleanup;
pub mod linker;
pub mod writer;

pub use linker::{ExtractedProject, InstitutionMention, LinkStats, PersistOutcome, ProjectLinker};
pub use writer::{PgProjectWriter, ProjectWriter};
