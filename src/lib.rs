//! Record linkage between two restaurant directories.
//!
//! Records from the driving collection are searched for in the candidate
//! collection with a fixed set of field matchers (phone containment, website
//! equality, reference token overlap, fuzzy address), either one matcher at a
//! time or as a prioritized chain.

pub mod assemble;
pub mod db;
pub mod linker;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod settings;
pub mod similarity;
pub mod snapshot;

pub use assemble::{assemble, CandidatePolicy, LinkStats, Linkage};
pub use linker::{Linker, Resolution, Strategy};
pub use matcher::{FieldMatcher, MatcherKind, MatcherRegistry, Outcome};
pub use model::{Address, MatchPair, Restaurant};
