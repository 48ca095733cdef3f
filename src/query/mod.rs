pub mod filters;

pub use filters::{build_filter, FilterCriteria, ResultLimit, SubjectPattern};
