pub mod commands;
pub mod criteria;
pub mod query;

pub use criteria::{DefectType, FilterCriteria, FilterWarning};
pub use query::{from_query_string, to_query_pairs, to_query_string, DecodedFilters};
