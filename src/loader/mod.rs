mod ancestry;
mod errors;
mod ledger;
mod service;
mod source;

pub use ancestry::AmbiguousParent;
pub use errors::LoadError;
pub use ledger::{list_runs, record_run, ImportRunRecord};
pub use service::{ImportOptions, ImportSummary, TermEvent, TermLoader, TermStatus};
pub use source::parse_delimiter;
