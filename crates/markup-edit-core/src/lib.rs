pub mod diff;
pub mod engine;
pub mod error;
pub mod fs;
pub mod payload;

pub use engine::{apply_edit, EditOptions, EditOutcome, EditRequest, Operation, Selector};
pub use error::{EditError, EditResult, ExitCode};
pub use markup_query::{Format, ParseOptions};
pub use payload::PayloadSource;
