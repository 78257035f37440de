//! Pipeline orchestration: classify a reference, extract its text, and
//! materialize the run's artifacts.

pub mod materialize;
pub mod pipeline;

pub use materialize::{Materialized, materialize, write_url_list};
pub use pipeline::{DB_FILE_NAME, Pipeline, ProcessOutcome, ProgressReporter, SilentProgress};
