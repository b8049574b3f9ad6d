//! CLI command handlers, one file per command.

mod artifact;
mod checksum;
mod common;
mod completions;
mod fetch;
mod plan;

pub use artifact::run_artifact;
pub use checksum::run_checksum;
pub use completions::{run_completions, run_man};
pub use fetch::run_fetch;
pub use plan::run_plan;
