//! CLI command handlers. Each command is in its own file.

mod completions;
mod get;
mod progress;
mod targets;

pub use completions::run_completions;
pub use get::{run_get, GetOptions};
