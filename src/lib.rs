// Library surface for headless/integration tests and reuse.
// The binary only wires these together with a terminal and a piper process.
pub mod app;
pub mod app_dirs;
pub mod celebration;
pub mod config;
pub mod drill;
pub mod error;
pub mod hint;
pub mod level;
pub mod progress;
pub mod runtime;
pub mod session;
pub mod speech;
pub mod stats;
pub mod ui;
pub mod words;

pub use error::{DrillError, DrillResult};
