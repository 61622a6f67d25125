pub mod cli;
pub mod config;
pub mod executor;
pub mod signal;
pub mod ssh;
pub mod target;
pub mod ui;
pub mod utils;

pub use cli::Cli;
pub use executor::{ParallelExecutor, RunResult};
pub use target::Target;
