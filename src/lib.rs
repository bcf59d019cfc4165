pub mod batch;
pub mod cli;
pub mod console;
pub mod error;
pub mod ffmpeg;
pub mod preset;
pub mod scan;

pub use batch::{BatchContext, RunCounters, run_batch};
pub use cli::Cli;
pub use console::Console;
