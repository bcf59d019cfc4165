mod builder;
pub mod discovery;
mod error;
pub mod ffprobe;
mod params;
mod runner;

pub use builder::{
    DEFAULT_PROBE_LIMIT, EncodePlan, ProbeLimits, build_encode_plan, build_ffmpeg_command,
    build_multipass_commands, escape_arg, format_args_for_display_multiline,
    format_command_for_display, format_plan_for_display, null_device,
};
pub use discovery::ToolPaths;
pub use error::describe_exit_code;
pub use params::{FfmpegParams, translate_settings};
pub use runner::{MediaTools, SystemTools, run_ffmpeg_blocking};

use std::path::Path;

/// Path as an ffmpeg argument. Non-UTF-8 paths are rejected rather than mangled.
pub fn path_to_string(path: &Path) -> Result<String, crate::error::AppError> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        crate::error::AppError::from(format!("Path is not valid UTF-8: {}", path.display()))
    })
}
