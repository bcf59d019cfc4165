//! FFmpeg process spawning.
//!
//! Commands are executed directly from their argument vector; no shell is involved, so
//! paths with spaces or quotes reach ffmpeg untouched. Each call blocks until the child
//! exits; there is no timeout.

use std::path::Path;
use std::process::{Command, Stdio};

use super::discovery::ToolPaths;
use super::ffprobe::probe_file_info;
use crate::error::AppError;

/// External tool seam used by the batch driver.
pub trait MediaTools {
    /// Run ffmpeg with `args` and wait for it. Non-zero exit is [`AppError::FfmpegFailed`].
    fn run_ffmpeg(&self, args: &[String]) -> Result<(), AppError>;

    /// Diagnostic ffprobe dump of `input`. The probe's own exit status is not an error.
    fn probe(&self, input: &Path) -> Result<Vec<u8>, AppError>;
}

/// Real ffmpeg/ffprobe binaries found by [`ToolPaths::locate`].
#[derive(Debug, Clone)]
pub struct SystemTools {
    paths: ToolPaths,
}

impl SystemTools {
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.paths.ffmpeg
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.paths.ffprobe
    }
}

impl MediaTools for SystemTools {
    fn run_ffmpeg(&self, args: &[String]) -> Result<(), AppError> {
        run_ffmpeg_blocking(&self.paths.ffmpeg, args)
    }

    fn probe(&self, input: &Path) -> Result<Vec<u8>, AppError> {
        probe_file_info(&self.paths.ffprobe, input)
    }
}

/// Run FFmpeg and block until completion. ffmpeg's own stdout/stderr stay attached to the
/// terminal so `-stats` progress remains visible.
pub fn run_ffmpeg_blocking(ffmpeg_path: &Path, args: &[String]) -> Result<(), AppError> {
    let input_arg = args
        .iter()
        .position(|a| a == "-i")
        .and_then(|i| args.get(i + 1));
    let output_arg = args.last();
    log::debug!(
        target: "hb_conv::ffmpeg::runner",
        "Spawning FFmpeg: path={}, input={:?}, output={:?}",
        ffmpeg_path.display(),
        input_arg,
        output_arg
    );
    log::trace!(
        target: "hb_conv::ffmpeg::runner",
        "FFmpeg args:\n{}",
        super::format_args_for_display_multiline(args)
    );

    let status = Command::new(ffmpeg_path)
        .args(args)
        .stdin(Stdio::null())
        .status()
        .map_err(|e| AppError::from(format!("Failed to spawn FFmpeg: {}", e)))?;

    if status.success() {
        log::info!(
            target: "hb_conv::ffmpeg::runner",
            "FFmpeg completed successfully"
        );
        Ok(())
    } else {
        // None means the child was killed by a signal.
        let code = status.code().unwrap_or(-1);
        log::error!(
            target: "hb_conv::ffmpeg::runner",
            "FFmpeg failed (code={}) for input {:?}",
            code,
            input_arg
        );
        Err(AppError::ffmpeg_failed(code))
    }
}
