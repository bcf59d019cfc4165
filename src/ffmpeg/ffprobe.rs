//! FFprobe stream/format dump shown to the user after a failed conversion.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::AppError;

/// Arguments preceding the input path.
pub const PROBE_ARGS: [&str; 5] = ["-hide_banner", "-v", "error", "-show_format", "-show_streams"];

/// Run ffprobe on `input` and return stdout followed by stderr.
/// A non-zero ffprobe exit is logged but still returns whatever it printed.
pub fn probe_file_info(ffprobe: &Path, input: &Path) -> Result<Vec<u8>, AppError> {
    log::debug!(
        target: "hb_conv::ffmpeg::ffprobe",
        "probe_file_info: path={}",
        input.display()
    );

    let output = Command::new(ffprobe)
        .args(PROBE_ARGS)
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| AppError::from(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        log::debug!(
            target: "hb_conv::ffmpeg::ffprobe",
            "ffprobe exited with {:?} for {}",
            output.status.code(),
            input.display()
        );
    }

    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);
    Ok(combined)
}
