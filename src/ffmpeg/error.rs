//! Map FFmpeg exit codes to short messages printed after a failed conversion.
//!
//! Exit codes are from ffmpeg.c: 1 (general), 69 (rate exceeded),
//! 123 (hard exit), 255 (signal). -1 is used for spawn failure or death by signal.

/// Source-verified exit codes from ffmpeg.c.
fn known_exit_code_summary(code: i32) -> Option<&'static str> {
    match code {
        -1 => Some("FFmpeg could not be started or was killed by a signal."),
        1 => Some("FFmpeg failed."),
        69 => Some("Encoding rate limit exceeded."),
        123 | 255 => Some("Encoding was stopped."),
        _ => None,
    }
}

/// One-line summary for an ffmpeg exit code.
pub fn describe_exit_code(code: i32) -> String {
    match known_exit_code_summary(code) {
        Some(msg) => msg.to_string(),
        None => format!("FFmpeg failed (exit code {}).", code),
    }
}
