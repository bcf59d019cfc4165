//! Locating the ffmpeg and ffprobe binaries before any work starts.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::AppError;

pub const FFMPEG_ENV: &str = "FFMPEG_PATH";
pub const FFPROBE_ENV: &str = "FFPROBE_PATH";

const INSTALL_HINT: &str = "  - macOS: brew install ffmpeg\n  - Linux: sudo apt install ffmpeg\n  - Windows: Download from https://ffmpeg.org/download.html";

/// Resolved, verified tool locations. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    /// Resolve both tools and check that each answers `-version`.
    pub fn locate() -> Result<Self, AppError> {
        let ffmpeg = resolve_ffmpeg_path()?;
        verify_tool("ffmpeg", &ffmpeg)?;
        let ffprobe = resolve_ffprobe_path(&ffmpeg)?;
        verify_tool("ffprobe", &ffprobe)?;
        log::debug!(
            target: "hb_conv::ffmpeg::discovery",
            "Tools ready: ffmpeg={}, ffprobe={}",
            ffmpeg.display(),
            ffprobe.display()
        );
        Ok(Self { ffmpeg, ffprobe })
    }
}

fn executable_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let locator = if cfg!(windows) { "where" } else { "which" };
    let output = Command::new(locator)
        .arg(program)
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout);
        let first = path.lines().next()?.trim();
        if !first.is_empty() {
            return Some(PathBuf::from(first));
        }
    }
    None
}

fn common_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/opt/local/bin/ffmpeg"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe"),
        ]
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
    {
        vec![]
    }
}

fn env_override(var: &str) -> Option<PathBuf> {
    let value = std::env::var_os(var)?;
    let p = PathBuf::from(value);
    if p.exists() {
        log::debug!(
            target: "hb_conv::ffmpeg::discovery",
            "Using {} from {}",
            p.display(),
            var
        );
        Some(p)
    } else {
        log::warn!(
            target: "hb_conv::ffmpeg::discovery",
            "{} points to missing file {}; ignoring",
            var,
            p.display()
        );
        None
    }
}

/// `FFMPEG_PATH` first, then PATH, then common install locations.
pub fn resolve_ffmpeg_path() -> Result<PathBuf, AppError> {
    if let Some(p) = env_override(FFMPEG_ENV) {
        return Ok(p);
    }

    if let Some(p) = find_in_path(&executable_name("ffmpeg")) {
        if p.exists() {
            log::debug!(
                target: "hb_conv::ffmpeg::discovery",
                "FFmpeg found in PATH: {}",
                p.display()
            );
            return Ok(p);
        }
    }

    for path in common_paths() {
        if path.exists() {
            log::debug!(
                target: "hb_conv::ffmpeg::discovery",
                "FFmpeg found in common path: {}",
                path.display()
            );
            return Ok(path);
        }
    }

    log::error!(
        target: "hb_conv::ffmpeg::discovery",
        "FFmpeg not found in PATH or common locations"
    );
    Err(AppError::ToolNotFound(format!(
        "ffmpeg is required but not installed. Please install ffmpeg:\n{}",
        INSTALL_HINT
    )))
}

fn strip_exe_suffix(name: &str) -> &str {
    if !cfg!(windows) {
        return name;
    }
    match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".exe") => {
            &name[..cut]
        }
        _ => name,
    }
}

/// Paths to try for ffprobe given an ffmpeg binary path (suffixed first, then plain).
pub fn ffprobe_candidates(ffmpeg_path: &Path) -> Vec<PathBuf> {
    let parent = match ffmpeg_path.parent() {
        Some(p) => p,
        None => return vec![],
    };
    let mut candidates = Vec::with_capacity(2);
    // Version suffixes may contain dots ("ffmpeg-7.1"), so only ".exe" is stripped.
    let base = ffmpeg_path
        .file_name()
        .and_then(|s| s.to_str())
        .map(strip_exe_suffix);
    if let Some(suffix) = base.and_then(|s| s.strip_prefix("ffmpeg")) {
        if !suffix.is_empty() {
            candidates.push(parent.join(executable_name(&format!("ffprobe{suffix}"))));
        }
    }
    candidates.push(parent.join(executable_name("ffprobe")));
    candidates
}

/// `FFPROBE_PATH`, then next to ffmpeg (ffmpeg/ffprobe ship together), then PATH.
pub fn resolve_ffprobe_path(ffmpeg_path: &Path) -> Result<PathBuf, AppError> {
    if let Some(p) = env_override(FFPROBE_ENV) {
        return Ok(p);
    }
    if let Some(p) = ffprobe_candidates(ffmpeg_path)
        .into_iter()
        .find(|c| c.exists())
    {
        return Ok(p);
    }
    if let Some(p) = find_in_path(&executable_name("ffprobe")).filter(|p| p.exists()) {
        return Ok(p);
    }
    Err(AppError::ToolNotFound(format!(
        "ffprobe is required but not installed (looked next to {} and in PATH). Please install ffprobe:\n{}",
        ffmpeg_path.display(),
        INSTALL_HINT
    )))
}

/// Run `<tool> -version` with output discarded.
pub fn verify_tool(name: &str, path: &Path) -> Result<(), AppError> {
    let status = Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(s) if s.success() => Ok(()),
        Ok(s) => Err(AppError::ToolNotFound(format!(
            "{} at {} is not working (exit code {}).",
            name,
            path.display(),
            s.code().unwrap_or(-1)
        ))),
        Err(e) => Err(AppError::ToolNotFound(format!(
            "{} is required but could not be run from {}: {}",
            name,
            path.display(),
            e
        ))),
    }
}
