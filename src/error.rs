//! App error type shared by the converter pipeline and the CLI.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    ToolNotFound(String),

    #[error("JSON file '{}' does not exist.", path.display())]
    PresetNotFound { path: PathBuf },

    #[error("Failed to parse '{}' as valid JSON: {source}", path.display())]
    PresetParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON file contains no presets (PresetList is missing or empty)")]
    EmptyPresetList,

    #[error("FFmpeg command failed with return code {code}")]
    FfmpegFailed { code: i32 },

    #[error("{0}")]
    OutputNotWritable(String),

    #[error("{0}")]
    Usage(String),
}

impl AppError {
    pub fn ffmpeg_failed(code: i32) -> Self {
        Self::FfmpegFailed { code }
    }

    /// True for errors that end a single file but not the whole batch.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            AppError::Io(_) | AppError::FfmpegFailed { .. } | AppError::OutputNotWritable(_)
        )
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Io(std::io::Error::other(s))
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        s.to_string().into()
    }
}
