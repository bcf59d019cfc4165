//! Media file discovery under an input root.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Container extensions picked up when no `--extensions` list is given.
pub const DEFAULT_MEDIA_EXTENSIONS: [&str; 11] = [
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts",
];

/// Marker file that excludes every media file in its directory.
pub const DEFAULT_IGNORE_FLAG: &str = ".noconvert";

#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<PathBuf>,
    /// Entries the walk could not read. Discovery carries on past them.
    pub errors: Vec<walkdir::Error>,
}

pub fn default_extensions() -> Vec<String> {
    DEFAULT_MEDIA_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

/// Lower-case, strip a leading dot, drop blanks and duplicates. Order is kept.
pub fn normalize_extensions<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for ext in raw {
        let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| extensions.iter().any(|allowed| *allowed == e))
}

/// Regular files under `root` whose lower-cased extension is in `extensions`.
///
/// Non-recursive mode only looks at direct children. Symlinked files are followed,
/// symlinked directories are not descended. Entries are sorted by file name per directory.
pub fn find_media_files(root: &Path, recursive: bool, extensions: &[String]) -> ScanResult {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut result = ScanResult::default();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!(target: "hb_conv::scan", "Error accessing directory: {}", e);
                result.errors.push(e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && has_allowed_extension(path, extensions) {
            result.files.push(path.to_path_buf());
        }
    }

    log::debug!(
        target: "hb_conv::scan",
        "Found {} media file(s) under {} (recursive={}, errors={})",
        result.files.len(),
        root.display(),
        recursive,
        result.errors.len()
    );
    result
}

/// True when the file's own directory holds `marker`. Checked at processing time.
pub fn should_ignore(file: &Path, marker: &str) -> bool {
    file.parent()
        .map(|dir| dir.join(marker).exists())
        .unwrap_or(false)
}
