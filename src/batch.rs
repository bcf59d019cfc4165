//! Per-file conversion driver.
//!
//! For every discovered file: work out where the output goes, build the ffmpeg plan, then
//! print it, pretend to run it, or run it. Failures are reported and counted per file and
//! never stop the batch.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::console::Console;
use crate::error::AppError;
use crate::ffmpeg::{
    EncodePlan, FfmpegParams, MediaTools, ProbeLimits, build_encode_plan, describe_exit_code,
    format_command_for_display, format_plan_for_display, path_to_string,
};
use crate::scan::should_ignore;

/// Throwaway file created and removed to prove an output directory accepts writes.
pub const WRITE_PROBE_NAME: &str = ".write_test_temp";

/// Name of the default output root under the input directory.
pub const CONVERTED_DIR_NAME: &str = "converted";

static DOUBLE_CONVERTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[/\\])converted[/\\]converted([/\\]|$)").expect("invalid converted regex")
});

/// Everything the driver needs that stays fixed for the whole run.
#[derive(Debug, Clone)]
pub struct BatchContext {
    /// Absolute input root. Output subdirectories mirror paths relative to it.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Canonical path of the preset document, skipped if it shows up among the files.
    pub preset_path: Option<PathBuf>,
    pub params: FfmpegParams,
    pub limits: ProbeLimits,
    /// Extension forced by `--force-m4v`, without the dot.
    pub forced_extension: Option<String>,
    pub execute: bool,
    pub dry_run: bool,
    pub replace_underscores: bool,
    pub ignore_flag: String,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print what would happen, touch nothing.
    DryRun,
    /// Create directories and run ffmpeg.
    Execute,
    /// Print the generated command only.
    Preview,
}

impl BatchContext {
    /// Dry-run takes precedence over execute.
    pub fn mode(&self) -> Mode {
        if self.dry_run {
            Mode::DryRun
        } else if self.execute {
            Mode::Execute
        } else {
            Mode::Preview
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunCounters {
    pub fn is_empty(&self) -> bool {
        self.processed == 0 && self.skipped == 0 && self.failed == 0
    }

    /// 1 when any file failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 { 1 } else { 0 }
    }
}

/// Where one input file ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub subdir: PathBuf,
    /// File ffmpeg writes.
    pub file: PathBuf,
    /// Final name after a successful conversion, when the extension is forced.
    pub rename_to: Option<PathBuf>,
}

pub fn format_filename(stem: &str, replace_underscores: bool) -> String {
    if replace_underscores {
        stem.replace('_', " ")
    } else {
        stem.to_string()
    }
}

/// Collapse one accidental `converted/converted` segment pair into `converted`.
pub fn collapse_double_converted(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match DOUBLE_CONVERTED_RE.replace(&text, "${1}converted${2}") {
        std::borrow::Cow::Borrowed(_) => path.to_path_buf(),
        std::borrow::Cow::Owned(collapsed) => {
            log::debug!(
                target: "hb_conv::batch",
                "Collapsed doubled output directory {} -> {}",
                text,
                collapsed
            );
            PathBuf::from(collapsed)
        }
    }
}

/// Output directory, file name and optional rename for `file`.
pub fn plan_output(file: &Path, ctx: &BatchContext) -> OutputTarget {
    let dir_part = file
        .strip_prefix(&ctx.input_dir)
        .ok()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty());
    let subdir = match dir_part {
        Some(rel) => ctx.output_dir.join(rel),
        None => ctx.output_dir.clone(),
    };

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let basename = format_filename(&stem, ctx.replace_underscores);

    let (extension, rename_ext) = match &ctx.forced_extension {
        Some(forced) if ctx.execute => (ctx.params.format.as_str(), Some(forced.as_str())),
        Some(forced) => (forced.as_str(), None),
        None => (ctx.params.format.as_str(), None),
    };

    let file_out = subdir.join(format!("{}.{}", basename, extension));
    let rename_to = rename_ext
        .filter(|ext| *ext != extension)
        .map(|ext| subdir.join(format!("{}.{}", basename, ext)));

    OutputTarget {
        subdir,
        file: file_out,
        rename_to,
    }
}

/// Parent must be a directory, an existing target must be writable, and the directory must
/// accept a probe file.
pub fn check_output_access(output_file: &Path) -> Result<(), AppError> {
    let dir = output_file.parent().unwrap_or_else(|| Path::new("."));

    if !dir.is_dir() {
        return Err(AppError::OutputNotWritable(format!(
            "Output directory '{}' does not exist.",
            dir.display()
        )));
    }

    if let Ok(meta) = fs::metadata(output_file) {
        if meta.permissions().readonly() {
            return Err(AppError::OutputNotWritable(format!(
                "Output file '{}' exists but is not writable.",
                output_file.display()
            )));
        }
    }

    let probe = dir.join(WRITE_PROBE_NAME);
    File::create(&probe).map_err(|e| {
        log::debug!(
            target: "hb_conv::batch",
            "Write probe failed in {}: {}",
            dir.display(),
            e
        );
        AppError::OutputNotWritable(format!(
            "Output directory '{}' is not writable.",
            dir.display()
        ))
    })?;
    if let Err(e) = fs::remove_file(&probe) {
        log::warn!(
            target: "hb_conv::batch",
            "Failed to remove write probe {}: {}",
            probe.display(),
            e
        );
    }
    Ok(())
}

/// Move the converted file to its forced-extension name.
pub fn rename_to_forced_extension(
    from: &Path,
    to: &Path,
    console: &Console,
) -> Result<(), AppError> {
    console.line(format_args!("Renaming {} to {}", from.display(), to.display()));
    if !from.exists() {
        return Err(AppError::from(format!(
            "File {} not found for renaming",
            from.display()
        )));
    }
    fs::rename(from, to).map_err(|e| {
        AppError::from(format!(
            "Error renaming {} to {}: {}",
            from.display(),
            to.display(),
            e
        ))
    })
}

fn run_plan(
    plan: &EncodePlan,
    verbose: bool,
    tools: &dyn MediaTools,
    console: &Console,
) -> Result<(), AppError> {
    let passes = plan.passes();
    let total = passes.len();
    for (i, args) in passes.into_iter().enumerate() {
        if plan.is_two_pass() {
            console.line(format_args!("Running pass {} of {}...", i + 1, total));
        }
        if verbose {
            console.line(format_args!("Executing: {}", format_command_for_display(args)));
        }
        console.flush();
        tools.run_ffmpeg(args)?;
    }
    Ok(())
}

fn convert(
    file: &Path,
    ctx: &BatchContext,
    tools: &dyn MediaTools,
    console: &Console,
) -> Result<(), AppError> {
    let mode = ctx.mode();
    let target = plan_output(file, ctx);

    if !target.subdir.exists() {
        match mode {
            Mode::Execute => {
                console.line(format_args!(
                    "Creating output directory: {}",
                    target.subdir.display()
                ));
                fs::create_dir_all(&target.subdir).map_err(|e| {
                    AppError::from(format!(
                        "Failed to create directory {}: {}",
                        target.subdir.display(),
                        e
                    ))
                })?;
            }
            Mode::DryRun => console.line(format_args!(
                "[DRY RUN] Would create directory: {}",
                target.subdir.display()
            )),
            Mode::Preview => {}
        }
    }

    if mode == Mode::Execute {
        check_output_access(&target.file)?;
    }

    let input = path_to_string(file)?;
    let output = path_to_string(&target.file)?;
    let plan = build_encode_plan(&input, &output, &ctx.params, ctx.limits, ctx.verbose);
    let display = format_plan_for_display(&plan);

    match mode {
        Mode::DryRun => {
            console.line("[DRY RUN] Would execute:");
            console.line(&display);
            if let Some(to) = &target.rename_to {
                console.line(format_args!(
                    "[DRY RUN] Would rename {} to {}",
                    target.file.display(),
                    to.display()
                ));
            }
        }
        Mode::Execute => {
            console.line(format_args!("Processing: {}", file.display()));
            console.line(format_args!("Output: {}", target.file.display()));
            console.line(format_args!("Command: {}", display));

            run_plan(&plan, ctx.verbose, tools, console)?;
            console.line("Conversion successful");

            if let Some(to) = &target.rename_to {
                if let Err(e) = rename_to_forced_extension(&target.file, to, console) {
                    console.line(format_args!("Error: {}", e));
                    console.line(format_args!(
                        "Warning: Failed to rename file to .{}",
                        ctx.forced_extension.as_deref().unwrap_or_default()
                    ));
                }
            }
        }
        Mode::Preview => {
            console.line(format_args!("Generated command for {}:", file.display()));
            console.line(&display);
            if let Some(forced) = &ctx.forced_extension {
                console.line(format_args!(
                    "Note: If executed, the file will be converted to {} then renamed to .{}",
                    ctx.params.format, forced
                ));
            }
        }
    }
    Ok(())
}

fn report_failure(file: &Path, err: &AppError, tools: &dyn MediaTools, console: &Console) {
    match err {
        AppError::OutputNotWritable(msg) => {
            console.line(format_args!("Error: {}", msg));
            console.line(format_args!(
                "Skipping {} due to output file access issues.",
                file.display()
            ));
        }
        AppError::FfmpegFailed { code } => {
            console.line(format_args!("Error: {}", err));
            console.line(describe_exit_code(*code));
            console.line("Checking input file...");
            console.line(format_args!("File information for {}:", file.display()));
            match tools.probe(file) {
                Ok(info) => console.raw(&info),
                Err(e) => console.line(format_args!("Error: {}", e)),
            }
        }
        other => console.line(format_args!("Error: {}", other)),
    }
}

/// Handle one file. Every error is printed before it is returned.
pub fn process_file(
    file: &Path,
    ctx: &BatchContext,
    tools: &dyn MediaTools,
    console: &Console,
) -> Result<(), AppError> {
    convert(file, ctx, tools, console).inspect_err(|err| {
        let level = if err.is_per_file() {
            log::Level::Warn
        } else {
            log::Level::Error
        };
        log::log!(
            target: "hb_conv::batch",
            level,
            "Conversion failed for {}: {}",
            file.display(),
            err
        );
        report_failure(file, err, tools, console);
    })
}

fn is_preset_document(file: &Path, ctx: &BatchContext) -> bool {
    match &ctx.preset_path {
        Some(preset) => fs::canonicalize(file).is_ok_and(|c| c == *preset),
        None => false,
    }
}

/// Process `files` in order and count the outcome of each.
pub fn run_batch(
    files: &[PathBuf],
    ctx: &BatchContext,
    tools: &dyn MediaTools,
    console: &Console,
) -> RunCounters {
    let mut counters = RunCounters::default();

    for file in files {
        if is_preset_document(file, ctx) {
            log::debug!(
                target: "hb_conv::batch",
                "Skipping preset document {}",
                file.display()
            );
            continue;
        }

        if should_ignore(file, &ctx.ignore_flag) {
            console.line(format_args!(
                "Skipping: {} (ignore flag found)",
                file.display()
            ));
            counters.skipped += 1;
            continue;
        }

        match process_file(file, ctx, tools, console) {
            Ok(()) => counters.processed += 1,
            Err(_) => {
                console.line(format_args!("Failed to process: {}", file.display()));
                counters.failed += 1;
            }
        }
    }

    log::info!(
        target: "hb_conv::batch",
        "Batch done: processed={}, skipped={}, failed={}",
        counters.processed,
        counters.skipped,
        counters.failed
    );
    counters
}

pub fn print_summary(counters: &RunCounters, console: &Console) {
    console.line("Processing complete:");
    console.line(format_args!(
        "  - Successfully processed: {} files",
        counters.processed
    ));
    console.line(format_args!("  - Skipped: {} files", counters.skipped));
    console.line(format_args!("  - Failed: {} files", counters.failed));
    if counters.is_empty() {
        console.line("No media files found in the specified directory.");
    }
}
