//! Command-line front: argument parsing, startup messages and the top-level run.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::batch::{
    BatchContext, CONVERTED_DIR_NAME, Mode, collapse_double_converted, print_summary, run_batch,
};
use crate::console::Console;
use crate::error::AppError;
use crate::ffmpeg::{
    DEFAULT_PROBE_LIMIT, FfmpegParams, MediaTools, ProbeLimits, SystemTools, ToolPaths,
    translate_settings,
};
use crate::preset::{extract_settings, load_preset_document};
use crate::scan::{DEFAULT_IGNORE_FLAG, default_extensions, find_media_files, normalize_extensions};

pub const SCRIPT_VERSION: &str = "0.9";

const RULE: &str = "============================================";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "hb-conv",
    about = "Convert HandBrake presets to ffmpeg commands and apply them to a media directory",
    disable_version_flag = true,
    after_help = "Files are skipped when a '.noconvert' file exists in the same directory.\n\
                  Use -m/--force-m4v to give every output the .m4v extension.\n\
                  Underscores in file names are replaced with spaces unless -u is given."
)]
pub struct Cli {
    /// HandBrake preset JSON file (first preset in PresetList is used)
    #[arg(value_name = "PRESET_JSON", required_unless_present = "version")]
    pub preset_json: Option<PathBuf>,

    /// Process media files recursively in subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Execute the generated ffmpeg commands
    #[arg(short, long)]
    pub execute: bool,

    /// Show what would be done without actually doing it
    #[arg(short, long)]
    pub dry_run: bool,

    /// Show only the ffmpeg equivalent of the preset
    #[arg(short = 'p', long)]
    pub show_preset: bool,

    /// Input directory (default: directory of the JSON file)
    #[arg(short, long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Output directory (default: <input-dir>/converted)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Force the output extension regardless of container
    #[arg(short = 'm', long = "force-m4v")]
    pub force_m4v: bool,

    /// Extension used by --force-m4v
    #[arg(long, value_name = "EXT", default_value = "m4v")]
    pub forced_extension: String,

    /// Don't replace underscores with spaces in output filenames
    #[arg(short = 'u', long)]
    pub no_underscore_replace: bool,

    /// Marker file that excludes its directory from conversion
    #[arg(long, value_name = "NAME", default_value = DEFAULT_IGNORE_FLAG)]
    pub ignore_flag: String,

    /// Comma-separated media extensions to look for
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// ffmpeg -analyzeduration value
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PROBE_LIMIT)]
    pub analyze_duration: u64,

    /// ffmpeg -probesize value
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PROBE_LIMIT)]
    pub probe_size: u64,

    /// Show verbose output and ffmpeg logs
    #[arg(long)]
    pub verbose: bool,

    /// Write all output to FILE instead of stdout
    #[arg(short = 'l', long = "log", value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Show version
    #[arg(short = 'v', long)]
    pub version: bool,
}

impl Cli {
    pub fn limits(&self) -> ProbeLimits {
        ProbeLimits {
            analyze_duration: self.analyze_duration,
            probe_size: self.probe_size,
        }
    }

    fn forced_extension(&self) -> Result<Option<String>, AppError> {
        if !self.force_m4v {
            return Ok(None);
        }
        let ext = self.forced_extension.trim().trim_start_matches('.');
        if ext.is_empty() {
            return Err(AppError::Usage(
                "--forced-extension must not be empty".to_string(),
            ));
        }
        Ok(Some(ext.to_string()))
    }
}

pub fn version_line() -> String {
    format!("Script Version={}", SCRIPT_VERSION)
}

/// Log file when requested and openable, stdout otherwise.
pub fn open_console(log_file: Option<&Path>) -> Console {
    match log_file {
        Some(path) => Console::log_file(path).unwrap_or_else(|e| {
            eprintln!("Error: Could not open log file: {}: {}", path.display(), e);
            Console::stdout()
        }),
        None => Console::stdout(),
    }
}

/// Locate ffmpeg/ffprobe, then run against the real tools.
pub fn run(cli: &Cli) -> Result<i32, AppError> {
    if cli.version {
        Console::stdout().line(version_line());
        return Ok(0);
    }
    let tools = SystemTools::new(ToolPaths::locate()?);
    log::debug!(
        target: "hb_conv::cli",
        "Using ffmpeg={}, ffprobe={}",
        tools.ffmpeg_path().display(),
        tools.ffprobe_path().display()
    );
    let console = open_console(cli.log.as_deref());
    run_with_tools(cli, &tools, &console)
}

/// The whole run after tool discovery. Returns the process exit code.
pub fn run_with_tools(
    cli: &Cli,
    tools: &dyn MediaTools,
    console: &Console,
) -> Result<i32, AppError> {
    let preset_json = cli
        .preset_json
        .as_deref()
        .ok_or_else(|| AppError::Usage("PRESET_JSON is required".to_string()))?;

    let document = load_preset_document(preset_json)?;
    let settings = extract_settings(&document)?;
    let params = translate_settings(&settings);
    let limits = cli.limits();
    let forced_extension = cli.forced_extension()?;

    if let Some(ext) = &forced_extension {
        if cli.execute {
            console.line(format_args!(
                "Force {} is enabled. Files will be converted to {} first, then renamed to .{}",
                ext, params.format, ext
            ));
        } else {
            console.line(format_args!("Forcing output extension to .{}", ext));
        }
    }

    if cli.show_preset {
        let output_format = match &forced_extension {
            Some(ext) if !cli.execute => ext.as_str(),
            _ => params.format.as_str(),
        };
        show_preset(&params, output_format, limits, console);
        return Ok(0);
    }

    let extensions = if cli.extensions.is_empty() {
        default_extensions()
    } else {
        normalize_extensions(&cli.extensions)
    };
    if extensions.is_empty() {
        return Err(AppError::Usage(
            "--extensions must name at least one extension".to_string(),
        ));
    }

    let input_dir = match &cli.input_dir {
        Some(dir) => dir.clone(),
        None => {
            let dir = preset_json
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            console.line(format_args!("Using media directory: {}", dir.display()));
            dir
        }
    };
    let input_dir = std::path::absolute(&input_dir)?;

    let output_dir = match &cli.output_dir {
        Some(dir) => dir.clone(),
        None => {
            let dir = input_dir.join(CONVERTED_DIR_NAME);
            console.line(format_args!("Using output directory: {}", dir.display()));
            dir
        }
    };
    let output_dir = collapse_double_converted(&output_dir);

    let ctx = BatchContext {
        input_dir,
        output_dir,
        preset_path: fs::canonicalize(preset_json).ok(),
        params,
        limits,
        forced_extension,
        execute: cli.execute,
        dry_run: cli.dry_run,
        replace_underscores: !cli.no_underscore_replace,
        ignore_flag: cli.ignore_flag.clone(),
        verbose: cli.verbose,
    };

    if ctx.mode() == Mode::Execute && !ctx.output_dir.exists() {
        console.line(format_args!(
            "Creating output directory: {}",
            ctx.output_dir.display()
        ));
        fs::create_dir_all(&ctx.output_dir).map_err(|e| {
            AppError::from(format!(
                "Failed to create output directory {}: {}",
                ctx.output_dir.display(),
                e
            ))
        })?;
    }

    print_banner(&ctx, cli.recursive, console);

    let scan = find_media_files(&ctx.input_dir, cli.recursive, &extensions);
    for err in &scan.errors {
        console.line(format_args!("Error accessing directory: {}", err));
    }

    let counters = run_batch(&scan.files, &ctx, tools, console);
    print_summary(&counters, console);
    console.flush();
    Ok(counters.exit_code())
}

fn print_banner(ctx: &BatchContext, recursive: bool, console: &Console) {
    console.line(format_args!(
        "Searching for media files in {}",
        ctx.input_dir.display()
    ));
    console.line(format_args!(
        "Files with the '{}' file in their directory will be skipped",
        ctx.ignore_flag
    ));
    console.line(format_args!(
        "Output directory set to: {}",
        ctx.output_dir.display()
    ));
    console.line(format_args!(
        "Using analyzeduration: {}, probesize: {}",
        ctx.limits.analyze_duration, ctx.limits.probe_size
    ));
    if ctx.replace_underscores {
        console.line("Underscores in filenames will be replaced with spaces in output files");
    } else {
        console.line("Output filenames will maintain the same format as input filenames");
    }
    if recursive {
        console.line("Recursive search enabled");
    } else {
        console.line("Non-recursive search");
    }
    if ctx.verbose {
        console.line("Verbose output enabled");
    }
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print the preset's ffmpeg equivalent.
pub fn show_preset(
    params: &FfmpegParams,
    output_format: &str,
    limits: ProbeLimits,
    console: &Console,
) {
    let audio = join_non_empty(&[params.acodec.as_str(), params.audio_channels.as_str()]);

    console.line(RULE);
    console.line(format_args!("Handbrake Preset: {}", params.preset_name));
    console.line("FFmpeg Equivalent Parameters:");
    console.line(RULE);
    console.line(format_args!("Video codec:      -c:v {}", params.vcodec));
    console.line(format_args!("Quality:          {}", params.quality));
    console.line(format_args!("Preset:           -preset {}", params.preset));
    if params.has_framerate() {
        console.line(format_args!("Framerate:        -r {}", params.framerate));
    }
    console.line(format_args!("Resolution:       -s {}", params.resolution));
    console.line(format_args!("Audio:            {}", audio));
    if params.has_profile() {
        console.line(format_args!("Profile:          -profile:v {}", params.profile));
    }
    console.line(format_args!("Output format:    {}", output_format));
    if params.is_two_pass() {
        console.line("Multipass:        Enabled (two-pass encoding)");
    } else {
        console.line("Multipass:        Disabled (single-pass encoding)");
    }
    console.line(format_args!("Analyze duration: {}", limits.analyze_duration));
    console.line(format_args!("Probe size:       {}", limits.probe_size));
    console.line(RULE);
    console.line("Example usage:");

    let analyze = limits.analyze_duration.to_string();
    let probe = limits.probe_size.to_string();
    let output = format!("output.{}", output_format);
    // `-preset` is dropped together with its value when the preset names none.
    let preset_flag = if params.preset.is_empty() { "" } else { "-preset" };
    console.line(join_non_empty(&[
        "ffmpeg",
        "-analyzeduration",
        analyze.as_str(),
        "-probesize",
        probe.as_str(),
        "-i",
        "input.mp4",
        "-c:v",
        params.vcodec.as_str(),
        params.quality.as_str(),
        preset_flag,
        params.preset.as_str(),
        "-s",
        params.resolution.as_str(),
        audio.as_str(),
        output.as_str(),
    ]));
    console.line(RULE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from([
            "hb-conv", "preset.json", "-r", "-e", "-d", "-p", "-m", "-u", "-i", "/in", "-o",
            "/out", "-l", "run.log",
        ])
        .expect("parse");
        assert_eq!(cli.preset_json, Some(PathBuf::from("preset.json")));
        assert!(cli.recursive && cli.execute && cli.dry_run && cli.show_preset);
        assert!(cli.force_m4v && cli.no_underscore_replace);
        assert_eq!(cli.input_dir, Some(PathBuf::from("/in")));
        assert_eq!(cli.output_dir, Some(PathBuf::from("/out")));
        assert_eq!(cli.log, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["hb-conv", "preset.json"]).expect("parse");
        assert_eq!(cli.ignore_flag, ".noconvert");
        assert_eq!(cli.forced_extension, "m4v");
        assert_eq!(cli.limits(), ProbeLimits::default());
        assert!(cli.extensions.is_empty());
        assert_eq!(cli.forced_extension().expect("ok"), None);
    }

    #[test]
    fn ignore_flag_accepts_equals_form() {
        let cli = Cli::try_parse_from(["hb-conv", "p.json", "--ignore-flag=.skipme"])
            .expect("parse");
        assert_eq!(cli.ignore_flag, ".skipme");
    }

    #[test]
    fn extensions_split_on_commas() {
        let cli = Cli::try_parse_from(["hb-conv", "p.json", "--extensions", "mkv,MTS"])
            .expect("parse");
        assert_eq!(cli.extensions, vec!["mkv", "MTS"]);
    }

    #[test]
    fn example_line_omits_preset_flag_without_value() {
        use crate::console::MemorySink;
        use crate::preset::Settings;

        let sink = MemorySink::new();
        let console = Console::from_writer(sink.clone());
        let params = translate_settings(&Settings {
            video_encoder: "x264".into(),
            video_quality_type: "2".into(),
            video_quality: "22".into(),
            ..Settings::default()
        });
        show_preset(&params, "mkv", ProbeLimits::default(), &console);

        let text = sink.contents();
        let example = text
            .lines()
            .find(|l| l.starts_with("ffmpeg "))
            .expect("example line");
        assert!(!example.contains("-preset"));
        assert!(example.contains("-crf 22 -s 0x0"));
    }

    #[test]
    fn example_line_keeps_preset_value() {
        use crate::console::MemorySink;
        use crate::preset::Settings;

        let sink = MemorySink::new();
        let console = Console::from_writer(sink.clone());
        let params = translate_settings(&Settings {
            video_preset: "slow".into(),
            ..Settings::default()
        });
        show_preset(&params, "mkv", ProbeLimits::default(), &console);

        assert!(sink.contents().contains(" -preset slow -s 0x0 "));
    }

    #[test]
    fn version_does_not_need_preset() {
        let cli = Cli::try_parse_from(["hb-conv", "-v"]).expect("parse");
        assert!(cli.version);
        assert_eq!(version_line(), "Script Version=0.9");
    }

    #[test]
    fn missing_preset_is_usage_error() {
        assert!(Cli::try_parse_from(["hb-conv"]).is_err());
        assert!(Cli::try_parse_from(["hb-conv", "p.json", "--bogus"]).is_err());
    }

    #[test]
    fn forced_extension_strips_dot() {
        let cli = Cli::try_parse_from(["hb-conv", "p.json", "-m", "--forced-extension", ".mp4"])
            .expect("parse");
        assert_eq!(cli.forced_extension().expect("ok"), Some("mp4".to_string()));
    }
}
