use std::borrow::Cow;

use super::FfmpegParams;

/// Program name shown in printable command lines.
pub const FFMPEG_DISPLAY_NAME: &str = "ffmpeg";

/// Default for both `-analyzeduration` and `-probesize`.
pub const DEFAULT_PROBE_LIMIT: u64 = 100_000_000;

/// How much of the input ffmpeg may read before deciding on stream layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeLimits {
    pub analyze_duration: u64,
    pub probe_size: u64,
}

impl Default for ProbeLimits {
    fn default() -> Self {
        Self {
            analyze_duration: DEFAULT_PROBE_LIMIT,
            probe_size: DEFAULT_PROBE_LIMIT,
        }
    }
}

/// One or two ffmpeg argument vectors for a single input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodePlan {
    Single(Vec<String>),
    TwoPass {
        first: Vec<String>,
        second: Vec<String>,
    },
}

impl EncodePlan {
    /// Passes in execution order.
    pub fn passes(&self) -> Vec<&[String]> {
        match self {
            EncodePlan::Single(args) => vec![args.as_slice()],
            EncodePlan::TwoPass { first, second } => vec![first.as_slice(), second.as_slice()],
        }
    }

    pub fn is_two_pass(&self) -> bool {
        matches!(self, EncodePlan::TwoPass { .. })
    }
}

pub fn null_device() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}

/// Split a rendered fragment such as "-c:a aac -b:a 160k" into argv tokens.
fn split_fragment(fragment: &str) -> impl Iterator<Item = String> + '_ {
    fragment
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub fn build_ffmpeg_command(
    input_path: &str,
    output_path: &str,
    params: &FfmpegParams,
    limits: ProbeLimits,
    verbose: bool,
) -> Vec<String> {
    log::debug!(
        target: "hb_conv::ffmpeg::builder",
        "Building FFmpeg command: vcodec={}, quality={}, preset={}, input={} -> output={}",
        params.vcodec,
        params.quality,
        params.preset,
        input_path,
        output_path
    );

    let mut args = vec![
        "-analyzeduration".to_string(),
        limits.analyze_duration.to_string(),
        "-probesize".to_string(),
        limits.probe_size.to_string(),
        "-i".to_string(),
        input_path.to_string(),
        "-c:v".to_string(),
        params.vcodec.clone(),
    ];

    args.extend(split_fragment(&params.quality));
    args.extend(["-preset".to_string(), params.preset.clone()]);

    if params.has_framerate() {
        args.extend(["-r".to_string(), params.framerate.clone()]);
    }

    args.extend(["-s".to_string(), params.resolution.clone()]);
    args.extend(split_fragment(&params.acodec));
    args.extend(split_fragment(&params.audio_channels));

    if params.has_profile() {
        args.extend(["-profile:v".to_string(), params.profile.clone()]);
    }

    if !verbose {
        args.extend([
            "-v".to_string(),
            "error".to_string(),
            "-stats".to_string(),
        ]);
    }

    // Keep every input stream.
    args.extend(["-map".to_string(), "0".to_string()]);

    args.push(output_path.to_string());
    args
}

/// Both passes share every flag; pass 1 writes statistics only.
pub fn build_multipass_commands(
    input_path: &str,
    output_path: &str,
    params: &FfmpegParams,
    limits: ProbeLimits,
    verbose: bool,
) -> (Vec<String>, Vec<String>) {
    let null = null_device();

    let mut first = build_ffmpeg_command(input_path, null, params, limits, verbose);
    first.pop();
    first.extend([
        "-pass".to_string(),
        "1".to_string(),
        "-f".to_string(),
        "null".to_string(),
        null.to_string(),
    ]);

    let mut second = build_ffmpeg_command(input_path, output_path, params, limits, verbose);
    second.extend(["-pass".to_string(), "2".to_string()]);

    (first, second)
}

/// Single or two-pass depending on [`FfmpegParams::is_two_pass`].
pub fn build_encode_plan(
    input_path: &str,
    output_path: &str,
    params: &FfmpegParams,
    limits: ProbeLimits,
    verbose: bool,
) -> EncodePlan {
    if params.is_two_pass() {
        let (first, second) =
            build_multipass_commands(input_path, output_path, params, limits, verbose);
        EncodePlan::TwoPass { first, second }
    } else {
        EncodePlan::Single(build_ffmpeg_command(
            input_path,
            output_path,
            params,
            limits,
            verbose,
        ))
    }
}

/// Quote an argument containing spaces. Display only; execution never goes through a shell.
pub fn escape_arg(arg: &str) -> Cow<'_, str> {
    if arg.contains(' ') {
        Cow::Owned(format!("\"{}\"", arg))
    } else {
        Cow::Borrowed(arg)
    }
}

/// Printable single command line: `ffmpeg` followed by the escaped args.
pub fn format_command_for_display(args: &[String]) -> String {
    std::iter::once(Cow::Borrowed(FFMPEG_DISPLAY_NAME))
        .chain(args.iter().map(|a| escape_arg(a)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Printable plan: passes joined with `&&` the way a shell would chain them.
pub fn format_plan_for_display(plan: &EncodePlan) -> String {
    plan.passes()
        .into_iter()
        .map(format_command_for_display)
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Formats args for readable display: option and value on the same line when the next arg is a value.
pub fn format_args_for_display_multiline(args: &[String]) -> String {
    if args.is_empty() {
        return String::new();
    }
    let mut lines = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        let line = if arg.starts_with('-') && i + 1 < args.len() && !args[i + 1].starts_with('-')
        {
            let value = &args[i + 1];
            i += 2;
            format!("  {} {}", arg, escape_arg(value))
        } else {
            i += 1;
            format!("  {}", escape_arg(arg))
        };
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::translate_settings;
    use crate::preset::Settings;

    fn params() -> FfmpegParams {
        let settings = Settings {
            video_encoder: "x264".into(),
            video_bitrate: "4000".into(),
            video_preset: "medium".into(),
            video_quality: "20".into(),
            video_quality_type: "2".into(),
            picture_width: "1920".into(),
            picture_height: "1080".into(),
            audio_encoder: "av_aac".into(),
            audio_bitrate: "160".into(),
            audio_mixdown: "stereo".into(),
            container: "av_mkv".into(),
            ..Settings::default()
        };
        translate_settings(&settings)
    }

    fn strs(args: &[String]) -> Vec<&str> {
        args.iter().map(String::as_str).collect()
    }

    #[test]
    fn single_pass_argument_order() {
        let args = build_ffmpeg_command(
            "/in/movie.mp4",
            "/out/movie.mkv",
            &params(),
            ProbeLimits::default(),
            false,
        );
        assert_eq!(
            strs(&args),
            vec![
                "-analyzeduration",
                "100000000",
                "-probesize",
                "100000000",
                "-i",
                "/in/movie.mp4",
                "-c:v",
                "libx264",
                "-crf",
                "20",
                "-preset",
                "medium",
                "-s",
                "1920x1080",
                "-c:a",
                "aac",
                "-b:a",
                "160k",
                "-ac",
                "2",
                "-v",
                "error",
                "-stats",
                "-map",
                "0",
                "/out/movie.mkv",
            ]
        );
    }

    #[test]
    fn framerate_and_profile_added_when_set() {
        let mut p = params();
        p.framerate = "24".into();
        p.profile = "high".into();
        let args = build_ffmpeg_command("/in.mp4", "/out.mkv", &p, ProbeLimits::default(), false);
        let r_idx = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r_idx + 1], "24");
        assert_eq!(args[r_idx - 1], "medium", "-r follows the preset");
        assert_eq!(args[r_idx + 2], "-s", "-r precedes the resolution");
        let prof_idx = args.iter().position(|a| a == "-profile:v").unwrap();
        assert_eq!(args[prof_idx + 1], "high");
        assert_eq!(args[prof_idx + 2], "-v");
    }

    #[test]
    fn auto_framerate_and_profile_omitted() {
        let mut p = params();
        p.framerate = "auto".into();
        p.profile = "auto".into();
        let args = build_ffmpeg_command("/in.mp4", "/out.mkv", &p, ProbeLimits::default(), false);
        assert!(!args.contains(&"-r".to_string()));
        assert!(!args.contains(&"-profile:v".to_string()));
    }

    #[test]
    fn verbose_drops_quiet_flags() {
        let args = build_ffmpeg_command("/in.mp4", "/out.mkv", &params(), ProbeLimits::default(), true);
        assert!(!args.contains(&"-stats".to_string()));
        assert!(!args.contains(&"error".to_string()));
        assert_eq!(args[args.len() - 3], "-map");
    }

    #[test]
    fn empty_audio_channels_adds_nothing() {
        let mut p = params();
        p.audio_channels.clear();
        let args = build_ffmpeg_command("/in.mp4", "/out.mkv", &p, ProbeLimits::default(), false);
        assert!(!args.contains(&"-ac".to_string()));
    }

    #[test]
    fn custom_probe_limits() {
        let limits = ProbeLimits {
            analyze_duration: 5_000_000,
            probe_size: 42,
        };
        let args = build_ffmpeg_command("/in.mp4", "/out.mkv", &params(), limits, false);
        assert_eq!(&strs(&args)[..4], &["-analyzeduration", "5000000", "-probesize", "42"]);
    }

    #[test]
    fn path_with_spaces_stays_one_token() {
        let args = build_ffmpeg_command(
            "/in/My Movie.mp4",
            "/out/My Movie.mkv",
            &params(),
            ProbeLimits::default(),
            false,
        );
        assert!(args.contains(&"/in/My Movie.mp4".to_string()));
        assert_eq!(args.last().unwrap(), "/out/My Movie.mkv");
        let display = format_command_for_display(&args);
        assert!(display.starts_with("ffmpeg -analyzeduration"));
        assert!(display.contains("-i \"/in/My Movie.mp4\""));
        assert!(display.ends_with("\"/out/My Movie.mkv\""));
    }

    #[test]
    fn multipass_structure() {
        let mut p = params();
        p.quality = "-b:v 4000k".into();
        p.multipass = true;
        let plan = build_encode_plan("/in.mp4", "/out.mkv", &p, ProbeLimits::default(), false);
        let EncodePlan::TwoPass { first, second } = plan else {
            panic!("expected a two-pass plan");
        };
        let null = null_device();
        assert_eq!(
            &strs(&first)[first.len() - 7..],
            &["-map", "0", "-pass", "1", "-f", "null", null]
        );
        assert_eq!(
            &strs(&second)[second.len() - 5..],
            &["-map", "0", "/out.mkv", "-pass", "2"]
        );
        // Everything before the output path is identical across passes.
        assert_eq!(first[..first.len() - 5], second[..second.len() - 3]);
    }

    #[test]
    fn crf_multipass_builds_single_pass() {
        let mut p = params();
        p.multipass = true;
        let plan = build_encode_plan("/in.mp4", "/out.mkv", &p, ProbeLimits::default(), false);
        assert!(!plan.is_two_pass());
        assert_eq!(plan.passes().len(), 1);
    }

    #[test]
    fn plan_display_joins_passes() {
        let mut p = params();
        p.quality = "-b:v 4000k".into();
        p.multipass = true;
        let plan = build_encode_plan("/in.mp4", "/out.mkv", &p, ProbeLimits::default(), false);
        let text = format_plan_for_display(&plan);
        assert_eq!(text.matches("ffmpeg ").count(), 2);
        assert!(text.contains(" && ffmpeg "));
        assert!(text.ends_with("/out.mkv -pass 2"));
    }

    #[test]
    fn multiline_display_pairs_options_with_values() {
        let args: Vec<String> = ["-i", "/in file.mp4", "-map", "0", "-stats", "/out.mkv"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            format_args_for_display_multiline(&args),
            "  -i \"/in file.mp4\"\n  -map 0\n  -stats /out.mkv"
        );
        assert_eq!(format_args_for_display_multiline(&[]), "");
    }
}
