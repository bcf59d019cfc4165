use crate::preset::Settings;

/// CRF quality mode as stored in `VideoQualityType`. Anything else is average-bitrate mode.
const QUALITY_TYPE_CRF: &str = "2";

/// Container used when `FileFormat` is missing or unknown.
const DEFAULT_FORMAT: &str = "mkv";

/// ffmpeg-facing view of a preset. Fragments (`quality`, `acodec`, `audio_channels`) are
/// already rendered and may hold several space-separated tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegParams {
    pub vcodec: String,
    pub acodec: String,
    pub audio_channels: String,
    pub quality: String,
    pub format: String,
    pub preset: String,
    pub profile: String,
    pub framerate: String,
    pub resolution: String,
    pub multipass: bool,
    pub preset_name: String,
}

impl FfmpegParams {
    /// Two-pass only applies to bitrate mode; CRF requests ignore the multipass flag.
    pub fn is_two_pass(&self) -> bool {
        self.multipass && !self.quality.contains("-crf")
    }

    pub fn has_framerate(&self) -> bool {
        is_set(&self.framerate)
    }

    pub fn has_profile(&self) -> bool {
        is_set(&self.profile)
    }
}

/// Empty and the literal "auto" both mean "let ffmpeg decide".
fn is_set(value: &str) -> bool {
    !value.is_empty() && value != "auto"
}

fn map_video_encoder(encoder: &str) -> String {
    match encoder {
        "x265" => "libx265".to_string(),
        "x264" => "libx264".to_string(),
        other => other.to_string(),
    }
}

fn map_audio_codec(encoder: &str, bitrate: &str) -> String {
    if let Some(source) = encoder.strip_prefix("copy:") {
        log::debug!(
            target: "hb_conv::ffmpeg::params",
            "Audio passthrough requested (source codec hint '{}' not used)",
            source
        );
        return "-c:a copy".to_string();
    }
    format!("-c:a aac -b:a {}k", bitrate)
}

fn map_mixdown(mixdown: &str) -> &'static str {
    match mixdown {
        "5point1" => "-ac 6",
        "stereo" => "-ac 2",
        "mono" => "-ac 1",
        _ => "",
    }
}

fn map_container(container: &str) -> &'static str {
    match container {
        "av_mkv" => "mkv",
        "av_mp4" => "mp4",
        _ => DEFAULT_FORMAT,
    }
}

/// Translate preset settings into ffmpeg parameters. Unknown values fall back to defaults.
pub fn translate_settings(settings: &Settings) -> FfmpegParams {
    let quality = if settings.video_quality_type == QUALITY_TYPE_CRF {
        format!("-crf {}", settings.video_quality)
    } else {
        format!("-b:v {}k", settings.video_bitrate)
    };

    let params = FfmpegParams {
        vcodec: map_video_encoder(&settings.video_encoder),
        acodec: map_audio_codec(&settings.audio_encoder, &settings.audio_bitrate),
        audio_channels: map_mixdown(&settings.audio_mixdown).to_string(),
        quality,
        format: map_container(&settings.container).to_string(),
        preset: settings.video_preset.clone(),
        profile: settings.video_profile.clone(),
        framerate: settings.video_framerate.clone(),
        resolution: format!("{}x{}", settings.picture_width, settings.picture_height),
        multipass: settings.video_multipass,
        preset_name: settings.preset_name.clone(),
    };

    log::debug!(
        target: "hb_conv::ffmpeg::params",
        "Translated preset: vcodec={}, quality={}, format={}, two_pass={}",
        params.vcodec,
        params.quality,
        params.format,
        params.is_two_pass()
    );
    params
}
