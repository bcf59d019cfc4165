//! HandBrake preset document loading and flattening into [`Settings`].
//!
//! Only the first entry of `PresetList` and the first entry of its `AudioList` are read.
//! HandBrake writes several numeric keys either as JSON numbers or as strings depending on
//! the version that saved the preset; both forms normalise to the same decimal string.

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

/// A JSON scalar as found in preset files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    /// Decimal form for numeric fields. Integral values never carry a fractional part.
    fn to_decimal(&self) -> String {
        match self {
            Scalar::Number(n) => number_to_decimal(n),
            Scalar::Text(s) => s.trim().to_string(),
            Scalar::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Number(n) => number_to_decimal(n),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    fn to_flag(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Scalar::Text(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s == "1"
            }
        }
    }
}

fn number_to_decimal(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    // f64 Display prints integral values without ".0" and never uses exponent notation.
    n.as_f64().map(|f| f.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioTrack {
    #[serde(rename = "AudioEncoder")]
    pub encoder: Option<Scalar>,
    #[serde(rename = "AudioBitrate")]
    pub bitrate: Option<Scalar>,
    #[serde(rename = "AudioMixdown")]
    pub mixdown: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Preset {
    #[serde(rename = "PresetName")]
    pub name: Option<Scalar>,
    #[serde(rename = "VideoEncoder")]
    pub video_encoder: Option<Scalar>,
    #[serde(rename = "VideoAvgBitrate")]
    pub video_avg_bitrate: Option<Scalar>,
    #[serde(rename = "VideoPreset")]
    pub video_preset: Option<Scalar>,
    #[serde(rename = "VideoProfile")]
    pub video_profile: Option<Scalar>,
    #[serde(rename = "VideoFramerate")]
    pub video_framerate: Option<Scalar>,
    #[serde(rename = "VideoQualitySlider")]
    pub video_quality_slider: Option<Scalar>,
    #[serde(rename = "VideoQualityType")]
    pub video_quality_type: Option<Scalar>,
    #[serde(rename = "VideoMultiPass")]
    pub video_multi_pass: Option<Scalar>,
    #[serde(rename = "PictureWidth")]
    pub picture_width: Option<Scalar>,
    #[serde(rename = "PictureHeight")]
    pub picture_height: Option<Scalar>,
    #[serde(rename = "FileFormat")]
    pub file_format: Option<Scalar>,
    #[serde(rename = "AudioList")]
    pub audio_list: Option<Vec<AudioTrack>>,
}

/// Top level of a HandBrake preset export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresetDocument {
    #[serde(rename = "PresetList")]
    pub preset_list: Option<Vec<Preset>>,
}

impl PresetDocument {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Flat view of the first preset. Numeric values are kept as decimal strings so they are
/// concatenated into ffmpeg arguments exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub preset_name: String,
    pub video_encoder: String,
    pub video_bitrate: String,
    pub video_preset: String,
    pub video_profile: String,
    pub video_framerate: String,
    pub video_quality: String,
    pub video_quality_type: String,
    pub video_multipass: bool,
    pub picture_width: String,
    pub picture_height: String,
    pub audio_encoder: String,
    pub audio_bitrate: String,
    pub audio_mixdown: String,
    pub container: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preset_name: String::new(),
            video_encoder: String::new(),
            video_bitrate: "0".to_string(),
            video_preset: String::new(),
            video_profile: String::new(),
            video_framerate: String::new(),
            video_quality: "0".to_string(),
            video_quality_type: String::new(),
            video_multipass: false,
            picture_width: "0".to_string(),
            picture_height: "0".to_string(),
            audio_encoder: String::new(),
            audio_bitrate: "0".to_string(),
            audio_mixdown: String::new(),
            container: String::new(),
        }
    }
}

fn text_or(value: &Option<Scalar>, default: &str) -> String {
    value
        .as_ref()
        .map(Scalar::to_text)
        .unwrap_or_else(|| default.to_string())
}

fn decimal_or(value: &Option<Scalar>, default: &str) -> String {
    value
        .as_ref()
        .map(Scalar::to_decimal)
        .unwrap_or_else(|| default.to_string())
}

/// Read and parse a preset file. Both failures are fatal for the run.
pub fn load_preset_document(path: &Path) -> Result<PresetDocument, AppError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => AppError::PresetNotFound {
            path: path.to_path_buf(),
        },
        _ => AppError::Io(e),
    })?;
    log::debug!(
        target: "hb_conv::preset",
        "Loaded preset document: path={}, bytes={}",
        path.display(),
        text.len()
    );
    PresetDocument::from_json_str(&text).map_err(|source| AppError::PresetParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Flatten the first preset into [`Settings`]. Fails only when there is no preset at all.
pub fn extract_settings(document: &PresetDocument) -> Result<Settings, AppError> {
    let preset = document
        .preset_list
        .as_deref()
        .and_then(|presets| presets.first())
        .ok_or(AppError::EmptyPresetList)?;
    let presets_total = document.preset_list.as_ref().map_or(0, Vec::len);
    if presets_total > 1 {
        log::debug!(
            target: "hb_conv::preset",
            "Document holds {} presets; using the first",
            presets_total
        );
    }

    let audio = preset
        .audio_list
        .as_deref()
        .and_then(|tracks| tracks.first())
        .cloned()
        .unwrap_or_default();

    let defaults = Settings::default();
    let settings = Settings {
        preset_name: text_or(&preset.name, &defaults.preset_name),
        video_encoder: text_or(&preset.video_encoder, &defaults.video_encoder),
        video_bitrate: decimal_or(&preset.video_avg_bitrate, &defaults.video_bitrate),
        video_preset: text_or(&preset.video_preset, &defaults.video_preset),
        video_profile: text_or(&preset.video_profile, &defaults.video_profile),
        video_framerate: decimal_or(&preset.video_framerate, &defaults.video_framerate),
        video_quality: decimal_or(&preset.video_quality_slider, &defaults.video_quality),
        video_quality_type: decimal_or(
            &preset.video_quality_type,
            &defaults.video_quality_type,
        ),
        video_multipass: preset
            .video_multi_pass
            .as_ref()
            .is_some_and(Scalar::to_flag),
        picture_width: decimal_or(&preset.picture_width, &defaults.picture_width),
        picture_height: decimal_or(&preset.picture_height, &defaults.picture_height),
        audio_encoder: text_or(&audio.encoder, &defaults.audio_encoder),
        audio_bitrate: decimal_or(&audio.bitrate, &defaults.audio_bitrate),
        audio_mixdown: text_or(&audio.mixdown, &defaults.audio_mixdown),
        container: text_or(&preset.file_format, &defaults.container),
    };

    log::debug!(
        target: "hb_conv::preset",
        "Extracted preset settings: name={}, encoder={}, container={}",
        settings.preset_name,
        settings.video_encoder,
        settings.container
    );
    Ok(settings)
}
