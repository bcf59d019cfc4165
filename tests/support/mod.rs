#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use hb_conv_core::console::{Console, MemorySink};
use hb_conv_core::error::AppError;
use hb_conv_core::ffmpeg::{MediaTools, null_device};

/// x265 CRF into Matroska, stereo AAC.
pub const CRF_MKV_PRESET: &str = r#"{
  "PresetList": [{
    "PresetName": "Test x265 MKV",
    "VideoEncoder": "x265",
    "VideoQualityType": 2,
    "VideoQualitySlider": 20,
    "VideoPreset": "slow",
    "VideoFramerate": "auto",
    "PictureWidth": 1920,
    "PictureHeight": 1080,
    "FileFormat": "av_mkv",
    "AudioList": [{ "AudioEncoder": "av_aac", "AudioBitrate": 160, "AudioMixdown": "stereo" }]
  }]
}"#;

/// x264 average bitrate, two-pass, MP4.
pub const TWO_PASS_MP4_PRESET: &str = r#"{
  "PresetList": [{
    "PresetName": "Test x264 2-pass",
    "VideoEncoder": "x264",
    "VideoQualityType": 1,
    "VideoAvgBitrate": 2500,
    "VideoMultiPass": true,
    "VideoPreset": "medium",
    "VideoProfile": "high",
    "PictureWidth": 1280,
    "PictureHeight": 720,
    "FileFormat": "av_mp4",
    "AudioList": [{ "AudioEncoder": "av_aac", "AudioBitrate": 128, "AudioMixdown": "5point1" }]
  }]
}"#;

/// Recording stand-in for ffmpeg/ffprobe.
///
/// Each ffmpeg call is recorded. Successful calls create the output file (the last argument)
/// unless it is the null device, so rename behaviour can be observed on disk.
#[derive(Default)]
pub struct FakeTools {
    pub calls: Mutex<Vec<Vec<String>>>,
    pub probes: Mutex<Vec<PathBuf>>,
    /// Fail the n-th ffmpeg call (0-based) with the given exit code.
    pub fail_at: Option<(usize, i32)>,
    /// Report success without writing the output file.
    pub skip_output: bool,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(call: usize, code: i32) -> Self {
        Self {
            fail_at: Some((call, code)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    pub fn probed(&self) -> Vec<PathBuf> {
        self.probes.lock().clone()
    }
}

impl MediaTools for FakeTools {
    fn run_ffmpeg(&self, args: &[String]) -> Result<(), AppError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(args.to_vec());
            calls.len() - 1
        };
        if let Some((fail_index, code)) = self.fail_at {
            if fail_index == index {
                return Err(AppError::ffmpeg_failed(code));
            }
        }
        if let Some(output) = args.last() {
            if !self.skip_output && output != null_device() {
                fs::write(output, b"encoded").expect("fake ffmpeg writes output");
            }
        }
        Ok(())
    }

    fn probe(&self, input: &Path) -> Result<Vec<u8>, AppError> {
        self.probes.lock().push(input.to_path_buf());
        Ok(format!("[FORMAT]\nfilename={}\n[/FORMAT]\n", input.display()).into_bytes())
    }
}

pub fn memory_console() -> (Console, MemorySink) {
    let sink = MemorySink::new();
    (Console::from_writer(sink.clone()), sink)
}

pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, b"").expect("write file");
}

pub fn write_preset(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("preset.json");
    fs::write(&path, json).expect("write preset");
    path
}

/// Every file below `root`, relative and sorted.
pub fn list_tree(root: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).expect("under root").to_path_buf())
        .collect();
    out.sort();
    out
}
