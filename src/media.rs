// src/media.rs
//! Local media operations behind a narrow trait. The real implementation
//! shells out to ffmpeg/ffprobe; tests substitute a fake toolkit.

use crate::error::{PipelineError, Result};
use serde_json::Value;
use std::path::Path;
use std::process::Command;

/// One visual clip of the assembled video: a still image shown for the
/// measured duration of its narration track.
#[derive(Debug, Clone)]
pub struct SlideClip {
    pub image_path: std::path::PathBuf,
    pub audio_path: std::path::PathBuf,
    /// Measured audio duration in seconds; drives the displayed duration.
    pub duration_seconds: f64,
}

/// Mux/demux/encode capability consumed by VideoAssembler and
/// DubbingPipeline.
pub trait MediaToolkit: Send + Sync {
    /// Measured duration of an audio or video file, in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Demux the audio track of a video into a standalone audio file.
    fn extract_audio(&self, video: &Path, audio_out: &Path) -> Result<()>;

    /// Replace a video's audio track, copying the video stream unchanged
    /// and trimming to the shorter of the two streams.
    fn replace_audio(&self, video: &Path, audio: &Path, video_out: &Path) -> Result<()>;

    /// Encode an ordered sequence of image+audio clips into one video at
    /// 1920x1080 / 30fps, H.264 + AAC.
    fn encode_slideshow(&self, clips: &[SlideClip], video_out: &Path) -> Result<()>;
}

/// ffmpeg/ffprobe subprocess implementation.
pub struct FfmpegToolkit;

pub const OUTPUT_WIDTH: u32 = 1920;
pub const OUTPUT_HEIGHT: u32 = 1080;
pub const OUTPUT_FPS: u32 = 30;

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self
    }

    /// Check that ffmpeg and ffprobe are on PATH.
    pub fn check_available() -> Result<()> {
        for tool in ["ffmpeg", "ffprobe"] {
            Command::new(tool)
                .arg("-version")
                .output()
                .map_err(|_| PipelineError::Media(format!("{} not found on PATH", tool)))?;
        }
        Ok(())
    }
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaToolkit for FfmpegToolkit {
    fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = run_ffprobe(&[
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            path_str(path)?,
        ])?;
        parse_probe_duration(&output)
    }

    fn extract_audio(&self, video: &Path, audio_out: &Path) -> Result<()> {
        // Confirm the input actually carries an audio stream before
        // invoking the demux, so a silent video fails with a clear error.
        let probe = run_ffprobe(&[
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            path_str(video)?,
        ])?;
        if !has_audio_stream(&probe)? {
            return Err(PipelineError::Media(format!(
                "input video has no audio track: {}",
                video.display()
            )));
        }

        let mut command = Command::new("ffmpeg");
        command
            .arg("-i")
            .arg(video)
            .args(["-q:a", "0", "-map", "a", "-y"])
            .arg(audio_out);
        run_ffmpeg(command)
    }

    fn replace_audio(&self, video: &Path, audio: &Path, video_out: &Path) -> Result<()> {
        let mut command = Command::new("ffmpeg");
        command
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "copy", "-map", "0:v:0", "-map", "1:a:0", "-shortest", "-y"])
            .arg(video_out);
        run_ffmpeg(command)
    }

    fn encode_slideshow(&self, clips: &[SlideClip], video_out: &Path) -> Result<()> {
        if clips.is_empty() {
            return Err(PipelineError::Media("no clips to assemble".to_string()));
        }

        let out_dir = video_out
            .parent()
            .ok_or_else(|| PipelineError::Media("output path has no parent".to_string()))?;

        // One H.264 segment per scene, then a lossless concat. ffmpeg's
        // concat demuxer requires identical codecs, which the fixed
        // segment encode guarantees.
        let mut segment_paths = Vec::with_capacity(clips.len());
        for (i, clip) in clips.iter().enumerate() {
            for input in [&clip.image_path, &clip.audio_path] {
                if !input.exists() {
                    return Err(PipelineError::Media(format!(
                        "missing scene input: {}",
                        input.display()
                    )));
                }
            }

            let segment_path = out_dir.join(format!("segment_{}.mp4", i + 1));
            let mut command = Command::new("ffmpeg");
            command
                .args(["-loop", "1"])
                .arg("-i")
                .arg(&clip.image_path)
                .arg("-i")
                .arg(&clip.audio_path)
                .args(["-t", &format!("{:.3}", clip.duration_seconds)])
                .args([
                    "-vf",
                    &format!(
                        "scale={}:{}:force_original_aspect_ratio=decrease,\
                         pad={}:{}:(ow-iw)/2:(oh-ih)/2",
                        OUTPUT_WIDTH, OUTPUT_HEIGHT, OUTPUT_WIDTH, OUTPUT_HEIGHT
                    ),
                ])
                .args(["-r", &OUTPUT_FPS.to_string()])
                .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
                .args(["-c:a", "aac", "-shortest", "-y"])
                .arg(&segment_path);
            run_ffmpeg(command)?;
            segment_paths.push(segment_path);
        }

        let concat_list = segment_paths
            .iter()
            .map(|p| Ok(format!("file '{}'", path_str(p)?)))
            .collect::<Result<Vec<_>>>()?
            .join("\n");
        let concat_file = out_dir.join("concat.txt");
        std::fs::write(&concat_file, concat_list)
            .map_err(|e| PipelineError::Media(format!("failed to write concat list: {}", e)))?;

        let mut command = Command::new("ffmpeg");
        command
            .args(["-f", "concat", "-safe", "0"])
            .arg("-i")
            .arg(&concat_file)
            .args(["-c", "copy", "-y"])
            .arg(video_out);
        let result = run_ffmpeg(command);

        std::fs::remove_file(&concat_file).ok();
        for segment in segment_paths {
            std::fs::remove_file(segment).ok();
        }
        result
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| PipelineError::Media(format!("non-UTF8 path: {}", path.display())))
}

fn run_ffmpeg(mut command: Command) -> Result<()> {
    tracing::debug!("Executing ffmpeg: {:?}", command);
    let output = command
        .output()
        .map_err(|e| PipelineError::Media(format!("failed to execute ffmpeg: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Media(format!("ffmpeg error: {}", stderr)));
    }
    Ok(())
}

fn run_ffprobe(args: &[&str]) -> Result<String> {
    let output = Command::new("ffprobe")
        .args(args)
        .output()
        .map_err(|e| PipelineError::Media(format!("failed to execute ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Media(format!("ffprobe error: {}", stderr)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Pull the container duration out of ffprobe's JSON output.
fn parse_probe_duration(probe_json: &str) -> Result<f64> {
    let json: Value = serde_json::from_str(probe_json)
        .map_err(|e| PipelineError::Media(format!("failed to parse ffprobe output: {}", e)))?;

    json["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .ok_or_else(|| PipelineError::Media("ffprobe reported no duration".to_string()))
}

fn has_audio_stream(probe_json: &str) -> Result<bool> {
    let json: Value = serde_json::from_str(probe_json)
        .map_err(|e| PipelineError::Media(format!("failed to parse ffprobe output: {}", e)))?;

    Ok(json["streams"]
        .as_array()
        .map(|streams| streams.iter().any(|s| s["codec_type"] == "audio"))
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_from_probe_output() {
        let probe = r#"{"format": {"duration": "12.482000", "format_name": "mp3"}}"#;
        let duration = parse_probe_duration(probe).unwrap();
        assert!((duration - 12.482).abs() < 1e-9);
    }

    #[test]
    fn rejects_probe_output_without_duration() {
        assert!(parse_probe_duration(r#"{"format": {}}"#).is_err());
        assert!(parse_probe_duration("not json").is_err());
    }

    #[test]
    fn detects_audio_streams() {
        let with_audio = r#"{"streams": [{"codec_type": "video"}, {"codec_type": "audio"}]}"#;
        let video_only = r#"{"streams": [{"codec_type": "video"}]}"#;
        assert!(has_audio_stream(with_audio).unwrap());
        assert!(!has_audio_stream(video_only).unwrap());
    }
}
