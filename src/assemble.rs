// src/assemble.rs
//! VideoAssembler: merges per-scene image+audio pairs into one video in
//! scene order. The measured audio duration is authoritative for each
//! clip's displayed duration; the storyboard's suggested duration is not
//! consulted here.

use crate::error::{PipelineError, Result};
use crate::media::{MediaToolkit, SlideClip};
use crate::scenes::SceneAsset;
use crate::store::Workspace;
use std::path::PathBuf;
use std::sync::Arc;

pub const OUTPUT_FILE: &str = "video.mp4";

pub struct VideoAssembler {
    toolkit: Arc<dyn MediaToolkit>,
}

impl VideoAssembler {
    pub fn new(toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self { toolkit }
    }

    /// Assemble all scene assets into `video.mp4` inside the workspace.
    /// On success the consumed per-scene files are deleted, leaving only
    /// the final video.
    pub fn assemble(&self, assets: &[SceneAsset], workspace: &Workspace) -> Result<PathBuf> {
        if assets.is_empty() {
            return Err(PipelineError::Media("no scene assets to assemble".to_string()));
        }

        let mut clips = Vec::with_capacity(assets.len());
        for asset in assets {
            let duration = self.toolkit.probe_duration(&asset.audio_path)?;
            clips.push(SlideClip {
                image_path: asset.image_path.clone(),
                audio_path: asset.audio_path.clone(),
                duration_seconds: duration,
            });
        }

        let total: f64 = clips.iter().map(|c| c.duration_seconds).sum();
        tracing::info!(
            job_id = %workspace.job_id,
            "Assembling {} scenes into {:.2}s video",
            clips.len(),
            total
        );

        let output = workspace.path(OUTPUT_FILE);
        self.toolkit.encode_slideshow(&clips, &output)?;

        // The job has its video; per-scene files are no longer needed.
        workspace.cleanup_intermediates();

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AssetStore;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Records requested clip durations and writes a marker output file.
    struct FakeToolkit {
        durations: HashMap<String, f64>,
        encoded: Mutex<Vec<Vec<f64>>>,
    }

    impl FakeToolkit {
        fn new(durations: &[(&str, f64)]) -> Self {
            Self {
                durations: durations
                    .iter()
                    .map(|(name, d)| (name.to_string(), *d))
                    .collect(),
                encoded: Mutex::new(vec![]),
            }
        }
    }

    impl MediaToolkit for FakeToolkit {
        fn probe_duration(&self, path: &Path) -> Result<f64> {
            let name = path.file_name().unwrap().to_str().unwrap();
            self.durations
                .get(name)
                .copied()
                .ok_or_else(|| PipelineError::Media(format!("unreadable file: {}", name)))
        }

        fn extract_audio(&self, _: &Path, _: &Path) -> Result<()> {
            unimplemented!("not used by assembler")
        }

        fn replace_audio(&self, _: &Path, _: &Path, _: &Path) -> Result<()> {
            unimplemented!("not used by assembler")
        }

        fn encode_slideshow(&self, clips: &[SlideClip], video_out: &Path) -> Result<()> {
            self.encoded
                .lock()
                .unwrap()
                .push(clips.iter().map(|c| c.duration_seconds).collect());
            std::fs::write(video_out, b"encoded").unwrap();
            Ok(())
        }
    }

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path().join("outputs"), tmp.path().join("public"));
        let ws = store.workspace("video_test", "temp_videos").unwrap();
        (tmp, ws)
    }

    fn asset(ws: &Workspace, index: usize) -> SceneAsset {
        let image_path = ws.scene_image_path(index);
        let audio_path = ws.scene_audio_path(index);
        std::fs::write(&image_path, b"jpg").unwrap();
        std::fs::write(&audio_path, b"mp3").unwrap();
        SceneAsset {
            index,
            image_path,
            audio_path,
        }
    }

    #[tokio::test]
    async fn clip_durations_follow_measured_audio_in_scene_order() {
        let (_tmp, ws) = workspace();
        let assets: Vec<SceneAsset> = (1..=3).map(|i| asset(&ws, i)).collect();
        let toolkit = Arc::new(FakeToolkit::new(&[
            ("scene_1.mp3", 4.2),
            ("scene_2.mp3", 6.8),
            ("scene_3.mp3", 3.5),
        ]));

        let assembler = VideoAssembler::new(toolkit.clone());
        let output = assembler.assemble(&assets, &ws).unwrap();

        assert!(output.ends_with("video.mp4"));
        assert!(output.exists());

        let encoded = toolkit.encoded.lock().unwrap();
        assert_eq!(encoded.as_slice(), &[vec![4.2, 6.8, 3.5]]);
        let total: f64 = encoded[0].iter().sum();
        assert!((total - 14.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn consumed_scene_files_are_deleted_after_success() {
        let (_tmp, ws) = workspace();
        let assets = vec![asset(&ws, 1), asset(&ws, 2)];
        let toolkit = Arc::new(FakeToolkit::new(&[
            ("scene_1.mp3", 1.0),
            ("scene_2.mp3", 1.0),
        ]));

        VideoAssembler::new(toolkit).assemble(&assets, &ws).unwrap();

        for a in &assets {
            assert!(!a.image_path.exists());
            assert!(!a.audio_path.exists());
        }
        assert!(ws.path(OUTPUT_FILE).exists());
    }

    #[tokio::test]
    async fn unreadable_audio_fails_with_media_error() {
        let (_tmp, ws) = workspace();
        let assets = vec![asset(&ws, 1)];
        // No duration registered for scene_1.mp3.
        let toolkit = Arc::new(FakeToolkit::new(&[]));

        let err = VideoAssembler::new(toolkit)
            .assemble(&assets, &ws)
            .unwrap_err();
        assert_eq!(err.kind(), "media");
        // Inputs are retained when assembly fails.
        assert!(assets[0].image_path.exists());
    }

    #[tokio::test]
    async fn empty_asset_list_is_rejected() {
        let (_tmp, ws) = workspace();
        let toolkit = Arc::new(FakeToolkit::new(&[]));
        let err = VideoAssembler::new(toolkit).assemble(&[], &ws).unwrap_err();
        assert_eq!(err.kind(), "media");
    }
}
