// src/scenes.rs
//! SceneAssetGenerator: per-scene image and narration audio, written to
//! scene-indexed paths under the job workspace. Scene generations run with
//! bounded concurrency against the upstream services; within one scene the
//! image and audio calls are independent and run joined.

use crate::error::Result;
use crate::story::Scene;
use crate::store::Workspace;
use crate::translate_client::validate_target_language;
use crate::upstream::{ImageSynthesis, SpeechRequest, SpeechSynthesis, Translation};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::PathBuf;
use std::sync::Arc;

/// The generated pair for one scene. Exists only while the owning job is
/// between generation and assembly.
#[derive(Debug, Clone)]
pub struct SceneAsset {
    pub index: usize,
    pub image_path: PathBuf,
    pub audio_path: PathBuf,
}

pub struct SceneAssetGenerator {
    images: Arc<dyn ImageSynthesis>,
    speech: Arc<dyn SpeechSynthesis>,
    translator: Arc<dyn Translation>,
    concurrency: usize,
}

impl SceneAssetGenerator {
    pub fn new(
        images: Arc<dyn ImageSynthesis>,
        speech: Arc<dyn SpeechSynthesis>,
        translator: Arc<dyn Translation>,
        concurrency: usize,
    ) -> Self {
        Self {
            images,
            speech,
            translator,
            concurrency: concurrency.max(1),
        }
    }

    /// Generate assets for every scene, in scene order, aborting on the
    /// first failure. A partial set of assets is never returned.
    pub async fn generate_all(
        &self,
        scenes: &[Scene],
        workspace: &Workspace,
        target_language: Option<&str>,
    ) -> Result<Vec<SceneAsset>> {
        let narration_language = match target_language {
            Some(lang) if lang != "en" => {
                validate_target_language(lang)?;
                Some(lang)
            }
            _ => None,
        };

        let generations: Vec<_> = scenes
            .iter()
            .map(|scene| self.generate(scene, workspace, narration_language))
            .collect();
        stream::iter(generations)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn generate(
        &self,
        scene: &Scene,
        workspace: &Workspace,
        narration_language: Option<&str>,
    ) -> Result<SceneAsset> {
        tracing::info!(job_id = %workspace.job_id, "Generating assets for scene {}", scene.index);

        // Narration is translated before synthesis when the job targets a
        // non-default language.
        let (narration, language) = match narration_language {
            Some(lang) => {
                let translated = self.translator.translate(&scene.narration, lang).await?;
                (translated, Some(lang.to_string()))
            }
            None => (scene.narration.clone(), None),
        };

        let mut speech_request = SpeechRequest::new(narration);
        if let Some(lang) = language {
            speech_request = speech_request.with_language(lang);
        }

        let (image, audio) = tokio::join!(
            self.images.generate_image(&scene.image_prompt),
            self.speech.synthesize(&speech_request),
        );
        let (image, audio) = (image?, audio?);

        let image_path = workspace.scene_image_path(scene.index);
        let audio_path = workspace.scene_audio_path(scene.index);

        tokio::fs::write(&image_path, &image)
            .await
            .map_err(|e| crate::error::PipelineError::Storage(format!(
                "failed to write {}: {}",
                image_path.display(),
                e
            )))?;
        tokio::fs::write(&audio_path, &audio)
            .await
            .map_err(|e| crate::error::PipelineError::Storage(format!(
                "failed to write {}: {}",
                audio_path.display(),
                e
            )))?;

        Ok(SceneAsset {
            index: scene.index,
            image_path,
            audio_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::store::AssetStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn scene(index: usize) -> Scene {
        Scene {
            index,
            title: format!("Scene {}", index),
            description: "desc".to_string(),
            image_prompt: format!("image prompt {}", index),
            narration: format!("narration {}", index),
            background_music: "ambient".to_string(),
            duration_seconds: 5.0,
            transition: "cut".to_string(),
        }
    }

    struct FakeImages {
        calls: AtomicUsize,
        fail_on_prompt: Option<String>,
    }

    #[async_trait]
    impl ImageSynthesis for FakeImages {
        async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_prompt.as_deref() == Some(prompt) {
                return Err(PipelineError::Upstream("image API down".into()));
            }
            Ok(format!("jpg:{}", prompt).into_bytes())
        }
    }

    struct FakeSpeech {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechSynthesis for FakeSpeech {
        async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
            self.texts.lock().unwrap().push(request.text.clone());
            Ok(format!("mp3:{}", request.text).into_bytes())
        }
    }

    struct FakeTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translation for FakeTranslator {
        async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("[{}] {}", target_lang, text))
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        workspace: Workspace,
        images: Arc<FakeImages>,
        speech: Arc<FakeSpeech>,
        translator: Arc<FakeTranslator>,
        generator: SceneAssetGenerator,
    }

    fn fixture(fail_on_prompt: Option<&str>) -> Fixture {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path().join("outputs"), tmp.path().join("public"));
        let workspace = store.workspace("video_test", "temp_videos").unwrap();

        let images = Arc::new(FakeImages {
            calls: AtomicUsize::new(0),
            fail_on_prompt: fail_on_prompt.map(String::from),
        });
        let speech = Arc::new(FakeSpeech {
            texts: Mutex::new(vec![]),
        });
        let translator = Arc::new(FakeTranslator {
            calls: AtomicUsize::new(0),
        });
        let generator = SceneAssetGenerator::new(
            images.clone(),
            speech.clone(),
            translator.clone(),
            2,
        );
        Fixture {
            _tmp: tmp,
            workspace,
            images,
            speech,
            translator,
            generator,
        }
    }

    #[tokio::test]
    async fn generates_one_asset_pair_per_scene_in_order() {
        let f = fixture(None);
        let scenes: Vec<Scene> = (1..=3).map(scene).collect();

        let assets = f
            .generator
            .generate_all(&scenes, &f.workspace, None)
            .await
            .unwrap();

        assert_eq!(assets.len(), 3);
        for (i, asset) in assets.iter().enumerate() {
            assert_eq!(asset.index, i + 1);
            assert!(asset.image_path.ends_with(format!("scene_{}.jpg", i + 1)));
            assert!(asset.audio_path.ends_with(format!("scene_{}.mp3", i + 1)));
            assert!(asset.image_path.exists());
            assert!(asset.audio_path.exists());
        }
        assert_eq!(f.images.calls.load(Ordering::SeqCst), 3);
        assert_eq!(f.translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn narration_is_translated_for_non_default_language() {
        let f = fixture(None);
        let scenes = vec![scene(1), scene(2)];

        f.generator
            .generate_all(&scenes, &f.workspace, Some("es"))
            .await
            .unwrap();

        assert_eq!(f.translator.calls.load(Ordering::SeqCst), 2);
        let texts = f.speech.texts.lock().unwrap();
        assert!(texts.iter().all(|t| t.starts_with("[es] ")));
    }

    #[tokio::test]
    async fn english_jobs_skip_translation() {
        let f = fixture(None);
        f.generator
            .generate_all(&[scene(1)], &f.workspace, Some("en"))
            .await
            .unwrap();
        assert_eq!(f.translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_language_fails_before_any_upstream_call() {
        let f = fixture(None);
        let err = f
            .generator
            .generate_all(&[scene(1)], &f.workspace, Some("xx"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(f.images.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn any_scene_failure_aborts_the_job() {
        let f = fixture(Some("image prompt 2"));
        let scenes: Vec<Scene> = (1..=3).map(scene).collect();

        let err = f
            .generator
            .generate_all(&scenes, &f.workspace, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream");
    }
}
