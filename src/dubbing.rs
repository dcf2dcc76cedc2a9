// src/dubbing.rs
//! DubbingPipeline: fixed stage sequence that replaces an uploaded video's
//! audio track with a translated, re-synthesized one.
//!
//! Uploaded -> AudioExtracted -> Transcribed -> Translated ->
//! AudioSynthesized -> Remuxed -> Published
//!
//! No stage is retried here; any failure is terminal for the job. The
//! uploaded source file is removed whether the job succeeds or fails.

use crate::error::Result;
use crate::media::MediaToolkit;
use crate::store::{self, Workspace};
use crate::translate_client::validate_target_language;
use crate::upstream::{SpeechRequest, SpeechSynthesis, Transcription, Translation};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub const ORIGINAL_AUDIO: &str = "original_audio.mp3";
pub const TRANSLATED_AUDIO: &str = "translated_audio.mp3";
pub const OUTPUT_VIDEO: &str = "translated_video.mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DubbingStage {
    Uploaded,
    AudioExtracted,
    Transcribed,
    Translated,
    AudioSynthesized,
    Remuxed,
    Published,
}

/// Public URLs of a finished dubbing job.
#[derive(Debug, Clone, Serialize)]
pub struct DubbingArtifacts {
    pub video_url: String,
    pub original_audio_url: String,
    pub translated_audio_url: String,
}

pub struct DubbingPipeline {
    transcriber: Arc<dyn Transcription>,
    translator: Arc<dyn Translation>,
    speech: Arc<dyn SpeechSynthesis>,
    toolkit: Arc<dyn MediaToolkit>,
}

impl DubbingPipeline {
    pub fn new(
        transcriber: Arc<dyn Transcription>,
        translator: Arc<dyn Translation>,
        speech: Arc<dyn SpeechSynthesis>,
        toolkit: Arc<dyn MediaToolkit>,
    ) -> Self {
        Self {
            transcriber,
            translator,
            speech,
            toolkit,
        }
    }

    /// Run the full dubbing sequence for an uploaded video. The upload is
    /// deleted on return regardless of outcome, so failed jobs cannot
    /// accumulate temp storage.
    pub async fn run(
        &self,
        upload: &Path,
        target_language: &str,
        workspace: &Workspace,
    ) -> Result<DubbingArtifacts> {
        let result = self.run_stages(upload, target_language, workspace).await;
        store::remove_upload(upload);
        result
    }

    async fn run_stages(
        &self,
        upload: &Path,
        target_language: &str,
        workspace: &Workspace,
    ) -> Result<DubbingArtifacts> {
        // Gate on the language table before touching any upstream service.
        validate_target_language(target_language)?;
        self.enter(workspace, DubbingStage::Uploaded);

        let original_audio = workspace.path(ORIGINAL_AUDIO);
        self.toolkit.extract_audio(upload, &original_audio)?;
        self.enter(workspace, DubbingStage::AudioExtracted);

        let audio_bytes = tokio::fs::read(&original_audio).await.map_err(|e| {
            crate::error::PipelineError::Storage(format!(
                "failed to read extracted audio: {}",
                e
            ))
        })?;
        let transcript = self
            .transcriber
            .transcribe(audio_bytes, ORIGINAL_AUDIO)
            .await?;
        self.enter(workspace, DubbingStage::Transcribed);

        let translated_text = self.translator.translate(&transcript, target_language).await?;
        self.enter(workspace, DubbingStage::Translated);

        let speech_request =
            SpeechRequest::new(translated_text).with_language(target_language);
        let translated_bytes = self.speech.synthesize(&speech_request).await?;
        let translated_audio = workspace.path(TRANSLATED_AUDIO);
        tokio::fs::write(&translated_audio, &translated_bytes)
            .await
            .map_err(|e| {
                crate::error::PipelineError::Storage(format!(
                    "failed to write translated audio: {}",
                    e
                ))
            })?;
        self.enter(workspace, DubbingStage::AudioSynthesized);

        // Video stream is copied unchanged; output trims to the shorter of
        // the two streams.
        let output_video = workspace.path(OUTPUT_VIDEO);
        self.toolkit
            .replace_audio(upload, &translated_audio, &output_video)?;
        self.enter(workspace, DubbingStage::Remuxed);

        let artifacts = DubbingArtifacts {
            video_url: workspace.publish(OUTPUT_VIDEO)?,
            original_audio_url: workspace.publish(ORIGINAL_AUDIO)?,
            translated_audio_url: workspace.publish(TRANSLATED_AUDIO)?,
        };
        self.enter(workspace, DubbingStage::Published);

        Ok(artifacts)
    }

    fn enter(&self, workspace: &Workspace, stage: DubbingStage) {
        tracing::info!(job_id = %workspace.job_id, stage = ?stage, "Dubbing stage reached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::media::SlideClip;
    use crate::store::AssetStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Counters {
        transcribe: AtomicUsize,
        translate: AtomicUsize,
        synthesize: AtomicUsize,
        extract: AtomicUsize,
        remux: AtomicUsize,
    }

    struct FakeStack {
        counters: Counters,
        order: Mutex<Vec<&'static str>>,
        fail_transcription: bool,
    }

    impl FakeStack {
        fn new(fail_transcription: bool) -> Arc<Self> {
            Arc::new(Self {
                counters: Counters::default(),
                order: Mutex::new(vec![]),
                fail_transcription,
            })
        }
    }

    struct FakeTranscriber(Arc<FakeStack>);
    struct FakeTranslator(Arc<FakeStack>);
    struct FakeSpeech(Arc<FakeStack>);
    struct FakeToolkit(Arc<FakeStack>);

    #[async_trait]
    impl Transcription for FakeTranscriber {
        async fn transcribe(&self, _audio: Vec<u8>, _file_name: &str) -> Result<String> {
            self.0.counters.transcribe.fetch_add(1, Ordering::SeqCst);
            self.0.order.lock().unwrap().push("transcribe");
            if self.0.fail_transcription {
                return Err(PipelineError::Upstream("whisper unavailable".into()));
            }
            Ok("hello world".to_string())
        }
    }

    #[async_trait]
    impl Translation for FakeTranslator {
        async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
            self.0.counters.translate.fetch_add(1, Ordering::SeqCst);
            self.0.order.lock().unwrap().push("translate");
            Ok(format!("[{}] {}", target_lang, text))
        }
    }

    #[async_trait]
    impl SpeechSynthesis for FakeSpeech {
        async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
            self.0.counters.synthesize.fetch_add(1, Ordering::SeqCst);
            self.0.order.lock().unwrap().push("synthesize");
            assert_eq!(request.language.as_deref(), Some("es"));
            Ok(format!("mp3:{}", request.text).into_bytes())
        }
    }

    impl MediaToolkit for FakeToolkit {
        fn probe_duration(&self, _: &std::path::Path) -> Result<f64> {
            Ok(10.0)
        }

        fn extract_audio(&self, video: &std::path::Path, audio_out: &std::path::Path) -> Result<()> {
            self.0.counters.extract.fetch_add(1, Ordering::SeqCst);
            self.0.order.lock().unwrap().push("extract");
            let source = std::fs::read(video).unwrap();
            std::fs::write(audio_out, [b"audio-of:", source.as_slice()].concat()).unwrap();
            Ok(())
        }

        fn replace_audio(
            &self,
            video: &std::path::Path,
            audio: &std::path::Path,
            video_out: &std::path::Path,
        ) -> Result<()> {
            self.0.counters.remux.fetch_add(1, Ordering::SeqCst);
            self.0.order.lock().unwrap().push("remux");
            let v = std::fs::read(video).unwrap();
            let a = std::fs::read(audio).unwrap();
            std::fs::write(video_out, [v, a].concat()).unwrap();
            Ok(())
        }

        fn encode_slideshow(&self, _: &[SlideClip], _: &std::path::Path) -> Result<()> {
            unimplemented!("not used by dubbing")
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        workspace: Workspace,
        upload: std::path::PathBuf,
        stack: Arc<FakeStack>,
        pipeline: DubbingPipeline,
    }

    fn fixture(fail_transcription: bool) -> Fixture {
        let tmp = tempdir().unwrap();
        let store = AssetStore::new(tmp.path().join("outputs"), tmp.path().join("public"));
        let workspace = store
            .workspace("translation_test", "temp_translations")
            .unwrap();

        let upload = tmp.path().join("upload.mp4");
        std::fs::write(&upload, b"raw video bytes").unwrap();

        let stack = FakeStack::new(fail_transcription);
        let pipeline = DubbingPipeline::new(
            Arc::new(FakeTranscriber(stack.clone())),
            Arc::new(FakeTranslator(stack.clone())),
            Arc::new(FakeSpeech(stack.clone())),
            Arc::new(FakeToolkit(stack.clone())),
        );

        Fixture {
            _tmp: tmp,
            workspace,
            upload,
            stack,
            pipeline,
        }
    }

    #[tokio::test]
    async fn runs_stages_in_order_and_publishes_three_artifacts() {
        let f = fixture(false);

        let artifacts = f
            .pipeline
            .run(&f.upload, "es", &f.workspace)
            .await
            .unwrap();

        assert_eq!(
            f.stack.order.lock().unwrap().as_slice(),
            &["extract", "transcribe", "translate", "synthesize", "remux"]
        );
        assert_eq!(
            artifacts.video_url,
            "/temp_translations/translation_test/translated_video.mp4"
        );
        assert_eq!(
            artifacts.original_audio_url,
            "/temp_translations/translation_test/original_audio.mp3"
        );
        assert_eq!(
            artifacts.translated_audio_url,
            "/temp_translations/translation_test/translated_audio.mp3"
        );

        // Published copies are byte-identical to the working copies that
        // produced them.
        let working = std::fs::read(f.workspace.path(OUTPUT_VIDEO)).unwrap();
        let published = std::fs::read(f.workspace.public_path(OUTPUT_VIDEO)).unwrap();
        assert_eq!(working, published);

        // Upload removed after success.
        assert!(!f.upload.exists());
    }

    #[tokio::test]
    async fn unsupported_language_fails_before_any_external_call() {
        let f = fixture(false);

        let err = f
            .pipeline
            .run(&f.upload, "xx", &f.workspace)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "validation");
        assert_eq!(f.stack.counters.extract.load(Ordering::SeqCst), 0);
        assert_eq!(f.stack.counters.transcribe.load(Ordering::SeqCst), 0);
        assert_eq!(f.stack.counters.translate.load(Ordering::SeqCst), 0);
        assert_eq!(f.stack.counters.synthesize.load(Ordering::SeqCst), 0);
        assert_eq!(f.stack.counters.remux.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upload_is_removed_even_when_a_stage_fails() {
        let f = fixture(true);

        let err = f
            .pipeline
            .run(&f.upload, "es", &f.workspace)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "upstream");
        assert!(!f.upload.exists());
        // Nothing reached the public mirror.
        assert!(!f.workspace.public_path(OUTPUT_VIDEO).exists());
        assert!(!f.workspace.public_path(TRANSLATED_AUDIO).exists());
    }
}
