// src/store.rs
//! AssetStore: job-scoped working directories and their public mirror.
//! Every artifact a job produces lives in two places, a working copy under
//! the work dir and a published copy under the public dir. The published
//! copy is created with a temp-write-then-rename so a partially copied
//! file is never visible at the advertised path.

use crate::error::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AssetStore {
    work_dir: PathBuf,
    public_dir: PathBuf,
}

/// Handle to one job's directories. Owned exclusively by that job.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub job_id: String,
    dir: PathBuf,
    public_dir: PathBuf,
    url_prefix: String,
}

impl AssetStore {
    pub fn new(work_dir: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            public_dir: public_dir.into(),
        }
    }

    /// Idempotently create the working directory and public mirror for a
    /// job. `public_prefix` is the URL segment the job publishes under
    /// (e.g. "temp_videos").
    pub fn workspace(&self, job_id: &str, public_prefix: &str) -> Result<Workspace> {
        let dir = self.work_dir.join(job_id);
        let public_dir = self.public_dir.join(public_prefix).join(job_id);

        for d in [&dir, &public_dir] {
            fs::create_dir_all(d).map_err(|e| {
                PipelineError::Storage(format!(
                    "failed to create directory {}: {}",
                    d.display(),
                    e
                ))
            })?;
        }

        Ok(Workspace {
            job_id: job_id.to_string(),
            dir,
            public_dir,
            url_prefix: format!("/{}/{}", public_prefix, job_id),
        })
    }
}

impl Workspace {
    /// Path of a file inside the working directory.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn scene_image_path(&self, index: usize) -> PathBuf {
        self.path(&format!("scene_{}.jpg", index))
    }

    pub fn scene_audio_path(&self, index: usize) -> PathBuf {
        self.path(&format!("scene_{}.mp3", index))
    }

    /// Copy a finished working file into the public mirror and return its
    /// public URL. The copy lands under a temporary name first and is
    /// renamed into place, so the public path is either absent or
    /// byte-identical to the source.
    pub fn publish(&self, file_name: &str) -> Result<String> {
        let source = self.path(file_name);
        if !source.exists() {
            return Err(PipelineError::Storage(format!(
                "cannot publish missing artifact: {}",
                source.display()
            )));
        }

        let target = self.public_dir.join(file_name);
        let staging = self
            .public_dir
            .join(format!(".{}.partial-{}", file_name, uuid::Uuid::new_v4()));

        fs::copy(&source, &staging).map_err(|e| {
            fs::remove_file(&staging).ok();
            PipelineError::Storage(format!(
                "failed to stage {} for publishing: {}",
                source.display(),
                e
            ))
        })?;

        fs::rename(&staging, &target).map_err(|e| {
            fs::remove_file(&staging).ok();
            PipelineError::Storage(format!(
                "failed to publish {}: {}",
                target.display(),
                e
            ))
        })?;

        tracing::info!(job_id = %self.job_id, "Published artifact: {}", target.display());
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    /// Remove per-scene intermediates after a successful assembly. The job
    /// has already succeeded at this point, so failures are logged only.
    pub fn cleanup_intermediates(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(job_id = %self.job_id, "Cleanup skipped, cannot read workspace: {}", e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let is_scene_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("scene_"))
                .unwrap_or(false);
            if is_scene_file {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!(job_id = %self.job_id, "Failed to remove {}: {}", path.display(), e);
                } else {
                    tracing::debug!(job_id = %self.job_id, "Removed intermediate: {}", path.display());
                }
            }
        }
    }

    /// Delete a file inside the workspace, logging instead of failing.
    pub fn remove_file(&self, file_name: &str) {
        let path = self.path(file_name);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(job_id = %self.job_id, "Failed to remove {}: {}", path.display(), e);
            }
        }
    }

    #[cfg(test)]
    pub fn public_path(&self, file_name: &str) -> PathBuf {
        self.public_dir.join(file_name)
    }
}

/// Remove a file outside any workspace (the raw upload). Logged, not fatal:
/// by the time this runs the job outcome is already decided.
pub fn remove_upload(path: &Path) {
    if path.exists() {
        match fs::remove_file(path) {
            Ok(()) => tracing::info!("Removed temporary upload: {}", path.display()),
            Err(e) => tracing::warn!("Failed to remove upload {}: {}", path.display(), e),
        }
    }
}
