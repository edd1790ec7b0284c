pub mod builder;

use std::{
    fs::{read_dir, remove_dir_all, remove_file},
    path::{Path, PathBuf},
};

use reel_datastore::{JobStore, Stage};

use crate::{
    assembly::{AssemblyEngine, VideoEncoder},
    config::PipelineConfig,
    error::{AssemblyError, PipelineError},
    github::{RepoUrl, RepositoryIngestor},
    llm::prompt::PromptBuilder,
    narration::{Narration, NarrationSynthesizer, SpeechBackend},
    render::{self, SceneRenderer},
    script::ScriptGenerator,
};

/// Per-job scratch directory under `workdir/<session_id>/`.
///
/// Removed on drop, unless the job produced a video, in which case only the
/// intermediates go and the video stays.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: PathBuf,
    keep: Option<PathBuf>,
}

impl JobWorkspace {
    pub fn create(workdir: &Path, session_id: &str) -> std::io::Result<Self> {
        let dir = workdir.join(session_id);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, keep: None })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn keep(&mut self, output: &Path) {
        self.keep = Some(output.to_path_buf());
    }

    fn remove_intermediates(&self, output: &Path) -> std::io::Result<()> {
        for entry in read_dir(&self.dir)? {
            let path = entry?.path();
            if path == output {
                continue;
            }
            if path.is_dir() {
                remove_dir_all(&path)?;
            } else {
                remove_file(&path)?;
            }
        }
        Ok(())
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        let result = match &self.keep {
            Some(output) => self.remove_intermediates(output),
            None if self.dir.exists() => remove_dir_all(&self.dir),
            None => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!(error = ?e, path = ?self.dir, "Failed to clean up job directory");
        } else {
            tracing::debug!(path = ?self.dir, "Cleaned up job directory");
        }
    }
}

// Drives one job from repository URL to video
pub struct ReelProcessor<S, I, B, E>
where
    S: JobStore + Send + Sync + 'static,
    I: RepositoryIngestor + Send + Sync + 'static,
    B: SpeechBackend + 'static,
    E: VideoEncoder + 'static,
{
    workdir: PathBuf,
    store: S,
    ingestor: I,
    generator: ScriptGenerator,
    renderer: SceneRenderer,
    narrator: NarrationSynthesizer<B>,
    assembler: AssemblyEngine<E>,
    config: PipelineConfig,
}

impl<S, I, B, E> ReelProcessor<S, I, B, E>
where
    S: JobStore + Send + Sync + 'static,
    I: RepositoryIngestor + Send + Sync + 'static,
    B: SpeechBackend + 'static,
    E: VideoEncoder + 'static,
{
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage boundary: stops here when a cancel was requested, otherwise
    /// records the next stage.
    fn enter(&self, session_id: &str, stage: Stage) -> Result<(), PipelineError> {
        let job = self
            .store
            .get(session_id)
            .ok_or_else(|| PipelineError::UnknownJob(session_id.to_string()))?;
        if job.cancel_requested {
            tracing::info!(session_id, next = %stage, "Cancellation requested, stopping");
            return Err(PipelineError::Cancelled);
        }
        self.store.update(session_id, |job| job.advance(stage));
        tracing::info!(session_id, stage = %stage, "Entering stage");
        Ok(())
    }

    async fn run_stages(
        &self,
        session_id: &str,
        repository_url: &str,
        workspace: &JobWorkspace,
    ) -> Result<PathBuf, PipelineError> {
        self.enter(session_id, Stage::Ingesting)?;
        let url = RepoUrl::parse(repository_url)?;
        let analysis = self
            .ingestor
            .ingest(&url, workspace.path())
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to ingest repository"))?;
        analysis.validate()?;

        self.enter(session_id, Stage::Scripting)?;
        let prompt = PromptBuilder::new(self.config.target_sections, self.config.bounds).build(&analysis)?;
        let generated = self.generator.generate(&prompt, &analysis).await?;
        let script = generated.script;
        tracing::info!(
            source = ?script.source,
            sections = script.sections.len(),
            attempts = generated.attempts.len(),
            duration_secs = script.total_duration_secs(),
            "Script ready"
        );

        self.enter(session_id, Stage::Rendering)?;
        let scenes = render::plan(&script, &analysis);
        let frames_dir = workspace.path().join("frames");
        std::fs::create_dir_all(&frames_dir)?;
        let frames = {
            let renderer = self.renderer.clone();
            let sections = script.sections.clone();
            let dir = frames_dir.clone();
            tokio::task::spawn_blocking(move || renderer.render(&scenes, &sections, &dir))
                .await
                .map_err(std::io::Error::other)?
        };
        if frames.is_empty() {
            return Err(AssemblyError::NoFrames.into());
        }

        self.enter(session_id, Stage::Narrating)?;
        let narration = if self.config.narration {
            let audio_dir = workspace.path().join("audio");
            std::fs::create_dir_all(&audio_dir)?;
            self.narrator.narrate(&script.sections, frames, &audio_dir).await?
        } else {
            Narration::silent(frames)
        };

        self.enter(session_id, Stage::Assembling)?;
        let output = self
            .assembler
            .assemble(&narration.frames, &narration.clips, workspace.path())
            .await?;
        Ok(output)
    }

    /// Runs the job registered under `session_id` and records its outcome in
    /// the store. Returns the video path on success.
    #[tracing::instrument(skip(self))]
    pub async fn process(&self, session_id: &str) -> Result<PathBuf, PipelineError> {
        let job = self
            .store
            .get(session_id)
            .ok_or_else(|| PipelineError::UnknownJob(session_id.to_string()))?;

        let result = match JobWorkspace::create(&self.workdir, session_id) {
            Ok(mut workspace) => {
                let result = self
                    .run_stages(session_id, &job.repository_url, &workspace)
                    .await;
                if let Ok(output) = &result {
                    workspace.keep(output);
                }
                result
            }
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(output) => {
                tracing::info!(output = %output.display(), "Job complete");
                self.store
                    .update(session_id, |job| job.complete(output.clone()));
            }
            Err(PipelineError::Cancelled) => {
                self.store
                    .update(session_id, |job| job.advance(Stage::Cancelled));
            }
            Err(e) => {
                tracing::error!(error = ?e, "Job failed");
                let failure = e.failure();
                self.store.update(session_id, |job| job.fail(failure));
            }
        }
        result
    }

    /// Registers a job for `repository_url` and runs it in the foreground
    pub async fn run(&self, repository_url: &str) -> Result<PathBuf, PipelineError> {
        let url = RepoUrl::parse(repository_url)?;
        let job = self.store.create(&url.canonical());
        self.process(&job.session_id).await
    }
}
