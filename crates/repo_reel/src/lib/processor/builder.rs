use std::path::PathBuf;

use reel_datastore::JobStore;

use crate::{
    assembly::{AssemblyEngine, VideoEncoder},
    config::PipelineConfig,
    github::RepositoryIngestor,
    narration::{NarrationSynthesizer, SpeechBackend},
    render::SceneRenderer,
    script::ScriptGenerator,
    ReelProcessor,
};

pub struct ReelProcessorBuilder<S = (), I = (), B = (), E = ()> {
    workdir: PathBuf,
    store: S,
    ingestor: I,
    speech: B,
    encoder: E,
    generator: ScriptGenerator,
    renderer: Option<SceneRenderer>,
    config: PipelineConfig,
}

impl ReelProcessorBuilder {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            store: (),
            ingestor: (),
            speech: (),
            encoder: (),
            generator: ScriptGenerator::new(vec![]),
            renderer: None,
            config: PipelineConfig::default(),
        }
    }
}

impl<S, I, B, E> ReelProcessorBuilder<S, I, B, E> {
    pub fn store<S2: JobStore + Send + Sync + 'static>(
        self,
        store: S2,
    ) -> ReelProcessorBuilder<S2, I, B, E> {
        ReelProcessorBuilder {
            workdir: self.workdir,
            store,
            ingestor: self.ingestor,
            speech: self.speech,
            encoder: self.encoder,
            generator: self.generator,
            renderer: self.renderer,
            config: self.config,
        }
    }

    pub fn ingestor<I2: RepositoryIngestor + Send + Sync + 'static>(
        self,
        ingestor: I2,
    ) -> ReelProcessorBuilder<S, I2, B, E> {
        ReelProcessorBuilder {
            workdir: self.workdir,
            store: self.store,
            ingestor,
            speech: self.speech,
            encoder: self.encoder,
            generator: self.generator,
            renderer: self.renderer,
            config: self.config,
        }
    }

    pub fn speech<B2: SpeechBackend + 'static>(self, speech: B2) -> ReelProcessorBuilder<S, I, B2, E> {
        ReelProcessorBuilder {
            workdir: self.workdir,
            store: self.store,
            ingestor: self.ingestor,
            speech,
            encoder: self.encoder,
            generator: self.generator,
            renderer: self.renderer,
            config: self.config,
        }
    }

    pub fn encoder<E2: VideoEncoder + 'static>(self, encoder: E2) -> ReelProcessorBuilder<S, I, B, E2> {
        ReelProcessorBuilder {
            workdir: self.workdir,
            store: self.store,
            ingestor: self.ingestor,
            speech: self.speech,
            encoder,
            generator: self.generator,
            renderer: self.renderer,
            config: self.config,
        }
    }

    pub fn generator(mut self, generator: ScriptGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Overrides the renderer built from the config (fonts, resolution)
    pub fn renderer(mut self, renderer: SceneRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
}

impl<S, I, B, E> ReelProcessorBuilder<S, I, B, E>
where
    S: JobStore + Send + Sync + 'static,
    I: RepositoryIngestor + Send + Sync + 'static,
    B: SpeechBackend + 'static,
    E: VideoEncoder + 'static,
{
    pub fn build(self) -> ReelProcessor<S, I, B, E> {
        let config = self.config;
        ReelProcessor {
            workdir: self.workdir,
            store: self.store,
            ingestor: self.ingestor,
            generator: self
                .generator
                .with_bounds(config.bounds)
                .with_timeouts(config.provider_timeout, config.generation_budget),
            renderer: self
                .renderer
                .unwrap_or_else(|| SceneRenderer::from_config(&config)),
            narrator: NarrationSynthesizer::new(self.speech),
            assembler: AssemblyEngine::new(self.encoder, config.width, config.height, config.fps),
            config,
        }
    }
}
