pub mod assembly;
pub mod config;
mod error;
pub mod github;
pub mod llm;
pub mod narration;
mod processor;
pub mod render;
pub mod script;
pub mod server;
pub mod tracing;
pub mod types;
pub mod worker;

pub use assembly::{AssemblyEngine, FfmpegEncoder, VideoEncoder};
pub use config::PipelineConfig;
pub use error::{
    AssemblyError, EncodeError, GenerationError, IngestError, PipelineError, ProviderError,
    SpeechError, ValidationError,
};
pub use github::{ArchiveIngestor, RepoUrl, RepositoryIngestor};
pub use llm::{anthropic, openai, provider_chain, ProviderKind, TextProvider};
pub use narration::{CommandSpeech, NarrationSynthesizer, NoSpeech, SpeechBackend};
pub use processor::{builder::ReelProcessorBuilder, JobWorkspace, ReelProcessor};
pub use render::SceneRenderer;
pub use script::{GeneratedScript, ScriptGenerator};
pub use worker::{JobRunner, JobService, SweepReport};
