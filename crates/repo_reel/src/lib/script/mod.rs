pub mod parser;
pub mod template;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    error::{GenerationError, ProviderError},
    llm::{prompt::Prompt, TextProvider},
    types::{
        AttemptOutcome, DurationBounds, ProviderAttempt, RepositoryAnalysis, Script, ScriptSection,
        ScriptSource,
    },
};

/// A script together with the provider attempts that led to it
#[derive(Debug, Clone)]
pub struct GeneratedScript {
    pub script: Script,
    pub attempts: Vec<ProviderAttempt>,
}

/// Asks providers for a script in priority order and falls back to the local
/// template once every provider has failed or the time budget is spent.
#[derive(Clone)]
pub struct ScriptGenerator {
    providers: Vec<Arc<dyn TextProvider>>,
    bounds: DurationBounds,
    per_call_timeout: Duration,
    total_budget: Duration,
}

impl ScriptGenerator {
    pub fn new(providers: Vec<Arc<dyn TextProvider>>) -> Self {
        ScriptGenerator {
            providers,
            bounds: DurationBounds::default(),
            per_call_timeout: Duration::from_secs(60),
            total_budget: Duration::from_secs(180),
        }
    }

    pub fn with_bounds(mut self, bounds: DurationBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_timeouts(mut self, per_call: Duration, total_budget: Duration) -> Self {
        self.per_call_timeout = per_call;
        self.total_budget = total_budget;
        self
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    fn outcome_of(err: &ProviderError) -> AttemptOutcome {
        match err {
            ProviderError::Auth => AttemptOutcome::AuthError,
            ProviderError::RateLimited => AttemptOutcome::RateLimited,
            ProviderError::Network(_) => AttemptOutcome::NetworkError,
            ProviderError::Malformed(_) => AttemptOutcome::MalformedResponse,
        }
    }

    /// One bounded call, turned into parsed sections or a failed outcome
    async fn call_once(
        &self,
        provider: &dyn TextProvider,
        prompt: &Prompt,
        limit: Duration,
    ) -> Result<Vec<ScriptSection>, AttemptOutcome> {
        let text = match tokio::time::timeout(limit, provider.generate(prompt, prompt.max_tokens)).await {
            Err(_) => {
                tracing::warn!(provider = provider.id(), ?limit, "Provider call timed out");
                return Err(AttemptOutcome::NetworkError);
            }
            Ok(Err(e)) => {
                tracing::warn!(provider = provider.id(), error = ?e, "Provider call failed");
                return Err(Self::outcome_of(&e));
            }
            Ok(Ok(text)) => text,
        };

        parser::parse_script(&text, &self.bounds).map_err(|e| {
            tracing::warn!(provider = provider.id(), error = %e, "Provider returned an unusable script");
            AttemptOutcome::MalformedResponse
        })
    }

    #[tracing::instrument(skip_all, fields(repo = %analysis.name))]
    pub async fn generate(
        &self,
        prompt: &Prompt,
        analysis: &RepositoryAnalysis,
    ) -> Result<GeneratedScript, GenerationError> {
        let deadline = Instant::now() + self.total_budget;
        let mut attempts = Vec::with_capacity(self.providers.len());

        for (i, provider) in self.providers.iter().enumerate() {
            let started = Instant::now();
            if started >= deadline {
                tracing::warn!(
                    skipped = self.providers.len() - i,
                    "Generation budget exhausted, skipping remaining providers"
                );
                break;
            }

            let mut retried = false;
            let result = loop {
                let limit = self
                    .per_call_timeout
                    .min(deadline.saturating_duration_since(Instant::now()));
                match self.call_once(provider.as_ref(), prompt, limit).await {
                    // network failures get exactly one more try
                    Err(AttemptOutcome::NetworkError) if !retried && Instant::now() < deadline => {
                        retried = true;
                    }
                    other => break other,
                }
            };

            let outcome = match &result {
                Ok(_) => AttemptOutcome::Success,
                Err(outcome) => *outcome,
            };
            let attempt = ProviderAttempt {
                provider: provider.id().to_string(),
                rank: i + 1,
                outcome,
                elapsed: started.elapsed(),
                retried,
            };
            tracing::info!(
                provider = %attempt.provider,
                rank = attempt.rank,
                outcome = %attempt.outcome,
                elapsed_ms = attempt.elapsed.as_millis() as u64,
                retried,
                "Provider attempt finished"
            );
            attempts.push(attempt);

            if let Ok(sections) = result {
                return Ok(GeneratedScript {
                    script: Script {
                        sections,
                        source: ScriptSource::Provider(provider.id().to_string()),
                    },
                    attempts,
                });
            }
        }

        tracing::warn!(
            attempts = attempts.len(),
            "No provider produced a script, using local template"
        );
        let script = template::local_script(analysis, &prompt.layout, &self.bounds)?;
        Ok(GeneratedScript { script, attempts })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeSet,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{llm::prompt::PromptBuilder, types::RepoStats};

    const SCRIPT: &str = "\
[0:00 - 0:20] Title: Hello
Welcome to the Hello-World repository, a classic first project on GitHub.
[0:20 - 0:40] Conclusion: Bye
Thanks for watching this overview, go explore the repository yourself now.
";

    enum Behaviour {
        Reply(&'static str),
        Fail(fn() -> ProviderError),
        /// fails with a network error on the first call, then replies
        FlakyThenReply(&'static str),
        Hang,
    }

    struct Scripted {
        id: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(id: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Scripted {
                id,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextProvider for Scripted {
        fn id(&self) -> &str {
            self.id
        }

        async fn generate(&self, _prompt: &Prompt, _max_tokens: u32) -> Result<String, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Reply(text) => Ok(text.to_string()),
                Behaviour::Fail(err) => Err(err()),
                Behaviour::FlakyThenReply(text) if n > 0 => Ok(text.to_string()),
                Behaviour::FlakyThenReply(_) => Err(ProviderError::Network("reset".into())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn chain(providers: &[&Arc<Scripted>]) -> Vec<Arc<dyn TextProvider>> {
        providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn TextProvider>)
            .collect()
    }

    fn analysis() -> RepositoryAnalysis {
        RepositoryAnalysis {
            name: "Hello-World".into(),
            owner: "octocat".into(),
            url: "https://github.com/octocat/Hello-World".into(),
            description: "My first repository on GitHub!".into(),
            technologies: BTreeSet::new(),
            features: vec![],
            code_excerpts: vec![],
            stats: RepoStats::default(),
            content_summary: String::new(),
            file_structure: vec![],
        }
    }

    fn outcomes(generated: &GeneratedScript) -> Vec<(String, AttemptOutcome, bool)> {
        generated
            .attempts
            .iter()
            .map(|a| (a.provider.clone(), a.outcome, a.retried))
            .collect()
    }

    #[tokio::test]
    async fn test_network_error_is_retried_once() {
        let flaky = Scripted::new("flaky", Behaviour::FlakyThenReply(SCRIPT));
        let generator = ScriptGenerator::new(chain(&[&flaky]));
        let prompt = PromptBuilder::default().build(&analysis()).unwrap();

        let generated = generator.generate(&prompt, &analysis()).await.unwrap();

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            outcomes(&generated),
            vec![("flaky".to_string(), AttemptOutcome::Success, true)]
        );
    }

    #[tokio::test]
    async fn test_auth_and_malformed_advance_without_retry() {
        let auth = Scripted::new("auth", Behaviour::Fail(|| ProviderError::Auth));
        let garbage = Scripted::new("garbage", Behaviour::Reply("I am unable to do that."));
        let good = Scripted::new("good", Behaviour::Reply(SCRIPT));
        let generator = ScriptGenerator::new(chain(&[&auth, &garbage, &good]));
        let prompt = PromptBuilder::default().build(&analysis()).unwrap();

        let generated = generator.generate(&prompt, &analysis()).await.unwrap();

        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
        assert_eq!(garbage.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcomes(&generated),
            vec![
                ("auth".to_string(), AttemptOutcome::AuthError, false),
                ("garbage".to_string(), AttemptOutcome::MalformedResponse, false),
                ("good".to_string(), AttemptOutcome::Success, false),
            ]
        );
        assert_eq!(generated.script.source, ScriptSource::Provider("good".into()));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_skips_remaining_providers() {
        let slow = Scripted::new("slow", Behaviour::Hang);
        let never = Scripted::new("never", Behaviour::Reply(SCRIPT));
        let generator = ScriptGenerator::new(chain(&[&slow, &never]))
            .with_timeouts(Duration::from_millis(200), Duration::from_millis(50));
        let prompt = PromptBuilder::default().build(&analysis()).unwrap();

        let generated = generator.generate(&prompt, &analysis()).await.unwrap();

        assert_eq!(never.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            outcomes(&generated),
            vec![("slow".to_string(), AttemptOutcome::NetworkError, false)]
        );
        assert_eq!(generated.script.source, ScriptSource::LocalTemplate);
    }

    #[tokio::test]
    async fn test_no_providers_uses_local_template() {
        let generator = ScriptGenerator::new(vec![]);
        let prompt = PromptBuilder::default().build(&analysis()).unwrap();
        let generated = generator.generate(&prompt, &analysis()).await.unwrap();

        assert!(generated.attempts.is_empty());
        assert_eq!(generated.script.source, ScriptSource::LocalTemplate);
        assert!(DurationBounds::default().contains(generated.script.total_duration_secs()));
    }

    #[test]
    fn test_provider_ids_keep_order() {
        let a = Scripted::new("a", Behaviour::Reply(SCRIPT));
        let b = Scripted::new("b", Behaviour::Reply(SCRIPT));
        let generator = ScriptGenerator::new(chain(&[&a, &b]));
        assert_eq!(generator.provider_ids(), vec!["a", "b"]);
    }
}
