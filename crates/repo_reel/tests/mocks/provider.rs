use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use repo_reel::{llm::prompt::Prompt, ProviderError, TextProvider};

/// A five-section script with timing markers, 60 seconds in total
pub const FIVE_SECTIONS: &str = "\
[0:00 - 0:10] Title: Hello-World
Welcome to Hello-World, the classic first repository that greets everyone who runs it.
[0:10 - 0:25] Features
It shows how a repository is laid out and invites everyone to fork it.
[0:25 - 0:35] Technology
There is no framework or build tool here, only a plain text README file.
[0:35 - 0:50] Code
There is no program to run, the README itself is the whole repository.
[0:50 - 1:00] Conclusion
Thanks for watching, go explore the repository and say hello yourself.
";

#[derive(Clone)]
pub enum Reply {
    Text(&'static str),
    RateLimited,
    /// Never answers within any sane timeout
    Hang,
}

pub struct MockProvider {
    pub id: &'static str,
    pub reply: Reply,
    /// User prompt of every call
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn new(id: &'static str, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            id,
            reply,
            calls: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextProvider for MockProvider {
    fn id(&self) -> &str {
        self.id
    }

    async fn generate(&self, prompt: &Prompt, _max_tokens: u32) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(prompt.user.clone());
        match &self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::RateLimited => Err(ProviderError::RateLimited),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

pub fn chain(providers: &[&Arc<MockProvider>]) -> Vec<Arc<dyn TextProvider>> {
    providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn TextProvider>)
        .collect()
}
