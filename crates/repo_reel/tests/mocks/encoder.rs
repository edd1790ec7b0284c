use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use repo_reel::{assembly::EncodeRequest, EncodeError, VideoEncoder};

/// Writes a placeholder file and reports the duration the request asked for
#[derive(Clone, Default)]
pub struct MockEncoder {
    pub calls: Arc<Mutex<Vec<EncodeRequest>>>,
    pub fail_with: Option<String>,
}

impl MockEncoder {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn last_request(&self) -> Option<EncodeRequest> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl VideoEncoder for MockEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(ref msg) = self.fail_with {
            return Err(EncodeError::Exit {
                status: 1,
                stderr: msg.clone(),
            });
        }
        tokio::fs::write(&request.output, b"\x00\x00\x00\x18ftypmp42").await?;
        Ok(())
    }

    async fn probe_duration(&self, _path: &Path) -> Result<f64, EncodeError> {
        let total = self
            .last_request()
            .map(|request| request.total_secs())
            .unwrap_or_default();
        Ok(total)
    }
}
