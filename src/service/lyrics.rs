use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LyricsRequest {
    pub recipient_name: String,
    pub occasion: String,
    pub style: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum LyricsError {
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

pub struct LyricsClient {
    pub api_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl LyricsClient {
    pub async fn generate(&self, req: &LyricsRequest) -> Result<String, LyricsError> {
        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(req)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| LyricsError::GenerationFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LyricsError::GenerationFailed(format!(
                "HTTP {}",
                resp.status().as_u16()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LyricsError::GenerationFailed(e.to_string()))?;

        body.get("text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| LyricsError::GenerationFailed("empty generation response".to_string()))
    }
}
