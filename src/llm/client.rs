use anyhow::{Context, Result, bail};
use reqwest::Client;

use crate::llm::response::{Candidate, GenerateRequest, GenerateResponse};
use crate::llm::secrets::{
    API_KEY_ENV, ApiKeySource, prompt_for_api_key, resolve_api_key, store_api_key,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const RECOMMEND_MODEL: &str = "gemini-pro";

/// Gemini client with the key injected at construction. Built without a
/// request timeout: a submit waits until the network resolves or fails.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// One POST per call. The HTTP status is not inspected: whatever body
    /// comes back is decoded, and an error-shaped body yields an empty batch.
    pub async fn generate_recommendations(&self, prompt: &str) -> Result<Vec<Candidate>> {
        let request = GenerateRequest::from_prompt(prompt);

        let response = self
            .http
            .post(self.model_url("generateContent"))
            .json(&request)
            .send()
            .await
            .context("Failed to reach the Gemini API")?;

        let decoded: GenerateResponse = response
            .json()
            .await
            .context("Failed to decode the Gemini response")?;

        Ok(decoded.candidates)
    }

    pub async fn healthcheck(&self) -> Result<()> {
        let url = format!("{GEMINI_API_BASE}/{RECOMMEND_MODEL}?key={}", self.api_key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to reach the Gemini API")?;

        if !response.status().is_success() {
            bail!(
                "Gemini rejected the configured API key ({})",
                response.status()
            );
        }
        Ok(())
    }

    fn model_url(&self, action: &str) -> String {
        format!(
            "{GEMINI_API_BASE}/{RECOMMEND_MODEL}:{action}?key={}",
            self.api_key
        )
    }
}

/// Resolve a key from the configured sources, prompting once if none is
/// found. A blank answer at the prompt aborts with guidance.
pub fn ensure_client() -> Result<GeminiClient> {
    if let Some((key, _)) = resolve_api_key()? {
        return Ok(GeminiClient::new(key));
    }

    let key = prompt_for_api_key()?;
    if key.is_empty() {
        bail!("No API key provided. Set {API_KEY_ENV} or run `bookmood key --set <KEY>`.");
    }
    store_api_key(&key)?;

    Ok(GeminiClient::new(key))
}

pub async fn test_configured_api_key() -> Result<ApiKeySource> {
    let Some((key, source)) = resolve_api_key()? else {
        bail!("No API key configured. Set {API_KEY_ENV} or run `bookmood key --set <KEY>`.");
    };

    GeminiClient::new(key).healthcheck().await?;
    Ok(source)
}
