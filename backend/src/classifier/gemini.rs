use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{parse_reply, prompt, Expectation, Identification, ImageInput, Strictness, Verification};
use crate::config::Config;
use crate::error::{Result, RewardsError};

const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Value>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|e| RewardsError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            api_base: config.gemini_api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn identify(&self, image: &ImageInput) -> Result<Identification> {
        let text = self.generate(&prompt::identify(), image).await?;

        parse_reply(&text).map_err(|e| {
            tracing::warn!("Unreadable identification reply: {}", e);
            RewardsError::Classifier(format!("unreadable identification reply: {e}"))
        })
    }

    /// A reply that isn't the expected JSON is an unverified result, not an error.
    pub async fn verify(
        &self,
        image: &ImageInput,
        expectation: &Expectation,
        strictness: Strictness,
    ) -> Result<Verification> {
        let text = self
            .generate(&prompt::verify(expectation, strictness), image)
            .await?;

        match parse_reply::<Verification>(&text) {
            Ok(verdict) => Ok(verdict),
            Err(e) => {
                tracing::warn!("Unreadable verification reply, treating as failed: {}", e);
                Ok(Verification::unreadable())
            }
        }
    }

    async fn generate(&self, prompt: &str, image: &ImageInput) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RewardsError::Config("Gemini API key is not configured".to_string()))?;

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "inlineData": { "mimeType": image.mime_type, "data": image.data } }
                ]
            }]
        });

        tracing::debug!("Calling Gemini model {} ({})", self.model, image.mime_type);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RewardsError::Classifier(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let mut error_text = response.text().await.unwrap_or_default();
            if error_text.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| error_text.is_char_boundary(*i))
                    .unwrap_or(0);
                error_text.truncate(cut);
            }
            return Err(RewardsError::Classifier(format!("{status} - {error_text}")));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RewardsError::Classifier(format!("invalid response body: {e}")))?;

        let text: String = data
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(RewardsError::Classifier("model returned no text".to_string()));
        }

        Ok(text)
    }
}
