//! HTTP client for the Ollama backend that generates readings.
//!
//! Two operations: a warm-up that loads the model into memory and pins it
//! there, and a non-streamed generate call. Sampling parameters are fixed;
//! the model and base URL come from the command line.

use arcana_core::{ArcanaError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Default Ollama API base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Default model tag. Must be pulled into Ollama beforehand.
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Timeout for one generate call. A cold model on a busy GPU can
/// legitimately take minutes.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for the warm-up load, dominated by reading weights from disk.
const LOAD_TIMEOUT: Duration = Duration::from_secs(300);

const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.9;
const MAX_NEW_TOKENS: u32 = 1600;

/// Helper to create an inference error.
fn backend_err(message: String) -> ArcanaError {
    ArcanaError::Inference { message }
}

/// Request body for `POST /api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    top_p: f64,
    num_predict: u32,
}

/// Non-streamed response from `POST /api/generate`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Error body Ollama returns on non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP client for a running Ollama instance.
pub struct LlmClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    load_client: reqwest::Client,
}

impl LlmClient {
    /// Create a new client. `None` falls back to the defaults above.
    pub fn new(base_url: Option<&str>, model: Option<&str>) -> Self {
        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let model = model.unwrap_or(DEFAULT_MODEL).to_string();

        let client = reqwest::Client::builder()
            .timeout(GENERATE_TIMEOUT)
            .user_agent("arcana-worker")
            .build()
            .expect("failed to build reqwest client");

        let load_client = reqwest::Client::builder()
            .timeout(LOAD_TIMEOUT)
            .user_agent("arcana-worker")
            .build()
            .expect("failed to build reqwest load client");

        Self {
            base_url,
            model,
            client,
            load_client,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Load the model into memory and keep it resident.
    ///
    /// Sends a generate request with an empty prompt and `keep_alive: -1`
    /// so the first real reading does not pay the cold-start cost and the
    /// model never unloads between readings.
    pub async fn warm_up(&self) -> Result<()> {
        let url = format!("{}/api/generate", self.base_url);
        info!("Loading model {} via {}", self.model, url);

        let request = GenerateRequest {
            model: &self.model,
            prompt: "",
            system: None,
            stream: false,
            keep_alive: Some(-1),
            options: None,
        };

        let response = self
            .load_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| backend_err(format!("backend unreachable at {}: {}", self.base_url, e)))?;

        self.check_status(response).await?;
        info!("Model {} loaded", self.model);
        Ok(())
    }

    /// Run one generation and return the trimmed completion text.
    pub async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(
            "Generate call: model={} prompt_chars={}",
            self.model,
            prompt.chars().count()
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: Some(system),
            stream: false,
            keep_alive: Some(-1),
            options: Some(GenerateOptions {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                num_predict: MAX_NEW_TOKENS,
            }),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| backend_err(format!("backend unreachable at {}: {}", self.base_url, e)))?;

        let response = self.check_status(response).await?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| backend_err(format!("undecodable backend response: {}", e)))?;

        Ok(body.response.trim().to_string())
    }

    /// Turn a non-2xx status into an inference error carrying the
    /// backend's own message when it sent one.
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => format!("backend returned status {}", status),
        };
        Err(backend_err(format!(
            "backend error for model {}: {}",
            self.model, message
        )))
    }
}
