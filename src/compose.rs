use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::config::{GeminiConfig, HttpConfig, GEMINI_API_KEY_VAR};
use crate::prompt::render_prompt;

pub trait TextGenerator {
    fn generate(&self, model: &str, prompt: &str) -> Result<String>;
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
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

pub fn request_body(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
    })
}

pub fn response_text(raw: &str) -> Result<String> {
    let parsed: GenerateResponse =
        serde_json::from_str(raw).context("failed to parse Gemini response")?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        bail!("no text in Gemini response: {raw}");
    }
    Ok(text)
}

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, http: &HttpConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .with_context(|| {
                format!("no Gemini API key; set {GEMINI_API_KEY_VAR} or gemini.api_key")
            })?;
        let http = reqwest::blocking::Client::builder()
            .timeout(http.timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt))
            .send()
            .context("Gemini request failed")?;

        let status = resp.status();
        let text = resp.text().context("failed to read Gemini response")?;
        if !status.is_success() {
            bail!("Gemini API error {status}: {text}");
        }
        response_text(&text)
    }
}

pub fn compose_message(
    generator: &dyn TextGenerator,
    config: &GeminiConfig,
    topic: &str,
) -> Result<String> {
    let prompt = render_prompt(&config.prompt_template, topic);
    tracing::debug!(model = %config.model, prompt = %prompt, "requesting message");
    let message = generator
        .generate(&config.model, &prompt)
        .context("failed to generate message")?;
    Ok(message.trim().to_string())
}
