use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::{ElevenLabsConfig, HttpConfig, ELEVENLABS_API_KEY_VAR};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub model_id: &'a str,
}

pub trait SpeechSynthesizer {
    fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<Box<dyn Read>>;
}

pub fn request_body(request: &SpeechRequest<'_>) -> serde_json::Value {
    serde_json::json!({
        "text": request.text,
        "model_id": request.model_id,
    })
}

pub struct ElevenLabsClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(config: &ElevenLabsConfig, http: &HttpConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .with_context(|| {
                format!("no ElevenLabs API key; set {ELEVENLABS_API_KEY_VAR} or elevenlabs.api_key")
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

impl SpeechSynthesizer for ElevenLabsClient {
    fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<Box<dyn Read>> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, request.voice_id);
        let resp = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&request_body(request))
            .send()
            .context("ElevenLabs request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("ElevenLabs API error {status}: {body}");
        }
        Ok(Box::new(resp))
    }
}

pub fn write_audio(stream: &mut dyn Read, path: &Path) -> Result<u64> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let read = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(error).context("audio stream failed"),
        };
        file.write_all(&chunk[..read])
            .context("failed to write audio chunk")?;
        written += read as u64;
    }

    if written == 0 {
        bail!("speech service returned no audio");
    }

    file.persist(path)
        .map_err(|error| error.error)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(written)
}

pub fn synthesize_to_file(
    synthesizer: &dyn SpeechSynthesizer,
    config: &ElevenLabsConfig,
    text: &str,
    path: &Path,
) -> Result<PathBuf> {
    let request = SpeechRequest {
        text,
        voice_id: &config.voice_id,
        model_id: &config.model_id,
    };
    let mut stream = synthesizer
        .synthesize(&request)
        .context("failed to synthesize speech")?;
    let bytes = write_audio(stream.as_mut(), path)?;
    tracing::debug!(bytes, path = %path.display(), "audio written");
    Ok(path.to_path_buf())
}
