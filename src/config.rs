use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml_edit::{DocumentMut, Item, Value};

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const ELEVENLABS_API_KEY_VAR: &str = "ELEVENLABS_API_KEY";

pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "Crie uma mensagem motivadora curta (máx 100 caracteres) para focar em: {{topic}}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub runtime_dir: String,
    pub audio_path: PathBuf,
    pub bluetooth: BluetoothConfig,
    pub sink: SinkConfig,
    pub gemini: GeminiConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub player: PlayerConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BluetoothConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub profile: String,
    pub connect_settle_secs: u64,
    pub profile_settle_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub volume: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub prompt_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ElevenLabsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    pub program: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Unset means requests may block indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime_dir: "/run/user/1000".to_string(),
            audio_path: PathBuf::from("/tmp/output.mp3"),
            bluetooth: BluetoothConfig::default(),
            sink: SinkConfig::default(),
            gemini: GeminiConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
            player: PlayerConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            address: None,
            profile: "a2dp-sink".to_string(),
            connect_settle_secs: 5,
            profile_settle_secs: 2,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 15,
            poll_interval_ms: 1000,
            volume: "100%".to_string(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: "SAz9YHcvj6GT2YYXdXww".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            base_url: "https://api.elevenlabs.io".to_string(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: "ffplay".to_string(),
        }
    }
}

impl Config {
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(key) = non_empty(GEMINI_API_KEY_VAR) {
            self.gemini.api_key = Some(key);
        }
        if let Some(key) = non_empty(ELEVENLABS_API_KEY_VAR) {
            self.elevenlabs.api_key = Some(key);
        }
        self
    }

    pub fn device_address(&self) -> Result<&str> {
        self.bluetooth
            .address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .context("bluetooth.address is not configured; run `focus-cue config set bluetooth.address <MAC>`")
    }

    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        let mask = |key: &mut Option<String>| {
            if key.is_some() {
                *key = Some("<redacted>".to_string());
            }
        };
        mask(&mut copy.gemini.api_key);
        mask(&mut copy.elevenlabs.api_key);
        copy
    }
}

impl BluetoothConfig {
    pub fn connect_settle(&self) -> Duration {
        Duration::from_secs(self.connect_settle_secs)
    }

    pub fn profile_settle(&self) -> Duration {
        Duration::from_secs(self.profile_settle_secs)
    }
}

impl SinkConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse(raw: &str) -> Result<Config> {
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(toml::from_str::<Config>(raw)?)
}

pub fn load_document(path: &Path) -> Result<DocumentMut> {
    if !path.exists() {
        return Ok(DocumentMut::new());
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(DocumentMut::new());
    }

    raw.parse::<DocumentMut>()
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn write_document(path: &Path, doc: &DocumentMut) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    fs::write(path, doc.to_string()).with_context(|| format!("failed to write {}", path.display()))
}

pub fn get_value(doc: &DocumentMut, key: &str) -> Result<Option<String>> {
    let (section, field) = split_key(key)?;
    let item = match section {
        Some(section) => doc
            .get(section)
            .and_then(Item::as_table_like)
            .and_then(|table| table.get(field)),
        None => doc.get(field),
    };

    Ok(item.and_then(Item::as_value).map(|value| match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string().trim().to_string(),
    }))
}

/// Stores `raw` under `key`. Input that parses as a TOML value (numbers, booleans,
/// quoted strings) keeps its type; anything else is stored as a string.
pub fn set_value(doc: &mut DocumentMut, key: &str, raw: &str) -> Result<()> {
    let (section, field) = split_key(key)?;
    let mut value = raw
        .parse::<Value>()
        .unwrap_or_else(|_| Value::from(raw));
    value.decor_mut().clear();

    let table = match section {
        Some(section) => doc
            .entry(section)
            .or_insert(toml_edit::table())
            .as_table_mut()
            .with_context(|| format!("`{section}` is not a table"))?,
        None => doc.as_table_mut(),
    };
    table.insert(field, Item::Value(value));
    Ok(())
}

pub fn reset_value(doc: &mut DocumentMut, key: &str) -> Result<bool> {
    let (section, field) = split_key(key)?;
    let Some(section) = section else {
        return Ok(doc.remove(field).is_some());
    };

    let Some(table) = doc.get_mut(section).and_then(Item::as_table_mut) else {
        return Ok(false);
    };
    let removed = table.remove(field).is_some();
    if table.is_empty() {
        doc.remove(section);
    }
    Ok(removed)
}

pub fn validate_document(doc: &DocumentMut) -> Result<Config> {
    parse(&doc.to_string()).context("edited config is invalid")
}

fn split_key(key: &str) -> Result<(Option<&str>, &str)> {
    match key.split_once('.') {
        Some((section, field))
            if !section.is_empty() && !field.is_empty() && !field.contains('.') =>
        {
            Ok((Some(section), field))
        }
        None if !key.trim().is_empty() => Ok((None, key)),
        _ => bail!("invalid config key `{key}`; expected `name` or `section.name`"),
    }
}
