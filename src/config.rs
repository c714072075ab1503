use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

const ENV_PREFIX: &str = "ABET";
const DEFAULT_CONFIG_NAME: &str = "abet_scraper";
const DEFAULT_USER_AGENT: &str = concat!("abet_scraper/", env!("CARGO_PKG_VERSION"));

/// How section and accordion bodies are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// Visible text only, one line per block element.
    #[default]
    Text,
    /// Markup preserved as found in the document.
    Html,
}

/// What happens to content that appears before the first heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreamblePolicy {
    #[default]
    Discard,
    /// Emitted first, under [`PREAMBLE_KEY`], when non-empty.
    Keep,
}

/// What happens when two headings carry the same title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Later body is appended to the first entry, which keeps its position.
    #[default]
    Append,
    /// Later body replaces the earlier one in place.
    Overwrite,
}

/// Which element's children are scanned when no root selector is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RootPolicy {
    /// Top-level children of `<body>`.
    #[default]
    Body,
    /// Children of the element holding the first heading; content outside it
    /// is not part of any section.
    HeadingParent,
}

pub const PREAMBLE_KEY: &str = "preamble";

/// Options for every extractor call. Passed explicitly, never global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub heading_tag: String,
    pub root_selector: Option<String>,
    pub root_policy: RootPolicy,
    pub accordion_selector: String,
    pub accordion_body_selector: Option<String>,
    pub body_format: BodyFormat,
    pub preamble: PreamblePolicy,
    pub duplicates: DuplicatePolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            heading_tag: "h2".to_string(),
            root_selector: None,
            root_policy: RootPolicy::Body,
            accordion_selector: "h4.accordion-header".to_string(),
            accordion_body_selector: Some("div.accordion-content".to_string()),
            body_format: BodyFormat::Text,
            preamble: PreamblePolicy::Discard,
            duplicates: DuplicatePolicy::Append,
        }
    }
}

impl ExtractConfig {
    /// The configured heading tag, lowercased and checked to be `h1`..`h6`.
    pub fn heading(&self) -> Result<String, ParseError> {
        validate_heading_tag(&self.heading_tag)
    }
}

pub fn validate_heading_tag(tag: &str) -> Result<String, ParseError> {
    let tag = tag.trim().to_ascii_lowercase();
    match tag.as_bytes() {
        [b'h', b'1'..=b'6'] => Ok(tag),
        _ => Err(ParseError::InvalidHeadingTag(tag)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Request timeout in seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            timeout_secs: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            system_proxy: true,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub extract: ExtractConfig,
}

impl Settings {
    /// Layered load: defaults, then a TOML file, then `ABET_*` env vars.
    ///
    /// Without an explicit path, `abet_scraper.toml` in the working directory
    /// is read when present.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

// ── Tests ──
