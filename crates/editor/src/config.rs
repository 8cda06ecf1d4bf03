use fingerprint::{
    DEFAULT_ANCESTOR_DEPTH, DEFAULT_KNOWN_ANCHORS, DEFAULT_PATH_DEPTH, DEFAULT_SOURCE_ATTRIBUTE,
    DEFAULT_VOLATILE_PATTERN, FingerprintBuilder, Volatility,
};
use html::{DocumentShell, ParseOptions, Selector, SelectorError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_EDITABLE_TAGS: &[&str] = &[
    "H1", "H2", "H3", "H4", "H5", "H6", "P", "DIV", "SPAN", "A", "UL", "LI", "LABEL", "B",
];
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_PAGE: &str = "index.html";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid volatile_pattern: {0}")]
    VolatilePattern(#[from] regex::Error),
    #[error("invalid known anchor `{selector}`: {source}")]
    Anchor {
        selector: String,
        #[source]
        source: SelectorError,
    },
    #[error("{0} must be at least 1")]
    ZeroDepth(&'static str),
    #[error("editable_tags is empty")]
    NoEditableTags,
    #[error("source_attribute is empty")]
    EmptySourceAttribute,
}

/// Serialized form of [`DocumentShell`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShellMode {
    #[default]
    Synthesize,
    Preserve,
}

impl From<ShellMode> for DocumentShell {
    fn from(mode: ShellMode) -> Self {
        match mode {
            ShellMode::Synthesize => DocumentShell::Synthesize,
            ShellMode::Preserve => DocumentShell::Preserve,
        }
    }
}

/// Editor settings, usually loaded from a TOML file. Every key is optional.
///
/// ```toml
/// editable_tags = ["H1", "P", "A"]
/// debounce_ms = 500
/// known_anchors = ["#app", "main"]
/// document_shell = "preserve"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Tag names (any case) whose elements can be edited.
    pub editable_tags: Vec<String>,
    /// Container selectors tried, in order, when no stable id anchor exists.
    pub known_anchors: Vec<String>,
    /// Case-insensitive regex for ids and classes that reflect transient state.
    pub volatile_pattern: String,
    pub debounce_ms: u64,
    pub ancestor_depth: usize,
    pub path_depth: usize,
    /// Attribute naming the file an included fragment comes from.
    pub source_attribute: String,
    /// Source file for pages whose path has no final segment (`/`, `/docs/`).
    pub default_page: String,
    pub document_shell: ShellMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            editable_tags: DEFAULT_EDITABLE_TAGS.iter().map(|s| s.to_string()).collect(),
            known_anchors: DEFAULT_KNOWN_ANCHORS.iter().map(|s| s.to_string()).collect(),
            volatile_pattern: DEFAULT_VOLATILE_PATTERN.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            ancestor_depth: DEFAULT_ANCESTOR_DEPTH,
            path_depth: DEFAULT_PATH_DEPTH,
            source_attribute: DEFAULT_SOURCE_ATTRIBUTE.to_string(),
            default_page: DEFAULT_PAGE.to_string(),
            document_shell: ShellMode::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!(target: "editor", "loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fingerprint_builder().map(|_| ())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            shell: self.document_shell.into(),
        }
    }

    pub fn is_editable_tag(&self, name: &str) -> bool {
        self.editable_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Compile the fingerprint settings, validating every field on the way.
    pub fn fingerprint_builder(&self) -> Result<FingerprintBuilder, ConfigError> {
        if self.editable_tags.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::NoEditableTags);
        }
        if self.ancestor_depth == 0 {
            return Err(ConfigError::ZeroDepth("ancestor_depth"));
        }
        if self.path_depth == 0 {
            return Err(ConfigError::ZeroDepth("path_depth"));
        }
        if self.source_attribute.trim().is_empty() {
            return Err(ConfigError::EmptySourceAttribute);
        }
        let volatility = Volatility::new(&self.volatile_pattern)?;
        let anchors = self
            .known_anchors
            .iter()
            .map(|s| {
                Selector::parse(s)
                    .map(|sel| (s.clone(), sel))
                    .map_err(|source| ConfigError::Anchor {
                        selector: s.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FingerprintBuilder::new(
            volatility,
            anchors,
            self.ancestor_depth,
            self.path_depth,
            self.source_attribute.trim().to_ascii_lowercase(),
        ))
    }
}
