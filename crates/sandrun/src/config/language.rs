use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::LimitOverrides;

/// A language the engine knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Python,
    JavaScript,
}

impl LanguageId {
    /// All supported languages
    pub const ALL: [LanguageId; 2] = [LanguageId::Python, LanguageId::JavaScript];

    /// Canonical identifier, also the key under `[languages]` in the config
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageId::Python => "python",
            LanguageId::JavaScript => "javascript",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            LanguageId::Python => "Python 3",
            LanguageId::JavaScript => "JavaScript (Node.js)",
        }
    }

    /// Name of the source file written into the workspace
    pub fn source_name(&self) -> &'static str {
        match self {
            LanguageId::Python => "main.py",
            LanguageId::JavaScript => "main.js",
        }
    }

    /// Interpreter used when the config doesn't name one
    pub fn default_interpreter(&self) -> &'static str {
        match self {
            LanguageId::Python => "python3",
            LanguageId::JavaScript => "node",
        }
    }
}

impl FromStr for LanguageId {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" | "python3" | "py" => Ok(LanguageId::Python),
            "javascript" | "js" | "node" => Ok(LanguageId::JavaScript),
            _ => Err(UnknownLanguage(s.to_owned())),
        }
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier that doesn't name a supported language
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

/// Per-language settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Interpreter binary (resolved through PATH when it has no `/`)
    #[serde(default)]
    pub interpreter: Option<PathBuf>,

    /// Limits layered over `[defaults]` for this language
    #[serde(default)]
    pub limits: Option<LimitOverrides>,
}

impl LanguageConfig {
    /// Interpreter for `language`, falling back to its default binary
    pub fn interpreter_for(&self, language: LanguageId) -> PathBuf {
        self.interpreter
            .clone()
            .unwrap_or_else(|| PathBuf::from(language.default_interpreter()))
    }
}
