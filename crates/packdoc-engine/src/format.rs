//! Document text formats.
//!
//! Domain packs travel as YAML or JSON; either parses into the same
//! document tree, and the executor re-serializes results in whichever
//! format the document arrived in.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Yaml,
    Json,
}

impl DocFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocFormat::Yaml => "yaml",
            DocFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for DocFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yaml" | "yml" => Ok(DocFormat::Yaml),
            "json" => Ok(DocFormat::Json),
            other => Err(FormatError::Unsupported(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("JSON_PARSE_ERROR: {0}")]
    JsonParse(String),
    #[error("YAML_PARSE_ERROR: {0}")]
    YamlParse(String),
    #[error("SERIALIZE_ERROR: {0}")]
    Serialize(String),
    #[error("UNSUPPORTED_FORMAT: \"{0}\" (expected \"yaml\" or \"json\")")]
    Unsupported(String),
}

/// Parse document text into a document tree.
pub fn parse_document(text: &str, format: DocFormat) -> Result<Value, FormatError> {
    match format {
        DocFormat::Json => {
            serde_json::from_str(text).map_err(|e| FormatError::JsonParse(e.to_string()))
        }
        DocFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| FormatError::YamlParse(e.to_string()))
        }
    }
}

/// Serialize a document tree back to text in the given format.
pub fn serialize_document(doc: &Value, format: DocFormat) -> Result<String, FormatError> {
    match format {
        DocFormat::Json => serde_json::to_string_pretty(doc)
            .map_err(|e| FormatError::Serialize(e.to_string())),
        DocFormat::Yaml => {
            serde_yaml::to_string(doc).map_err(|e| FormatError::Serialize(e.to_string()))
        }
    }
}
