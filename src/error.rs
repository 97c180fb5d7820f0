use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Cannot read rule file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse JSON rule file '{path}': {source}")]
    RuleJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot write rule file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse YAML rule file '{path}': {source}")]
    RuleYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error(
        "Sentence boundaries have not been set. Add sentence spans to the document \
         or enable use_context_window to scope modifiers without sentences"
    )]
    MissingSentenceBoundary,

    #[error("Unsupported target source '{0}': no such span group on the document")]
    UnsupportedTargetSource(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
