use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("not initialized: run 'speclens init'")]
    NotInitialized,

    #[error("spec not found: {0}")]
    SpecNotFound(String),

    #[error("spec already exists: {0}")]
    SpecExists(String),

    #[error("invalid spec name '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("unknown document kind: {0}")]
    InvalidDocumentKind(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SpecError>;
