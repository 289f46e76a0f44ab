use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Document set is empty")]
    EmptyCorpus,

    #[error("Artifact not found: {0}")]
    MissingArtifact(String),

    #[error("Artifact corrupted: {name}: {cause}")]
    CorruptArtifact { name: String, cause: String },

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
