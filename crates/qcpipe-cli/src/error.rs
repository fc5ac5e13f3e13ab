use qcpipe::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Calculation failed: {0}")]
    Calculation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit code. Lookups that miss (unknown molecule,
    /// calculation, or uncached result) exit with 2 so scripts can
    /// distinguish them from real failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Engine(e) if e.is_not_found() => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcpipe::core::models::ids::MoleculeId;

    #[test]
    fn missing_entities_exit_with_a_distinct_code() {
        let not_found = CliError::from(EngineError::MoleculeNotFound(MoleculeId::new()));
        assert_eq!(not_found.exit_code(), 2);

        let failed = CliError::Calculation("diverged".to_string());
        assert_eq!(failed.exit_code(), 1);

        let bad_input = CliError::from(EngineError::InvalidInput("orbital".to_string()));
        assert_eq!(bad_input.exit_code(), 1);
    }
}
