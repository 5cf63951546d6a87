use thiserror::Error;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid vault root: {0}")]
    InvalidVaultRoot(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_norway::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VaultError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidVaultRoot(_) => "INVALID_VAULT_ROOT",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Yaml(_) => "YAML_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(VaultError::NotFound("x".to_string()).code(), "NOT_FOUND");
        assert_eq!(
            VaultError::Validation("bad".to_string()).code(),
            "VALIDATION_FAILED"
        );
    }

    #[test]
    fn io_errors_convert_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = VaultError::from(io);
        assert_eq!(err.code(), "IO_ERROR");
    }
}
