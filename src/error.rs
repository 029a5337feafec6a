use thiserror::Error;

use crate::types::{EntityKind, Id};

#[derive(Error, Debug)]
pub enum DeskError {
    // Fetch failures
    #[error("failed to fetch {kind} collection: {message}")]
    Fetch { kind: EntityKind, message: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Id },

    // Mutation failures
    #[error("failed to update {kind} {id}: {message}")]
    Mutation {
        kind: EntityKind,
        id: Id,
        message: String,
    },

    #[error("request rejected: {0}")]
    Rejected(String),

    // Validation failures (request never issued)
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} has no field '{field}'")]
    UnknownField { kind: EntityKind, field: String },

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("no eligible rows selected")]
    NothingSelected,

    #[error("invalid entity kind '{0}'")]
    InvalidKind(String),

    #[error("invalid row key '{0}'")]
    InvalidRowKey(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl DeskError {
    /// True for caller-side failures that block a request from being issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DeskError::Validation(_)
                | DeskError::UnknownField { .. }
                | DeskError::InvalidValue { .. }
                | DeskError::NothingSelected
        )
    }

    /// True for failures reported by the remote store while reading.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, DeskError::Fetch { .. } | DeskError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(DeskError::NothingSelected.is_validation());
        assert!(DeskError::Validation("title is required".to_string()).is_validation());
        assert!(
            !DeskError::Rejected("permission denied".to_string()).is_validation()
        );
    }

    #[test]
    fn test_fetch_classification() {
        let err = DeskError::NotFound {
            kind: EntityKind::Task,
            id: 7,
        };
        assert!(err.is_fetch_failure());
        assert_eq!(err.to_string(), "task 7 not found");
    }
}
