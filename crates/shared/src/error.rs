use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    StorageUnavailable,
    DisplayLocationUnavailable,
    StartupConfigMissing,
    Internal,
}

/// Failure of a command handler. `message` is what the invoking member sees.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for CommandError {
    fn from(value: ValidationError) -> Self {
        let message = match &value {
            ValidationError::InvalidKind(_) => "❌ Type invalide (legal ou illegal)".to_string(),
            ValidationError::EmptyField("name") => "❌ Le nom de l'entreprise est obligatoire".to_string(),
            ValidationError::EmptyField("manager") => "❌ Le nom du gérant est obligatoire".to_string(),
            ValidationError::EmptyField(field) => format!("❌ Champ obligatoire manquant : {field}"),
        };
        Self::new(ErrorCode::Validation, message)
    }
}
