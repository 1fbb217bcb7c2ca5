use ofitec_models::{Dialect, ImportResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failures of a BC3 import. Any of these discards everything
/// parsed so far; tolerated anomalies are `ParseDiagnostic`s instead.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ImportError {
    #[error("I/O failure reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Structural error at line {line}: {message}")]
    Structural { line: usize, message: String },

    #[error("Numeric format error at line {line}: field '{field}' has value '{value}'")]
    NumericFormat {
        line: usize,
        field: String,
        value: String,
    },

    #[error("Price overflow while pricing item {item_code}")]
    PriceOverflow { item_code: String },

    #[error("Empty budget: the {dialect} document has no valid items")]
    EmptyBudget { dialect: Dialect },

    #[error("Import of {path} was cancelled before it finished")]
    Cancelled { path: String },
}

impl ImportError {
    pub fn io(path: impl Into<String>, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub fn structural(line: usize, message: impl Into<String>) -> Self {
        Self::Structural {
            line,
            message: message.into(),
        }
    }

    pub fn numeric_format(line: usize, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NumericFormat {
            line,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO_FAILURE",
            Self::Structural { .. } => "STRUCTURAL_ERROR",
            Self::NumericFormat { .. } => "NUMERIC_FORMAT_ERROR",
            Self::PriceOverflow { .. } => "PRICE_OVERFLOW",
            Self::EmptyBudget { .. } => "EMPTY_BUDGET",
            Self::Cancelled { .. } => "IMPORT_CANCELLED",
        }
    }

    /// Whether the failure came from a malformed source line.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Structural { .. } | Self::NumericFormat { .. })
    }
}

/// Tagged view of an import's terminal state.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Clean(ImportResult),
    WithDiagnostics(ImportResult),
    ParseFailed(ImportError),
}

impl ImportOutcome {
    pub fn result(&self) -> Option<&ImportResult> {
        match self {
            Self::Clean(result) | Self::WithDiagnostics(result) => Some(result),
            Self::ParseFailed(_) => None,
        }
    }

    pub fn into_result(self) -> Result<ImportResult, ImportError> {
        match self {
            Self::Clean(result) | Self::WithDiagnostics(result) => Ok(result),
            Self::ParseFailed(error) => Err(error),
        }
    }
}

impl From<Result<ImportResult, ImportError>> for ImportOutcome {
    fn from(result: Result<ImportResult, ImportError>) -> Self {
        match result {
            Ok(result) if result.has_diagnostics() => Self::WithDiagnostics(result),
            Ok(result) => Self::Clean(result),
            Err(error) => Self::ParseFailed(error),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<ImportError> for ErrorResponse {
    fn from(error: ImportError) -> Self {
        let details = match &error {
            ImportError::Structural { line, .. } | ImportError::NumericFormat { line, .. } => {
                Some(serde_json::json!({ "line": line }))
            }
            _ => None,
        };
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}
