use thiserror::Error;

/// Everything that can go wrong between a form submission and a prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FraudError {
    #[error("invalid value for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("unknown {field} category: {value:?}")]
    UnknownCategory { field: String, value: String },

    /// Encoder output and classifier manifest disagree. Both lists hold
    /// feature names; `unexpected` stays empty when extras are tolerated.
    #[error(
        "feature schema mismatch (missing: [{}]; unexpected: [{}])",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// A form schema or feature manifest that is malformed on its own.
    #[error("invalid feature schema: {0}")]
    InvalidSchema(String),

    #[error("inference failed: {0}")]
    InferenceError(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),
}

impl FraudError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FraudError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown(field: impl Into<String>, value: impl Into<String>) -> Self {
        FraudError::UnknownCategory {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Encoder and classifier disagree, or the classifier never loaded.
    /// Retrying another submission will not help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FraudError::SchemaMismatch { .. } | FraudError::InvalidSchema(_) | FraudError::ModelLoad(_)
        )
    }

    /// Bad user input, caught before the classifier is touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            FraudError::InvalidInput { .. } | FraudError::UnknownCategory { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FraudError::InvalidInput { .. } => "invalid_input",
            FraudError::UnknownCategory { .. } => "unknown_category",
            FraudError::SchemaMismatch { .. } => "schema_mismatch",
            FraudError::InvalidSchema(_) => "invalid_schema",
            FraudError::InferenceError(_) => "inference_error",
            FraudError::ModelLoad(_) => "model_load",
        }
    }
}
