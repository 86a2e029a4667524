use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::FraudError;
use crate::invoker::PredictionResult;
use crate::schema::RawClaimInput;

/// A submission as it travels from the reader to the scorer.
///
/// `input` is an error when the line never parsed into a form; the scorer
/// reports it as a rejection like any other bad input.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub input: Result<RawClaimInput, FraudError>,
}

impl Submission {
    pub fn parsed(id: impl Into<String>, input: RawClaimInput) -> Self {
        Submission {
            id: id.into(),
            input: Ok(input),
        }
    }

    pub fn unreadable(id: impl Into<String>, error: FraudError) -> Self {
        Submission {
            id: id.into(),
            input: Err(error),
        }
    }
}

/// What happened to one submission. Never a panic, never silence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored(PredictionResult),
    Rejected {
        kind: &'static str,
        #[serde(serialize_with = "display")]
        error: FraudError,
    },
}

impl ScoreOutcome {
    pub fn rejected(error: FraudError) -> Self {
        ScoreOutcome::Rejected {
            kind: error.kind(),
            error,
        }
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            ScoreOutcome::Scored(result) => Some(result),
            ScoreOutcome::Rejected { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FraudError> {
        match self {
            ScoreOutcome::Scored(_) => None,
            ScoreOutcome::Rejected { error, .. } => Some(error),
        }
    }
}

/// Sent from the scorer to whoever presents results.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRecord {
    pub submission_id: String,
    #[serde(flatten)]
    pub outcome: ScoreOutcome,
    pub scored_at: DateTime<Utc>,
}

fn display<S: Serializer>(error: &FraudError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
