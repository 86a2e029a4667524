use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::FraudError;
use crate::features::CanonicalFeatureVector;
use crate::model::{Classifier, FRAUDULENT, LEGITIMATE};

const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Legitimate,
    Fraudulent,
}

impl Label {
    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            LEGITIMATE => Some(Label::Legitimate),
            FRAUDULENT => Some(Label::Fraudulent),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Legitimate => write!(f, "legitimate"),
            Label::Fraudulent => write!(f, "fraudulent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: Label,
    pub probability_legitimate: f64,
    pub probability_fraudulent: f64,
}

impl PredictionResult {
    /// Probability the model assigns to its own label.
    pub fn confidence(&self) -> f64 {
        match self.label {
            Label::Legitimate => self.probability_legitimate,
            Label::Fraudulent => self.probability_fraudulent,
        }
    }

    pub fn is_fraudulent(&self) -> bool {
        self.label == Label::Fraudulent
    }
}

/// Runs a reconciled feature vector through the classifier.
#[derive(Clone)]
pub struct InferenceInvoker {
    classifier: Arc<dyn Classifier>,
}

impl InferenceInvoker {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        InferenceInvoker { classifier }
    }

    pub fn manifest(&self) -> &[String] {
        self.classifier.feature_names()
    }

    pub fn infer(&self, vector: &CanonicalFeatureVector) -> Result<PredictionResult, FraudError> {
        // label and probabilities must come from the very same values
        let values = vector.values();

        let class = self.classifier.predict(&values)?;
        let proba = self.classifier.predict_proba(&values)?;

        let label = Label::from_class(class).ok_or_else(|| {
            FraudError::InferenceError(format!("classifier returned unknown class {class}"))
        })?;
        let [legit, fraud] = normalize(proba)?;

        let argmax = if fraud > legit {
            Label::Fraudulent
        } else {
            Label::Legitimate
        };
        if label != argmax {
            return Err(FraudError::InferenceError(format!(
                "classifier label {label} disagrees with probabilities [{legit}, {fraud}]"
            )));
        }

        Ok(PredictionResult {
            label,
            probability_legitimate: legit,
            probability_fraudulent: fraud,
        })
    }
}

fn normalize(proba: [f64; 2]) -> Result<[f64; 2], FraudError> {
    if proba.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
        return Err(FraudError::InferenceError(format!(
            "probabilities out of range: {proba:?}"
        )));
    }
    let total = proba[0] + proba[1];
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(FraudError::InferenceError(format!(
            "probabilities sum to {total}, not 1"
        )));
    }
    let legit = proba[0] / total;
    Ok([legit, 1.0 - legit])
}
