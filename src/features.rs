use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::FraudError;

/// Ordered feature name → value pairs, one per model input column.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CanonicalFeatureVector {
    entries: Vec<(String, f64)>,
}

impl CanonicalFeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CanonicalFeatureVector {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Values in entry order; what the classifier actually consumes.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for CanonicalFeatureVector {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        CanonicalFeatureVector {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

/// What to do with features the encoder produced but the classifier never saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraFeaturePolicy {
    #[default]
    Reject,
    Drop,
}

/// Reorder and select `vector` to match `manifest` exactly.
///
/// Missing features always fail. Extras fail under `Reject` and are silently
/// removed under `Drop`.
pub fn reconcile<S: AsRef<str>>(
    vector: &CanonicalFeatureVector,
    manifest: &[S],
    policy: ExtraFeaturePolicy,
) -> Result<CanonicalFeatureVector, FraudError> {
    let mut by_name: HashMap<&str, f64> = HashMap::with_capacity(vector.len());
    for (name, value) in vector.entries() {
        if by_name.insert(name.as_str(), *value).is_some() {
            return Err(FraudError::InvalidSchema(format!(
                "feature {name} produced more than once"
            )));
        }
    }

    let mut expected: HashSet<&str> = HashSet::with_capacity(manifest.len());
    for name in manifest {
        if !expected.insert(name.as_ref()) {
            return Err(FraudError::InvalidSchema(format!(
                "classifier manifest lists {} more than once",
                name.as_ref()
            )));
        }
    }

    let missing: Vec<String> = manifest
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !by_name.contains_key(name))
        .map(String::from)
        .collect();
    let extras: Vec<String> = vector
        .names()
        .filter(|n| !expected.contains(n))
        .map(String::from)
        .collect();

    let unexpected = match policy {
        ExtraFeaturePolicy::Reject => extras,
        ExtraFeaturePolicy::Drop => {
            if !extras.is_empty() {
                tracing::debug!(dropped = %extras.join(","), "dropping features unknown to classifier");
            }
            Vec::new()
        }
    };
    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(FraudError::SchemaMismatch { missing, unexpected });
    }

    Ok(manifest
        .iter()
        .map(|name| (name.as_ref(), by_name[name.as_ref()]))
        .collect())
}
