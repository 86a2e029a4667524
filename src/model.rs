use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FraudError;

pub const LEGITIMATE: u8 = 0;
pub const FRAUDULENT: u8 = 1;

/// A pre-trained binary fraud classifier.
///
/// Implementations are loaded once and shared read-only between requests.
pub trait Classifier: Send + Sync {
    /// Ordered feature names the model was trained on.
    fn feature_names(&self) -> &[String];

    /// Class label: 0 legitimate, 1 fraudulent.
    fn predict(&self, features: &[f64]) -> Result<u8, FraudError>;

    /// `[p(legitimate), p(fraudulent)]`.
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], FraudError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class sample weights at the leaf, `[legitimate, fraudulent]`.
    Leaf { value: [f64; 2] },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk from the root, left when `x[feature] <= threshold`.
    fn leaf_distribution(&self, features: &[f64]) -> Result<[f64; 2], FraudError> {
        let mut idx = 0;
        // a valid tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => {
                    let total = value[0] + value[1];
                    return Ok([value[0] / total, value[1] / total]);
                }
            }
        }
        Err(FraudError::InferenceError(
            "decision tree traversal did not reach a leaf".to_string(),
        ))
    }

    fn validate(&self, tree_idx: usize, n_features: usize) -> Result<(), FraudError> {
        if self.nodes.is_empty() {
            return Err(FraudError::ModelLoad(format!("tree {tree_idx} has no nodes")));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(FraudError::ModelLoad(format!(
                            "tree {tree_idx} node {i} splits on feature {feature} of {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(FraudError::ModelLoad(format!(
                            "tree {tree_idx} node {i} has a non-finite threshold"
                        )));
                    }
                    // children always come after their parent, so traversal cannot cycle
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(FraudError::ModelLoad(format!(
                                "tree {tree_idx} node {i} has invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    let valid = value.iter().all(|v| v.is_finite() && *v >= 0.0)
                        && value[0] + value[1] > 0.0;
                    if !valid {
                        return Err(FraudError::ModelLoad(format!(
                            "tree {tree_idx} leaf {i} has invalid class weights {value:?}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A random forest exported to JSON, scored the way scikit-learn scores it:
/// each tree votes its normalized leaf distribution and the votes are averaged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    feature_names: Vec<String>,
    trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub fn new(feature_names: Vec<String>, trees: Vec<DecisionTree>) -> Result<Self, FraudError> {
        let model = ForestModel {
            feature_names,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(raw: &str) -> Result<Self, FraudError> {
        let model: ForestModel =
            serde_json::from_str(raw).map_err(|e| FraudError::ModelLoad(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<(), FraudError> {
        if self.feature_names.is_empty() {
            return Err(FraudError::ModelLoad("model declares no features".to_string()));
        }
        if self.trees.is_empty() {
            return Err(FraudError::ModelLoad("model has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.feature_names.len())?;
        }
        Ok(())
    }

    fn check_input(&self, features: &[f64]) -> Result<(), FraudError> {
        if features.len() != self.feature_names.len() {
            return Err(FraudError::InferenceError(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                features.len()
            )));
        }
        if let Some(pos) = features.iter().position(|v| !v.is_finite()) {
            return Err(FraudError::InferenceError(format!(
                "feature {} is not a finite number",
                self.feature_names[pos]
            )));
        }
        Ok(())
    }
}

impl Classifier for ForestModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f64]) -> Result<u8, FraudError> {
        let [legit, fraud] = self.predict_proba(features)?;
        // ties go to the first class
        Ok(if fraud > legit { FRAUDULENT } else { LEGITIMATE })
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], FraudError> {
        self.check_input(features)?;
        let mut sum = [0.0; 2];
        for tree in &self.trees {
            let [legit, fraud] = tree.leaf_distribution(features)?;
            sum[0] += legit;
            sum[1] += fraud;
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }
}

/// Load a serialized forest from disk. Called once at startup.
pub fn load_model(path: impl AsRef<Path>) -> Result<ForestModel, FraudError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| FraudError::ModelLoad(format!("{}: {e}", path.display())))?;
    let model = ForestModel::from_json(&raw)?;
    tracing::info!(
        path = %path.display(),
        trees = model.tree_count(),
        features = model.feature_names.len(),
        "loaded classifier"
    );
    Ok(model)
}
