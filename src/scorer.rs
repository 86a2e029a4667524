use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::{Receiver, Sender};

use crate::encoder::FeatureEncoder;
use crate::error::FraudError;
use crate::features::{CanonicalFeatureVector, ExtraFeaturePolicy, reconcile};
use crate::invoker::{InferenceInvoker, PredictionResult};
use crate::logging::log_submission_event;
use crate::message::{ScoreOutcome, ScoreRecord, Submission};
use crate::model::Classifier;
use crate::schema::RawClaimInput;

/// Encoder, reconciliation and classifier wired together.
///
/// Built once at startup; `score` takes `&self` so one scorer can serve any
/// number of concurrent submissions.
#[derive(Clone)]
pub struct Scorer {
    encoder: FeatureEncoder,
    invoker: InferenceInvoker,
    policy: ExtraFeaturePolicy,
}

impl Scorer {
    /// Fails with `InvalidSchema` for a malformed form, or `SchemaMismatch` if
    /// the form can never satisfy the classifier.
    pub fn new(
        encoder: FeatureEncoder,
        classifier: Arc<dyn Classifier>,
        policy: ExtraFeaturePolicy,
    ) -> Result<Self, FraudError> {
        encoder.schema().validate()?;

        let produced: CanonicalFeatureVector = encoder
            .feature_names()
            .into_iter()
            .map(|name| (name, 0.0))
            .collect();
        reconcile(&produced, classifier.feature_names(), policy)?;

        Ok(Scorer {
            encoder,
            invoker: InferenceInvoker::new(classifier),
            policy,
        })
    }

    pub fn try_score(&self, input: &RawClaimInput) -> Result<PredictionResult, FraudError> {
        let vector = self.encoder.encode(input)?;
        let reconciled = reconcile(&vector, self.invoker.manifest(), self.policy)?;
        self.invoker.infer(&reconciled)
    }

    /// Score one submission; every failure becomes a `Rejected` outcome.
    pub fn score(&self, submission_id: &str, input: &RawClaimInput) -> ScoreOutcome {
        match self.try_score(input) {
            Ok(result) => {
                tracing::debug!(
                    submission = submission_id,
                    label = %result.label,
                    p_fraud = result.probability_fraudulent,
                    "scored"
                );
                ScoreOutcome::Scored(result)
            }
            Err(error) => {
                if error.is_fatal() {
                    tracing::error!(submission = submission_id, %error, "encoder and classifier disagree");
                } else if error.is_rejection() {
                    tracing::warn!(submission = submission_id, %error, "submission rejected");
                } else {
                    tracing::error!(submission = submission_id, %error, "prediction failed");
                }
                ScoreOutcome::rejected(error)
            }
        }
    }
}

/// Scorer task that processes submissions received over a channel.
///
/// Each submission is scored on the blocking pool and records are forwarded
/// in arrival order. Submissions that never parsed are rejected unscored. Returns the number of records sent once the input
/// channel closes.
pub async fn run_scorer(
    scorer: Arc<Scorer>,
    mut rx: Receiver<Submission>,
    tx: Sender<ScoreRecord>,
    verbose: bool,
) -> anyhow::Result<usize> {
    if verbose {
        log_submission_event("scorer", "-", "start", "Starting scorer task");
    }
    let mut sent = 0;

    while let Some(submission) = rx.recv().await {
        if verbose {
            log_submission_event(
                "scorer",
                &submission.id,
                "received_submission",
                &format!("Received submission {}", submission.id),
            );
        }
        let worker = scorer.clone();
        let Submission { id, input } = submission;
        let (id, outcome) = match input {
            Ok(input) => {
                tokio::task::spawn_blocking(move || {
                    let outcome = worker.score(&id, &input);
                    (id, outcome)
                })
                .await?
            }
            Err(error) => {
                tracing::warn!(submission = %id, %error, "submission rejected");
                (id, ScoreOutcome::rejected(error))
            }
        };

        let record = ScoreRecord {
            submission_id: id,
            outcome,
            scored_at: Utc::now(),
        };
        if tx.send(record).await.is_err() {
            return Err(anyhow::anyhow!("Score record channel dropped"));
        }
        sent += 1;
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::Label;
    use crate::model::{DecisionTree, ForestModel, TreeNode};
    use crate::schema::{FormSchema, mock_input};
    use crate::vocab::Vocabularies;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fraudulent whenever the reimbursed amount exceeds 10k.
    fn forest(names: Vec<&str>) -> Arc<dyn Classifier> {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 10_000.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: [8.0, 2.0] },
                TreeNode::Leaf { value: [1.0, 9.0] },
            ],
        };
        Arc::new(ForestModel::new(names.into_iter().map(String::from).collect(), vec![tree]).unwrap())
    }

    fn scorer(schema: FormSchema, manifest: Vec<&str>, policy: ExtraFeaturePolicy) -> Result<Scorer, FraudError> {
        let encoder = FeatureEncoder::new(Arc::new(Vocabularies::fitted()), schema);
        Scorer::new(encoder, forest(manifest), policy)
    }

    #[test]
    fn test_score_scenario() {
        let scorer = scorer(
            FormSchema::basic(),
            FormSchema::basic().feature_names(),
            ExtraFeaturePolicy::Reject,
        )
        .unwrap();

        let result = scorer.try_score(&mock_input()).unwrap();
        assert_eq!(result.label, Label::Legitimate);
        assert!((result.probability_legitimate - 0.8).abs() < 1e-12);
        assert!((result.probability_legitimate + result.probability_fraudulent - 1.0).abs() < 1e-9);

        let mut input = mock_input();
        input.claim_amount_reimbursed = 25_000.0;
        assert_eq!(scorer.try_score(&input).unwrap().label, Label::Fraudulent);
    }

    #[test]
    fn test_startup_rejects_incompatible_schema() {
        let result = scorer(
            FormSchema::basic(),
            FormSchema::full().feature_names(),
            ExtraFeaturePolicy::Drop,
        );
        match result {
            Err(FraudError::SchemaMismatch { missing, unexpected }) => {
                assert!(missing.contains(&"ChronicCond_stroke".to_string()), "{missing:?}");
                assert!(unexpected.is_empty());
            }
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("Expected SchemaMismatch"),
        }
    }

    #[test]
    fn test_extra_features_need_drop_policy() {
        let manifest = FormSchema::basic().feature_names();
        assert!(scorer(FormSchema::full(), manifest.clone(), ExtraFeaturePolicy::Reject).is_err());

        let scorer = scorer(FormSchema::full(), manifest, ExtraFeaturePolicy::Drop).unwrap();
        assert!(scorer.score("s1", &mock_input()).prediction().is_some());
    }

    #[test]
    fn test_rejections_never_reach_classifier() {
        struct Counting(AtomicUsize, Vec<String>);
        impl Classifier for Counting {
            fn feature_names(&self) -> &[String] {
                &self.1
            }
            fn predict(&self, _: &[f64]) -> Result<u8, FraudError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            }
            fn predict_proba(&self, _: &[f64]) -> Result<[f64; 2], FraudError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok([1.0, 0.0])
            }
        }

        let names = FormSchema::basic().feature_names().into_iter().map(String::from).collect();
        let counting = Arc::new(Counting(AtomicUsize::new(0), names));
        let encoder = FeatureEncoder::new(Arc::new(Vocabularies::fitted()), FormSchema::basic());
        let scorer = Scorer::new(encoder, counting.clone(), ExtraFeaturePolicy::Reject).unwrap();

        let mut input = mock_input();
        input.race = "Martian".to_string();
        let outcome = scorer.score("s1", &input);
        assert_eq!(outcome, ScoreOutcome::rejected(FraudError::unknown("Race", "Martian")));
        assert_eq!(counting.0.load(Ordering::SeqCst), 0);

        scorer.score("s2", &mock_input());
        assert_eq!(counting.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_scorer() {
        let scorer = Arc::new(
            scorer(
                FormSchema::basic(),
                FormSchema::basic().feature_names(),
                ExtraFeaturePolicy::Reject,
            )
            .unwrap(),
        );
        let (in_tx, in_rx) = tokio::sync::mpsc::channel(4);
        let (out_tx, mut out_rx) = tokio::sync::mpsc::channel(4);
        let handle = tokio::spawn(run_scorer(scorer, in_rx, out_tx, true));

        let mut bad = mock_input();
        bad.hospital_stay_days = 101;
        in_tx
            .send(Submission::parsed("a", mock_input()))
            .await
            .unwrap();
        in_tx
            .send(Submission::parsed("b", bad))
            .await
            .unwrap();
        in_tx
            .send(Submission::unreadable(
                "c",
                FraudError::invalid("submission", "missing field `race`"),
            ))
            .await
            .unwrap();
        drop(in_tx);

        let first = out_rx.recv().await.expect("Expected a record");
        assert_eq!(first.submission_id, "a");
        assert!(first.outcome.prediction().is_some());

        let second = out_rx.recv().await.expect("Expected a record");
        assert_eq!(second.submission_id, "b");
        assert!(matches!(
            second.outcome.error(),
            Some(FraudError::InvalidInput { .. })
        ));

        let third = out_rx.recv().await.expect("Expected a record");
        assert_eq!(third.submission_id, "c");
        assert_eq!(
            third.outcome,
            ScoreOutcome::rejected(FraudError::invalid("submission", "missing field `race`"))
        );

        assert_eq!(handle.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_run_scorer_output_dropped() {
        let scorer = Arc::new(
            scorer(
                FormSchema::basic(),
                FormSchema::basic().feature_names(),
                ExtraFeaturePolicy::Reject,
            )
            .unwrap(),
        );
        let (in_tx, in_rx) = tokio::sync::mpsc::channel(1);
        let (out_tx, out_rx) = tokio::sync::mpsc::channel(1);
        drop(out_rx);
        let handle = tokio::spawn(run_scorer(scorer, in_rx, out_tx, false));
        in_tx
            .send(Submission::parsed("a", mock_input()))
            .await
            .unwrap();
        let result = handle.await.unwrap();
        assert!(result.is_err(), "Expected error when output channel is dropped");
    }
}
