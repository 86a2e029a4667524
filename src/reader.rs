use std::path::Path;

use anyhow::Context;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Sender;

use crate::error::FraudError;
use crate::message::Submission;
use crate::schema::RawClaimInput;

/// Stream submissions from a JSONL file. Ids are `line-<n>`, 1-based.
///
/// Blank lines are ignored. A line that does not parse is still sent, carrying
/// an `InvalidInput` error so it is reported downstream as a rejection.
/// Returns the number of submissions sent.
pub async fn stream_submissions(
    path: impl AsRef<Path>,
    sender: Sender<Submission>,
) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .with_context(|| format!("opening submissions {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();
    let mut line_no = 0;
    let mut sent = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let id = format!("line-{line_no}");
        let submission = match serde_json::from_str::<RawClaimInput>(&line) {
            Ok(input) => Submission::parsed(id, input),
            Err(err) => {
                tracing::warn!(submission = %id, %err, "unreadable submission");
                Submission::unreadable(id, FraudError::invalid("submission", err.to_string()))
            }
        };
        if sender.send(submission).await.is_err() {
            tracing::warn!("scorer receiver dropped");
            break;
        }
        sent += 1;
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mock_input;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_stream_submissions_forwards_bad_lines() {
        let mut tmpfile = NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&mock_input()).unwrap();
        writeln!(tmpfile, "{}", json).unwrap();
        writeln!(tmpfile).unwrap();
        writeln!(tmpfile, "{{not json").unwrap();
        writeln!(tmpfile, "{}", json).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let sent = stream_submissions(tmpfile.path(), tx).await.unwrap();
        assert_eq!(sent, 3);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.id, "line-1");
        assert_eq!(first.input.unwrap().race, "White");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.id, "line-3");
        assert!(matches!(
            second.input,
            Err(FraudError::InvalidInput { ref field, .. }) if field == "submission"
        ));
        let third = rx.recv().await.unwrap();
        assert_eq!(third.id, "line-4");
        assert!(third.input.is_ok());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_form_shaped_lines_that_fail_to_parse() {
        let mut missing_race = serde_json::to_value(mock_input()).unwrap();
        missing_race.as_object_mut().unwrap().remove("race");
        let mut fractional_days = serde_json::to_value(mock_input()).unwrap();
        fractional_days["claim_duration_days"] = serde_json::json!(2.5);

        let mut tmpfile = NamedTempFile::new().unwrap();
        writeln!(tmpfile, "{missing_race}").unwrap();
        writeln!(tmpfile, "{fractional_days}").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        assert_eq!(stream_submissions(tmpfile.path(), tx).await.unwrap(), 2);

        for expected in ["line-1", "line-2"] {
            let submission = rx.recv().await.unwrap();
            assert_eq!(submission.id, expected);
            let err = submission.input.unwrap_err();
            assert_eq!(err.kind(), "invalid_input");
            assert!(err.is_rejection());
        }
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let result = stream_submissions("/definitely/not/here.jsonl", tx).await;
        assert!(result.is_err());
    }
}
