use colored::Colorize;
use prettytable::{Table, row};
use tokio::sync::mpsc::Receiver;

use crate::invoker::PredictionResult;
use crate::message::{ScoreOutcome, ScoreRecord};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub scored: usize,
    pub fraudulent: usize,
    pub legitimate: usize,
    pub rejected: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &ScoreOutcome) {
        match outcome.prediction() {
            Some(result) if result.is_fraudulent() => {
                self.scored += 1;
                self.fraudulent += 1;
            }
            Some(_) => {
                self.scored += 1;
                self.legitimate += 1;
            }
            None => self.rejected += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.scored + self.rejected
    }
}

/// Headline for one prediction, worded the way the claim form shows it.
pub fn headline(result: &PredictionResult) -> String {
    let confidence = result.confidence() * 100.0;
    if result.is_fraudulent() {
        format!("Potential Fraud Detected (Confidence: {confidence:.2}%)")
    } else {
        format!("No Fraud Detected (Confidence: {confidence:.2}%)")
    }
}

pub fn details(result: &PredictionResult) -> [String; 2] {
    [
        format!("Not Fraudulent: {:.2}%", result.probability_legitimate * 100.0),
        format!("Fraudulent: {:.2}%", result.probability_fraudulent * 100.0),
    ]
}

/// Drain score records, print each one, and summarize at the end.
pub async fn run_reporter(mut rx: Receiver<ScoreRecord>, json: bool) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let mut table = Table::new();
    table.add_row(row!["Submission", "Result", "Not Fraudulent", "Fraudulent", "Scored At"]);

    while let Some(record) = rx.recv().await {
        summary.record(&record.outcome);
        if json {
            println!("{}", serde_json::to_string(&record)?);
            continue;
        }
        let scored_at = record.scored_at.format("%H:%M:%S").to_string();
        match &record.outcome {
            ScoreOutcome::Scored(result) => {
                let [legit, fraud] = details(result);
                table.add_row(row![record.submission_id, headline(result), legit, fraud, scored_at]);
            }
            ScoreOutcome::Rejected { error, .. } => {
                table.add_row(row![record.submission_id, format!("Rejected: {error}"), "-", "-", scored_at]);
            }
        }
    }

    if !json {
        table.printstd();
        print_summary(&summary);
    }
    Ok(summary)
}

pub fn print_summary(summary: &BatchSummary) {
    println!("\n--- Fraud Screening Summary ---");
    println!("Submissions: {}", summary.total());
    println!("Scored: {}", summary.scored);
    println!("{}", format!("Potential fraud: {}", summary.fraudulent).red());
    println!("{}", format!("No fraud detected: {}", summary.legitimate).green());
    println!("{}", format!("Rejected: {}", summary.rejected).yellow());
}
