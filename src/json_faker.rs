use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use fake::Fake;
use fake::faker::address::en::CityName;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::encoder::{MAX_COVERAGE_MONTHS, MAX_DURATION_DAYS};
use crate::schema::{FormSchema, RawClaimInput};
use crate::vocab::{GENDER_CODES, RACE_LABELS, STATE_CODES};

/// Generate a random submission that the encoder accepts under `schema`.
pub fn fake_submission(schema: &FormSchema) -> RawClaimInput {
    let mut rng = rand::rng();

    let chronic_conditions = schema
        .conditions
        .iter()
        .map(|condition| {
            let answer = schema
                .flag_scheme
                .answers()
                .choose(&mut rng)
                .copied()
                .unwrap_or("No");
            (*condition, answer.to_string())
        })
        .collect();

    let claim_days = rng.random_range(0..=30);
    RawClaimInput {
        claim_amount_reimbursed: (rng.random_range(0..=60_000) / 10 * 10) as f64,
        deductible_amount_paid: [0.0, 1068.0].choose(&mut rng).copied().unwrap_or(0.0),
        annual_reimbursement_amount: schema
            .collect_annual_amounts
            .then(|| rng.random_range(0.0..100_000.0f64).round()),
        annual_deductible_amount: schema
            .collect_annual_amounts
            .then(|| rng.random_range(0.0..10_000.0f64).round()),
        gender: GENDER_CODES
            .choose(&mut rng)
            .map(|(name, _)| name.to_string())
            .unwrap_or_default(),
        race: RACE_LABELS.choose(&mut rng).copied().unwrap_or("Other").to_string(),
        state: STATE_CODES.choose(&mut rng).copied().unwrap_or("CA").to_string(),
        county: CityName().fake(),
        part_a_coverage_months: schema
            .collect_coverage_months
            .then(|| rng.random_range(0..=MAX_COVERAGE_MONTHS)),
        part_b_coverage_months: schema
            .collect_coverage_months
            .then(|| rng.random_range(0..=MAX_COVERAGE_MONTHS)),
        claim_duration_days: claim_days,
        hospital_stay_days: rng.random_range(0..=claim_days.min(MAX_DURATION_DAYS)),
        chronic_conditions,
    }
}

/// Write `n` fake submissions as JSON lines to `path`.
pub fn write_fake_submissions_jsonl(
    path: impl AsRef<Path>,
    n: usize,
    schema: &FormSchema,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for _ in 0..n {
        let submission = fake_submission(schema);
        let json = serde_json::to_string(&submission)?;
        writeln!(writer, "{}", json)?;
    }
    writer.flush()?;
    Ok(())
}
