use std::sync::Arc;

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::error::FraudError;
use crate::features::CanonicalFeatureVector;
use crate::schema::{self, FormSchema, RawClaimInput};
use crate::vocab::{Vocabularies, encode_gender};

pub const COUNTY_HASH_SEED: u64 = 0;
pub const COUNTY_BUCKETS: u64 = 100;

pub const MAX_DURATION_DAYS: i64 = 100;
pub const MAX_COVERAGE_MONTHS: i64 = 12;

/// Bucket a free-text county name into `0..COUNTY_BUCKETS`.
///
/// XXH3-64 with a fixed seed, so buckets are identical across runs and
/// machines. Unrelated names can and do collide.
pub fn county_bucket(county: &str) -> u32 {
    (xxh3_64_with_seed(county.as_bytes(), COUNTY_HASH_SEED) % COUNTY_BUCKETS) as u32
}

/// Maps raw form submissions to the numeric vector the classifier consumes.
///
/// The vocabularies are fitted once and shared; encoding never mutates them.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    vocab: Arc<Vocabularies>,
    schema: FormSchema,
}

impl FeatureEncoder {
    pub fn new(vocab: Arc<Vocabularies>, schema: FormSchema) -> Self {
        FeatureEncoder { vocab, schema }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        self.schema.feature_names()
    }

    pub fn encode(&self, input: &RawClaimInput) -> Result<CanonicalFeatureVector, FraudError> {
        let mut out = CanonicalFeatureVector::with_capacity(self.schema.feature_names().len());

        out.push(
            schema::CLAIM_AMOUNT_REIMBURSED,
            amount(schema::CLAIM_AMOUNT_REIMBURSED, input.claim_amount_reimbursed)?,
        );
        out.push(
            schema::DEDUCTIBLE_AMOUNT_PAID,
            amount(schema::DEDUCTIBLE_AMOUNT_PAID, input.deductible_amount_paid)?,
        );
        if self.schema.collect_annual_amounts {
            out.push(
                schema::ANNUAL_REIMBURSEMENT_AMOUNT,
                amount(
                    schema::ANNUAL_REIMBURSEMENT_AMOUNT,
                    required(schema::ANNUAL_REIMBURSEMENT_AMOUNT, input.annual_reimbursement_amount)?,
                )?,
            );
            out.push(
                schema::ANNUAL_DEDUCTIBLE_AMOUNT,
                amount(
                    schema::ANNUAL_DEDUCTIBLE_AMOUNT,
                    required(schema::ANNUAL_DEDUCTIBLE_AMOUNT, input.annual_deductible_amount)?,
                )?,
            );
        }

        out.push(schema::GENDER, encode_gender(&input.gender)? as f64);
        out.push(schema::RACE, self.vocab.race.transform(&input.race)? as f64);
        out.push(schema::STATE, self.vocab.state.transform(&input.state)? as f64);
        out.push(schema::COUNTY, county_bucket(&input.county) as f64);

        if self.schema.collect_coverage_months {
            for (name, months) in [
                (schema::PART_A_COVERAGE_MONTHS, input.part_a_coverage_months),
                (schema::PART_B_COVERAGE_MONTHS, input.part_b_coverage_months),
            ] {
                let months = in_range(name, required(name, months)?, MAX_COVERAGE_MONTHS)?;
                out.push(name, months);
            }
        }

        let scheme = self.schema.flag_scheme;
        for condition in &self.schema.conditions {
            let name = condition.feature_name();
            let answer = input
                .chronic_conditions
                .get(condition)
                .ok_or_else(|| FraudError::invalid(name, "no answer given"))?;
            let code = scheme.encode(answer).ok_or_else(|| {
                FraudError::invalid(
                    name,
                    format!("{answer:?} is not one of {}", scheme.answers().join(", ")),
                )
            })?;
            out.push(name, code);
        }

        out.push(
            schema::CLAIM_DURATION,
            in_range(schema::CLAIM_DURATION, input.claim_duration_days, MAX_DURATION_DAYS)?,
        );
        out.push(
            schema::HOSPITAL_STAY_DURATION,
            in_range(
                schema::HOSPITAL_STAY_DURATION,
                input.hospital_stay_days,
                MAX_DURATION_DAYS,
            )?,
        );

        Ok(out)
    }
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, FraudError> {
    value.ok_or_else(|| FraudError::invalid(field, "required by the active form schema"))
}

fn amount(field: &str, value: f64) -> Result<f64, FraudError> {
    if !value.is_finite() {
        return Err(FraudError::invalid(field, "amount must be a finite number"));
    }
    if value < 0.0 {
        return Err(FraudError::invalid(field, format!("{value} is negative")));
    }
    Ok(value)
}

// Out-of-range values are rejected, never clamped.
fn in_range(field: &str, value: i64, max: i64) -> Result<f64, FraudError> {
    if !(0..=max).contains(&value) {
        return Err(FraudError::invalid(
            field,
            format!("{value} is outside 0..={max}"),
        ));
    }
    Ok(value as f64)
}
