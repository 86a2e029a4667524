use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::FraudError;

/// One form submission, exactly as the user filled it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClaimInput {
    pub claim_amount_reimbursed: f64,
    pub deductible_amount_paid: f64,
    #[serde(default)]
    pub annual_reimbursement_amount: Option<f64>,
    #[serde(default)]
    pub annual_deductible_amount: Option<f64>,
    pub gender: String,
    pub race: String,
    pub state: String,
    pub county: String,
    #[serde(default)]
    pub part_a_coverage_months: Option<i64>,
    #[serde(default)]
    pub part_b_coverage_months: Option<i64>,
    pub claim_duration_days: i64,
    pub hospital_stay_days: i64,
    /// Answers keyed by condition: "No", "Yes" or (tri-state only) "Unknown".
    #[serde(default)]
    pub chronic_conditions: BTreeMap<ChronicCondition, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChronicCondition {
    Alzheimer,
    HeartFailure,
    KidneyDisease,
    Cancer,
    ObstructivePulmonary,
    Depression,
    Diabetes,
    IschemicHeart,
    Osteoporosis,
    RheumatoidArthritis,
    Stroke,
}

impl ChronicCondition {
    pub const ALL: [ChronicCondition; 11] = [
        ChronicCondition::Alzheimer,
        ChronicCondition::HeartFailure,
        ChronicCondition::KidneyDisease,
        ChronicCondition::Cancer,
        ChronicCondition::ObstructivePulmonary,
        ChronicCondition::Depression,
        ChronicCondition::Diabetes,
        ChronicCondition::IschemicHeart,
        ChronicCondition::Osteoporosis,
        ChronicCondition::RheumatoidArthritis,
        ChronicCondition::Stroke,
    ];

    /// Column name the classifier was trained on (spelling included).
    pub fn feature_name(&self) -> &'static str {
        match self {
            ChronicCondition::Alzheimer => "ChronicCond_Alzheimer",
            ChronicCondition::HeartFailure => "ChronicCond_Heartfailure",
            ChronicCondition::KidneyDisease => "ChronicCond_KidneyDisease",
            ChronicCondition::Cancer => "ChronicCond_Cancer",
            ChronicCondition::ObstructivePulmonary => "ChronicCond_ObstrPulmonary",
            ChronicCondition::Depression => "ChronicCond_Depression",
            ChronicCondition::Diabetes => "ChronicCond_Diabetes",
            ChronicCondition::IschemicHeart => "ChronicCond_IschemicHeart",
            ChronicCondition::Osteoporosis => "ChronicCond_Osteoporasis",
            ChronicCondition::RheumatoidArthritis => "ChronicCond_rheumatoidarthritis",
            ChronicCondition::Stroke => "ChronicCond_stroke",
        }
    }
}

/// How a chronic-condition answer becomes a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagScheme {
    /// No:0, Yes:1
    Binary,
    /// No:0, Yes:1, Unknown:2
    TriState,
}

impl FlagScheme {
    pub fn answers(&self) -> &'static [&'static str] {
        match self {
            FlagScheme::Binary => &["No", "Yes"],
            FlagScheme::TriState => &["No", "Yes", "Unknown"],
        }
    }

    pub fn encode(&self, answer: &str) -> Option<f64> {
        self.answers()
            .iter()
            .position(|a| *a == answer)
            .map(|code| code as f64)
    }
}

pub const CLAIM_AMOUNT_REIMBURSED: &str = "InscClaimAmtReimbursed";
pub const DEDUCTIBLE_AMOUNT_PAID: &str = "DeductibleAmtPaid";
pub const ANNUAL_REIMBURSEMENT_AMOUNT: &str = "IPAnnualReimbursementAmt";
pub const ANNUAL_DEDUCTIBLE_AMOUNT: &str = "IPAnnualDeductibleAmt";
pub const GENDER: &str = "Gender";
pub const RACE: &str = "Race";
pub const STATE: &str = "State";
pub const COUNTY: &str = "County";
pub const PART_A_COVERAGE_MONTHS: &str = "NoOfMonths_PartACov";
pub const PART_B_COVERAGE_MONTHS: &str = "NoOfMonths_PartBCov";
pub const CLAIM_DURATION: &str = "ClaimDuration";
pub const HOSPITAL_STAY_DURATION: &str = "HospitalStayDuration";

/// Fewest chronic-condition questions any form deployment asks.
pub const MIN_CONDITIONS: usize = 3;

/// Which fields a deployment of the form collects, and how conditions are encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormSchema {
    pub conditions: Vec<ChronicCondition>,
    pub flag_scheme: FlagScheme,
    #[serde(default)]
    pub collect_annual_amounts: bool,
    #[serde(default)]
    pub collect_coverage_months: bool,
}

impl FormSchema {
    /// The three-condition form the fraud model was first trained on.
    pub fn basic() -> Self {
        FormSchema {
            conditions: vec![
                ChronicCondition::HeartFailure,
                ChronicCondition::Cancer,
                ChronicCondition::Osteoporosis,
            ],
            flag_scheme: FlagScheme::Binary,
            collect_annual_amounts: false,
            collect_coverage_months: false,
        }
    }

    pub fn extended() -> Self {
        FormSchema {
            conditions: vec![
                ChronicCondition::Alzheimer,
                ChronicCondition::HeartFailure,
                ChronicCondition::KidneyDisease,
                ChronicCondition::Cancer,
                ChronicCondition::ObstructivePulmonary,
                ChronicCondition::Depression,
                ChronicCondition::Diabetes,
                ChronicCondition::IschemicHeart,
                ChronicCondition::Osteoporosis,
            ],
            flag_scheme: FlagScheme::Binary,
            collect_annual_amounts: false,
            collect_coverage_months: true,
        }
    }

    pub fn full() -> Self {
        FormSchema {
            conditions: ChronicCondition::ALL.to_vec(),
            flag_scheme: FlagScheme::TriState,
            collect_annual_amounts: true,
            collect_coverage_months: true,
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "basic" => Some(Self::basic()),
            "extended" => Some(Self::extended()),
            "full" => Some(Self::full()),
            _ => None,
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading form schema {}", path.display()))?;
        let schema: FormSchema = serde_json::from_str(&raw)
            .with_context(|| format!("parsing form schema {}", path.display()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Conditions must be distinct, and between `MIN_CONDITIONS` and all of them.
    pub fn validate(&self) -> Result<(), FraudError> {
        let count = self.conditions.len();
        if !(MIN_CONDITIONS..=ChronicCondition::ALL.len()).contains(&count) {
            return Err(FraudError::InvalidSchema(format!(
                "form schema lists {count} conditions, expected {MIN_CONDITIONS}..={}",
                ChronicCondition::ALL.len()
            )));
        }
        let mut seen = HashSet::new();
        for condition in &self.conditions {
            if !seen.insert(condition) {
                return Err(FraudError::InvalidSchema(format!(
                    "form schema lists {} more than once",
                    condition.feature_name()
                )));
            }
        }
        Ok(())
    }

    /// Ordered feature names the encoder produces under this schema.
    pub fn feature_names(&self) -> Vec<&'static str> {
        let mut names = vec![CLAIM_AMOUNT_REIMBURSED, DEDUCTIBLE_AMOUNT_PAID];
        if self.collect_annual_amounts {
            names.extend([ANNUAL_REIMBURSEMENT_AMOUNT, ANNUAL_DEDUCTIBLE_AMOUNT]);
        }
        names.extend([GENDER, RACE, STATE, COUNTY]);
        if self.collect_coverage_months {
            names.extend([PART_A_COVERAGE_MONTHS, PART_B_COVERAGE_MONTHS]);
        }
        names.extend(self.conditions.iter().map(|c| c.feature_name()));
        names.extend([CLAIM_DURATION, HOSPITAL_STAY_DURATION]);
        names
    }
}

impl Default for FormSchema {
    fn default() -> Self {
        Self::basic()
    }
}

/// Mock submission for testing: every field the full schema collects, all answers "No".
pub fn mock_input() -> RawClaimInput {
    RawClaimInput {
        claim_amount_reimbursed: 0.0,
        deductible_amount_paid: 0.0,
        annual_reimbursement_amount: Some(0.0),
        annual_deductible_amount: Some(0.0),
        gender: "Female".to_string(),
        race: "White".to_string(),
        state: "CA".to_string(),
        county: "Default County".to_string(),
        part_a_coverage_months: Some(12),
        part_b_coverage_months: Some(12),
        claim_duration_days: 0,
        hospital_stay_days: 0,
        chronic_conditions: ChronicCondition::ALL
            .iter()
            .map(|c| (*c, "No".to_string()))
            .collect(),
    }
}
