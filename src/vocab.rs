//! Fixed categorical vocabularies and the label encoders fitted over them.
//!
//! Codes are each label's rank in the sorted, de-duplicated vocabulary. The
//! fraud model was trained against exactly this assignment, so the ordering
//! is part of the model contract.

use crate::error::FraudError;

pub const RACE_LABELS: [&str; 5] = ["White", "Black", "Asian", "Hispanic", "Other"];

pub const STATE_CODES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA", "KS",
    "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY",
    "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV",
    "WI", "WY",
];

/// Gender is a fixed two-entry table, not a fitted encoder.
pub const GENDER_CODES: [(&str, u32); 2] = [("Female", 0), ("Male", 1)];

pub fn encode_gender(label: &str) -> Result<u32, FraudError> {
    GENDER_CODES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, code)| *code)
        .ok_or_else(|| {
            FraudError::invalid("Gender", format!("{label:?} is not one of Female, Male"))
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    field: &'static str,
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(field: &'static str, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        LabelEncoder { field, classes }
    }

    pub fn transform(&self, label: &str) -> Result<u32, FraudError> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .map(|rank| rank as u32)
            .map_err(|_| FraudError::unknown(self.field, label))
    }

    /// Fitted labels in code order; what a form offers as choices.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn field(&self) -> &'static str {
        self.field
    }
}

/// Encoders built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Vocabularies {
    pub race: LabelEncoder,
    pub state: LabelEncoder,
}

impl Vocabularies {
    pub fn fitted() -> Self {
        Vocabularies {
            race: LabelEncoder::fit("Race", RACE_LABELS),
            state: LabelEncoder::fit("State", STATE_CODES),
        }
    }
}

impl Default for Vocabularies {
    fn default() -> Self {
        Self::fitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_codes_follow_sorted_order() {
        let vocab = Vocabularies::fitted();
        assert_eq!(vocab.race.transform("Asian"), Ok(0));
        assert_eq!(vocab.race.transform("Black"), Ok(1));
        assert_eq!(vocab.race.transform("Hispanic"), Ok(2));
        assert_eq!(vocab.race.transform("Other"), Ok(3));
        assert_eq!(vocab.race.transform("White"), Ok(4));
    }

    #[test]
    fn test_state_codes_follow_sorted_order() {
        let vocab = Vocabularies::fitted();
        assert_eq!(vocab.state.classes().len(), 50);
        assert_eq!(vocab.state.transform("AK"), Ok(0));
        assert_eq!(vocab.state.transform("AL"), Ok(1));
        assert_eq!(vocab.state.transform("AR"), Ok(2));
        assert_eq!(vocab.state.transform("AZ"), Ok(3));
        assert_eq!(vocab.state.transform("CA"), Ok(4));
        assert_eq!(vocab.state.transform("IA"), Ok(11));
        assert_eq!(vocab.state.transform("WY"), Ok(49));
    }

    #[test]
    fn test_unknown_label() {
        let vocab = Vocabularies::fitted();
        assert_eq!(
            vocab.race.transform("Martian"),
            Err(FraudError::unknown("Race", "Martian"))
        );
        // case matters, the form offers exact labels
        assert!(vocab.state.transform("ca").is_err());
        assert!(vocab.state.transform("DC").is_err());
    }

    #[test]
    fn test_fit_dedups() {
        let encoder = LabelEncoder::fit("Letter", ["b", "a", "b", "c"]);
        assert_eq!(encoder.classes(), &["a", "b", "c"]);
        assert_eq!(encoder.transform("c"), Ok(2));
    }

    #[test]
    fn test_gender_table() {
        assert_eq!(encode_gender("Female"), Ok(0));
        assert_eq!(encode_gender("Male"), Ok(1));
        assert!(matches!(
            encode_gender("f"),
            Err(FraudError::InvalidInput { .. })
        ));
    }
}
