use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quiz variant. The base weight equals the question count, so longer tests
/// carry proportionally more confidence in the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestCategory {
    #[serde(rename = "mbti-8")]
    Mbti8,
    #[serde(rename = "mbti-24")]
    Mbti24,
    #[serde(rename = "mbti-100")]
    Mbti100,
}

impl TestCategory {
    pub fn base_weight(self) -> f64 {
        match self {
            TestCategory::Mbti8 => 8.0,
            TestCategory::Mbti24 => 24.0,
            TestCategory::Mbti100 => 100.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestCategory::Mbti8 => "mbti-8",
            TestCategory::Mbti24 => "mbti-24",
            TestCategory::Mbti100 => "mbti-100",
        }
    }
}

impl std::fmt::Display for TestCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the eight trait keys, grouped into four complementary pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitLetter {
    Extraversion,
    Introversion,
    Sensing,
    Intuition,
    Thinking,
    Feeling,
    Judging,
    Perceiving,
}

/// The four dichotomies in canonical order. The first letter of each pair is
/// the one whose weighted percentage decides the dominant type.
pub const TRAIT_PAIRS: [(TraitLetter, TraitLetter); 4] = [
    (TraitLetter::Extraversion, TraitLetter::Introversion),
    (TraitLetter::Sensing, TraitLetter::Intuition),
    (TraitLetter::Thinking, TraitLetter::Feeling),
    (TraitLetter::Judging, TraitLetter::Perceiving),
];

impl TraitLetter {
    pub fn letter(self) -> char {
        match self {
            TraitLetter::Extraversion => 'E',
            TraitLetter::Introversion => 'I',
            TraitLetter::Sensing => 'S',
            TraitLetter::Intuition => 'N',
            TraitLetter::Thinking => 'T',
            TraitLetter::Feeling => 'F',
            TraitLetter::Judging => 'J',
            TraitLetter::Perceiving => 'P',
        }
    }
}

/// Percentages for all eight trait keys, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitPercentages {
    pub extraversion: f64,
    pub introversion: f64,
    pub sensing: f64,
    pub intuition: f64,
    pub thinking: f64,
    pub feeling: f64,
    pub judging: f64,
    pub perceiving: f64,
}

impl TraitPercentages {
    pub fn get(&self, letter: TraitLetter) -> f64 {
        match letter {
            TraitLetter::Extraversion => self.extraversion,
            TraitLetter::Introversion => self.introversion,
            TraitLetter::Sensing => self.sensing,
            TraitLetter::Intuition => self.intuition,
            TraitLetter::Thinking => self.thinking,
            TraitLetter::Feeling => self.feeling,
            TraitLetter::Judging => self.judging,
            TraitLetter::Perceiving => self.perceiving,
        }
    }

    pub fn set(&mut self, letter: TraitLetter, value: f64) {
        match letter {
            TraitLetter::Extraversion => self.extraversion = value,
            TraitLetter::Introversion => self.introversion = value,
            TraitLetter::Sensing => self.sensing = value,
            TraitLetter::Intuition => self.intuition = value,
            TraitLetter::Thinking => self.thinking = value,
            TraitLetter::Feeling => self.feeling = value,
            TraitLetter::Judging => self.judging = value,
            TraitLetter::Perceiving => self.perceiving = value,
        }
    }
}

/// A recorded quiz result. Never mutated; a later submission for the same
/// category replaces the earlier row wholesale.
#[derive(Debug, Clone)]
pub struct TestSubmission {
    pub user_id: Uuid,
    pub category: TestCategory,
    pub claimed_type: String,
    pub percentages: TraitPercentages,
    pub taken_on: NaiveDate,
}

/// One entry of the per-category breakdown behind an aggregated profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeightEntry {
    pub category: TestCategory,
    pub base_weight: f64,
}

/// The weighted aggregate over a user's current submission set. Recomputed
/// and overwritten on every new submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedProfile {
    pub mbti_type: String,
    pub percentages: TraitPercentages,
    pub breakdown: Vec<CategoryWeightEntry>,
    pub profile_title: String,
}

/// A stored profile joined with its owner, as read back for display.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub user_name: String,
    pub user_email: String,
    pub mbti_type: String,
    pub percentages: TraitPercentages,
    pub breakdown: Vec<CategoryWeightEntry>,
    pub profile_title: String,
}

/// A submission joined with its owner, for the report's recent-activity list.
#[derive(Debug, Clone)]
pub struct SubmissionLogEntry {
    pub user_name: String,
    pub user_email: String,
    pub category: TestCategory,
    pub claimed_type: String,
    pub taken_on: NaiveDate,
}
