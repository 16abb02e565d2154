use thiserror::Error;

use crate::models::{
    AggregatedProfile, CategoryWeightEntry, TestCategory, TestSubmission, TraitPercentages,
    TRAIT_PAIRS,
};

/// Intake must balance each pair to 100; float inputs get this much slack.
const PAIR_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("unknown test category: {0}")]
    InvalidCategory(String),
    #[error("{letter} percentage {value} is outside 0-100")]
    InvalidPercentage { letter: char, value: f64 },
    #[error("{pair} percentages sum to {sum}, expected 100")]
    UnbalancedPair { pair: String, sum: f64 },
}

pub fn parse_category(raw: &str) -> Result<TestCategory, AggregateError> {
    match raw {
        "mbti-8" | "8" => Ok(TestCategory::Mbti8),
        "mbti-24" | "24" => Ok(TestCategory::Mbti24),
        "mbti-100" | "100" => Ok(TestCategory::Mbti100),
        other => Err(AggregateError::InvalidCategory(other.to_string())),
    }
}

pub fn validate_percentages(percentages: &TraitPercentages) -> Result<(), AggregateError> {
    for (first, second) in TRAIT_PAIRS {
        for letter in [first, second] {
            let value = percentages.get(letter);
            if !(0.0..=100.0).contains(&value) {
                return Err(AggregateError::InvalidPercentage {
                    letter: letter.letter(),
                    value,
                });
            }
        }
        let sum = percentages.get(first) + percentages.get(second);
        if (sum - 100.0).abs() > PAIR_SUM_TOLERANCE {
            return Err(AggregateError::UnbalancedPair {
                pair: format!("{}/{}", first.letter(), second.letter()),
                sum,
            });
        }
    }
    Ok(())
}

/// Folds the newest submission into the user's current set and recomputes the
/// aggregate. The newest submission replaces any earlier one of the same
/// category; percentages are averaged with each category's base weight. Pure;
/// nothing is persisted here.
pub fn recompute_profile(
    existing: &[TestSubmission],
    newest: &TestSubmission,
) -> Result<AggregatedProfile, AggregateError> {
    validate_percentages(&newest.percentages)?;

    let mut merged: Vec<&TestSubmission> = existing
        .iter()
        .filter(|s| s.category != newest.category)
        .collect();
    merged.push(newest);
    merged.sort_by(|a, b| {
        b.category
            .base_weight()
            .partial_cmp(&a.category.base_weight())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total_weight: f64 = merged.iter().map(|s| s.category.base_weight()).sum();

    let mut percentages = TraitPercentages {
        extraversion: 0.0,
        introversion: 0.0,
        sensing: 0.0,
        intuition: 0.0,
        thinking: 0.0,
        feeling: 0.0,
        judging: 0.0,
        perceiving: 0.0,
    };
    let mut mbti_type = String::with_capacity(4);

    for (first, second) in TRAIT_PAIRS {
        let weighted: f64 = merged
            .iter()
            .map(|s| s.percentages.get(first) * s.category.base_weight())
            .sum::<f64>()
            / total_weight;
        // Deriving the complement keeps the pair summing to exactly 100.
        percentages.set(first, weighted);
        percentages.set(second, 100.0 - weighted);
        let dominant = if weighted >= 50.0 { first } else { second };
        mbti_type.push(dominant.letter());
    }

    let breakdown = merged
        .iter()
        .map(|s| CategoryWeightEntry {
            category: s.category,
            base_weight: s.category.base_weight(),
        })
        .collect();

    let profile_title = format!("{} - The {}", mbti_type, archetype_name(&mbti_type));

    Ok(AggregatedProfile {
        mbti_type,
        percentages,
        breakdown,
        profile_title,
    })
}

/// Archetype names for the sixteen type codes. Unrecognized codes (possible
/// for claimed types coming from outside) fall back to a neutral label.
pub fn archetype_name(code: &str) -> &'static str {
    match code {
        "INTJ" => "Architect",
        "INTP" => "Logician",
        "ENTJ" => "Commander",
        "ENTP" => "Debater",
        "INFJ" => "Advocate",
        "INFP" => "Mediator",
        "ENFJ" => "Protagonist",
        "ENFP" => "Campaigner",
        "ISTJ" => "Logistician",
        "ISFJ" => "Defender",
        "ESTJ" => "Executive",
        "ESFJ" => "Consul",
        "ISTP" => "Virtuoso",
        "ISFP" => "Adventurer",
        "ESTP" => "Entrepreneur",
        "ESFP" => "Entertainer",
        _ => "Wanderer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn percentages(e: f64, s: f64, t: f64, j: f64) -> TraitPercentages {
        TraitPercentages {
            extraversion: e,
            introversion: 100.0 - e,
            sensing: s,
            intuition: 100.0 - s,
            thinking: t,
            feeling: 100.0 - t,
            judging: j,
            perceiving: 100.0 - j,
        }
    }

    fn submission(
        user_id: Uuid,
        category: TestCategory,
        claimed_type: &str,
        pct: TraitPercentages,
    ) -> TestSubmission {
        TestSubmission {
            user_id,
            category,
            claimed_type: claimed_type.to_string(),
            percentages: pct,
            taken_on: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        }
    }

    #[test]
    fn category_parsing_accepts_known_variants() {
        assert_eq!(parse_category("mbti-8").unwrap(), TestCategory::Mbti8);
        assert_eq!(parse_category("24").unwrap(), TestCategory::Mbti24);
        assert_eq!(parse_category("mbti-100").unwrap(), TestCategory::Mbti100);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = parse_category("mbti-16").unwrap_err();
        assert_eq!(err, AggregateError::InvalidCategory("mbti-16".to_string()));
    }

    #[test]
    fn out_of_range_percentage_is_rejected() {
        let mut pct = percentages(60.0, 40.0, 55.0, 45.0);
        pct.thinking = 130.0;
        pct.feeling = -30.0;
        let err = validate_percentages(&pct).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::InvalidPercentage { letter: 'T', .. }
        ));
    }

    #[test]
    fn unbalanced_pair_is_rejected() {
        let mut pct = percentages(60.0, 40.0, 55.0, 45.0);
        pct.introversion = 30.0;
        let err = validate_percentages(&pct).unwrap_err();
        assert!(matches!(err, AggregateError::UnbalancedPair { ref pair, .. } if pair == "E/I"));
    }

    #[test]
    fn invalid_submission_produces_no_profile() {
        let user_id = Uuid::new_v4();
        let mut pct = percentages(60.0, 40.0, 55.0, 45.0);
        pct.judging = 120.0;
        let newest = submission(user_id, TestCategory::Mbti8, "ESTJ", pct);
        assert!(recompute_profile(&[], &newest).is_err());
    }

    #[test]
    fn single_submission_passes_through() {
        let user_id = Uuid::new_v4();
        let newest = submission(
            user_id,
            TestCategory::Mbti24,
            "ENTJ",
            percentages(70.0, 30.0, 80.0, 60.0),
        );
        let profile = recompute_profile(&[], &newest).unwrap();
        assert_eq!(profile.mbti_type, "ENTJ");
        assert!((profile.percentages.extraversion - 70.0).abs() < 1e-9);
        assert!((profile.percentages.intuition - 70.0).abs() < 1e-9);
        assert_eq!(profile.breakdown.len(), 1);
        assert_eq!(profile.breakdown[0].base_weight, 24.0);
    }

    #[test]
    fn complementary_pairs_sum_to_exactly_100() {
        let user_id = Uuid::new_v4();
        let existing = vec![submission(
            user_id,
            TestCategory::Mbti100,
            "INFP",
            percentages(33.4, 48.7, 21.3, 49.9),
        )];
        let newest = submission(
            user_id,
            TestCategory::Mbti8,
            "ESTJ",
            percentages(66.6, 51.2, 78.8, 50.1),
        );
        let profile = recompute_profile(&existing, &newest).unwrap();
        for (first, second) in TRAIT_PAIRS {
            let sum = profile.percentages.get(first) + profile.percentages.get(second);
            assert!((sum - 100.0).abs() < 1e-12, "{sum}");
        }
    }

    #[test]
    fn weighted_average_follows_category_weights() {
        // mbti-100 says I=80, mbti-24 says I=40, mbti-8 says I=10:
        // I = (80*100 + 40*24 + 10*8) / 132 = 9040/132, the long test wins.
        let user_id = Uuid::new_v4();
        let existing = vec![
            submission(
                user_id,
                TestCategory::Mbti100,
                "INTJ",
                percentages(20.0, 30.0, 70.0, 75.0),
            ),
            submission(
                user_id,
                TestCategory::Mbti24,
                "ENFP",
                percentages(60.0, 35.0, 45.0, 40.0),
            ),
        ];
        let newest = submission(
            user_id,
            TestCategory::Mbti8,
            "ESFJ",
            percentages(90.0, 55.0, 30.0, 80.0),
        );
        let profile = recompute_profile(&existing, &newest).unwrap();
        let expected_i = 9040.0 / 132.0;
        assert!((profile.percentages.introversion - expected_i).abs() < 1e-9);
        assert!(profile.mbti_type.starts_with('I'));
    }

    #[test]
    fn resubmitting_a_category_is_idempotent() {
        let user_id = Uuid::new_v4();
        let existing = vec![submission(
            user_id,
            TestCategory::Mbti100,
            "INTJ",
            percentages(20.0, 30.0, 70.0, 75.0),
        )];
        let newest = submission(
            user_id,
            TestCategory::Mbti24,
            "ENFP",
            percentages(60.0, 35.0, 45.0, 40.0),
        );
        let once = recompute_profile(&existing, &newest).unwrap();

        let mut with_newest = existing.clone();
        with_newest.push(newest.clone());
        let twice = recompute_profile(&with_newest, &newest).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn newest_submission_replaces_same_category() {
        let user_id = Uuid::new_v4();
        let existing = vec![submission(
            user_id,
            TestCategory::Mbti24,
            "ENFP",
            percentages(90.0, 90.0, 90.0, 90.0),
        )];
        let newest = submission(
            user_id,
            TestCategory::Mbti24,
            "ISTJ",
            percentages(10.0, 20.0, 30.0, 40.0),
        );
        let profile = recompute_profile(&existing, &newest).unwrap();
        assert_eq!(profile.breakdown.len(), 1);
        assert!((profile.percentages.extraversion - 10.0).abs() < 1e-9);
        assert_eq!(profile.mbti_type, "INFP");
    }

    #[test]
    fn breakdown_orders_heaviest_category_first() {
        let user_id = Uuid::new_v4();
        let existing = vec![
            submission(
                user_id,
                TestCategory::Mbti8,
                "ENTP",
                percentages(55.0, 45.0, 60.0, 35.0),
            ),
            submission(
                user_id,
                TestCategory::Mbti100,
                "ENTP",
                percentages(58.0, 42.0, 64.0, 38.0),
            ),
        ];
        let newest = submission(
            user_id,
            TestCategory::Mbti24,
            "ENTP",
            percentages(52.0, 44.0, 61.0, 36.0),
        );
        let profile = recompute_profile(&existing, &newest).unwrap();
        let weights: Vec<f64> = profile.breakdown.iter().map(|e| e.base_weight).collect();
        assert_eq!(weights, vec![100.0, 24.0, 8.0]);
    }

    #[test]
    fn tie_at_50_goes_to_the_first_letter_of_the_pair() {
        let user_id = Uuid::new_v4();
        let newest = submission(
            user_id,
            TestCategory::Mbti8,
            "ESTJ",
            percentages(50.0, 50.0, 50.0, 50.0),
        );
        let profile = recompute_profile(&[], &newest).unwrap();
        assert_eq!(profile.mbti_type, "ESTJ");
    }

    #[test]
    fn title_starts_with_the_dominant_type() {
        let user_id = Uuid::new_v4();
        let newest = submission(
            user_id,
            TestCategory::Mbti100,
            "INTJ",
            percentages(20.0, 30.0, 70.0, 75.0),
        );
        let profile = recompute_profile(&[], &newest).unwrap();
        assert_eq!(profile.mbti_type, "INTJ");
        assert!(profile.profile_title.starts_with("INTJ"));
        assert_eq!(profile.profile_title, "INTJ - The Architect");
    }

    #[test]
    fn archetype_table_covers_all_sixteen_codes() {
        let codes = [
            "INTJ", "INTP", "ENTJ", "ENTP", "INFJ", "INFP", "ENFJ", "ENFP", "ISTJ", "ISFJ",
            "ESTJ", "ESFJ", "ISTP", "ISFP", "ESTP", "ESFP",
        ];
        for code in codes {
            assert_ne!(archetype_name(code), "Wanderer", "missing name for {code}");
        }
    }
}
