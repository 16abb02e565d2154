use std::fmt::Write;

use crate::models::{ProfileRecord, SubmissionLogEntry, TRAIT_PAIRS};

#[derive(Debug, Clone)]
pub struct TypeSummary {
    pub mbti_type: String,
    pub count: usize,
}

pub fn summarize_types(profiles: &[ProfileRecord]) -> Vec<TypeSummary> {
    let mut map: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for profile in profiles {
        *map.entry(profile.mbti_type.clone()).or_insert(0) += 1;
    }

    let mut summaries: Vec<TypeSummary> = map
        .into_iter()
        .map(|(mbti_type, count)| TypeSummary { mbti_type, count })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then(a.mbti_type.cmp(&b.mbti_type)));
    summaries
}

pub fn format_pairs(profile: &ProfileRecord) -> String {
    let mut parts = Vec::with_capacity(4);
    for (first, second) in TRAIT_PAIRS {
        parts.push(format!(
            "{} {:.1} / {} {:.1}",
            first.letter(),
            profile.percentages.get(first),
            second.letter(),
            profile.percentages.get(second),
        ));
    }
    parts.join(", ")
}

pub fn build_report(
    scope: Option<&str>,
    profiles: &[ProfileRecord],
    recent: &[SubmissionLogEntry],
) -> String {
    let summaries = summarize_types(profiles);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all users");

    let _ = writeln!(output, "# Personality Profile Report");
    let _ = writeln!(output, "Generated for {scope_label}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Type Distribution");

    if summaries.is_empty() {
        let _ = writeln!(output, "No aggregated profiles yet.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} {}",
                summary.mbti_type,
                summary.count,
                if summary.count == 1 { "profile" } else { "profiles" }
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Profiles");

    if profiles.is_empty() {
        let _ = writeln!(output, "No aggregated profiles yet.");
    } else {
        for profile in profiles.iter() {
            let breakdown = profile
                .breakdown
                .iter()
                .map(|entry| format!("{} (w{:.0})", entry.category, entry.base_weight))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                output,
                "- {} ({}): {} [{}] from {}",
                profile.user_name,
                profile.user_email,
                profile.profile_title,
                format_pairs(profile),
                breakdown
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Submissions");

    if recent.is_empty() {
        let _ = writeln!(output, "No submissions recorded.");
    } else {
        for entry in recent.iter() {
            let _ = writeln!(
                output,
                "- {} ({}) took {} on {}: claimed {}",
                entry.user_name, entry.user_email, entry.category, entry.taken_on, entry.claimed_type
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryWeightEntry, TestCategory, TraitPercentages};

    fn profile(name: &str, email: &str, mbti_type: &str) -> ProfileRecord {
        ProfileRecord {
            user_name: name.to_string(),
            user_email: email.to_string(),
            mbti_type: mbti_type.to_string(),
            percentages: TraitPercentages {
                extraversion: 40.0,
                introversion: 60.0,
                sensing: 45.0,
                intuition: 55.0,
                thinking: 70.0,
                feeling: 30.0,
                judging: 65.0,
                perceiving: 35.0,
            },
            breakdown: vec![CategoryWeightEntry {
                category: TestCategory::Mbti24,
                base_weight: 24.0,
            }],
            profile_title: format!("{mbti_type} - The Architect"),
        }
    }

    #[test]
    fn type_distribution_counts_and_orders() {
        let profiles = vec![
            profile("Avery Lee", "avery@example.com", "INTJ"),
            profile("Jules Moreno", "jules@example.com", "ENFP"),
            profile("Kiara Patel", "kiara@example.com", "INTJ"),
        ];
        let summaries = summarize_types(&profiles);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].mbti_type, "INTJ");
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[1].mbti_type, "ENFP");
    }

    #[test]
    fn report_lists_profiles_and_handles_empty_sections() {
        let profiles = vec![profile("Avery Lee", "avery@example.com", "INTJ")];
        let report = build_report(Some("avery@example.com"), &profiles, &[]);
        assert!(report.contains("Generated for avery@example.com"));
        assert!(report.contains("INTJ - The Architect"));
        assert!(report.contains("mbti-24 (w24)"));
        assert!(report.contains("No submissions recorded."));
    }
}
