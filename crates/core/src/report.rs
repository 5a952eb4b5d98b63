//! Best-effort extraction of labeled sections from analysis text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The sentinel filled in for a section the model did not produce.
pub const MISSING_SECTION: &str = "N/A";

/// The labeled sections of an analysis.
///
/// The evaluator persona asks the model for a fixed template, but
/// nothing enforces it. Extraction is best effort: whatever stands
/// between one recognized label and the next is taken verbatim, and any
/// section that cannot be found degrades to [`MISSING_SECTION`]
/// silently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Possible issues identified in the conversation.
    pub issues: String,
    /// Likely reasons behind the identified issues.
    pub causes: String,
    /// Suggested follow-up items.
    pub follow_ups: String,
}

#[derive(Clone, Copy)]
enum Section {
    Issues,
    Causes,
    FollowUps,
}

// Labels are matched at line starts only, so a colon in running prose
// doesn't open a section.
fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?mi)^[ \t]*(issues|causes|likely reasons|follow[ -]?ups?)[ \t]*:[ \t]*",
        )
        .expect("label pattern is a valid regex")
    })
}

fn classify(label: &str) -> Section {
    let label = label.to_ascii_lowercase();
    match label.as_str() {
        "issues" => Section::Issues,
        "causes" | "likely reasons" => Section::Causes,
        _ => Section::FollowUps,
    }
}

impl EvaluationReport {
    /// Extracts the labeled sections from `text`.
    ///
    /// The `regex` engine has no lookaround, so the scan collects every
    /// label match first and slices the text between consecutive
    /// matches. The first occurrence of each label wins.
    pub fn parse(text: &str) -> Self {
        let labels: Vec<(Section, usize, usize)> = label_pattern()
            .captures_iter(text)
            .map(|caps| {
                let whole = caps.get(0).expect("group 0 always matches");
                let label = caps.get(1).expect("group 1 is not optional");
                (classify(label.as_str()), whole.start(), whole.end())
            })
            .collect();

        let mut issues = None;
        let mut causes = None;
        let mut follow_ups = None;
        for (idx, (section, _, body_start)) in labels.iter().enumerate() {
            let body_end = labels
                .get(idx + 1)
                .map(|(_, next_start, _)| *next_start)
                .unwrap_or(text.len());
            let body = text[*body_start..body_end].trim();
            let slot = match section {
                Section::Issues => &mut issues,
                Section::Causes => &mut causes,
                Section::FollowUps => &mut follow_ups,
            };
            if slot.is_none() {
                *slot = Some(body.to_owned());
            }
        }

        let missing = || MISSING_SECTION.to_owned();
        Self {
            issues: issues.unwrap_or_else(missing),
            causes: causes.unwrap_or_else(missing),
            follow_ups: follow_ups.unwrap_or_else(missing),
        }
    }

    /// Returns `true` if no section could be extracted at all.
    pub fn is_empty(&self) -> bool {
        self.issues == MISSING_SECTION
            && self.causes == MISSING_SECTION
            && self.follow_ups == MISSING_SECTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conforming_template() {
        let report = EvaluationReport::parse(
            "Issues: signs of anxiety and social withdrawal\n\
             Causes: prolonged work stress\n\
             Follow-ups: ask about sleep and support network\n",
        );
        assert_eq!(report.issues, "signs of anxiety and social withdrawal");
        assert_eq!(report.causes, "prolonged work stress");
        assert_eq!(report.follow_ups, "ask about sleep and support network");
    }

    #[test]
    fn test_multiline_sections() {
        let report = EvaluationReport::parse(
            "Issues:\n- anxiety\n- low mood\nCauses: unclear\n",
        );
        assert_eq!(report.issues, "- anxiety\n- low mood");
        assert_eq!(report.causes, "unclear");
        assert_eq!(report.follow_ups, MISSING_SECTION);
    }

    #[test]
    fn test_missing_label_degrades_that_field_only() {
        let report = EvaluationReport::parse(
            "Issues: irritability\nFollow-ups: check in next week\n",
        );
        assert_eq!(report.issues, "irritability");
        assert_eq!(report.causes, MISSING_SECTION);
        assert_eq!(report.follow_ups, "check in next week");
    }

    #[test]
    fn test_label_aliases_and_case() {
        let report = EvaluationReport::parse(
            "ISSUES: something\nLikely reasons: something else\nFollow up: rest\n",
        );
        assert_eq!(report.issues, "something");
        assert_eq!(report.causes, "something else");
        assert_eq!(report.follow_ups, "rest");
    }

    #[test]
    fn test_free_text_degrades_to_all_missing() {
        let report = EvaluationReport::parse(
            "The user appears generally stable, though tired.",
        );
        assert!(report.is_empty());
        assert_eq!(report.issues, MISSING_SECTION);
    }

    #[test]
    fn test_colon_in_prose_is_not_a_label() {
        let report = EvaluationReport::parse(
            "Issues: the user mentioned two causes: stress and noise\n",
        );
        assert_eq!(
            report.issues,
            "the user mentioned two causes: stress and noise"
        );
        assert_eq!(report.causes, MISSING_SECTION);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let report = EvaluationReport::parse(
            "Issues: first\nIssues: second\nCauses: x\n",
        );
        assert_eq!(report.issues, "first");
        assert_eq!(report.causes, "x");
    }
}
