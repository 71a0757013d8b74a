//! Subject instruction templates bundled at compile time.
//!
//! Each template instructs the model to answer in the `**Step N:**`
//! shape the parser is tuned for. Pure lookup and string assembly,
//! no I/O.

use crate::models::Subject;

/// Physics tutor instructions
pub const PHYSICS: &str = include_str!("prompts/defaults/physics.md");

/// Chemistry tutor instructions
pub const CHEMISTRY: &str = include_str!("prompts/defaults/chemistry.md");

/// Mathematics tutor instructions
pub const MATHEMATICS: &str = include_str!("prompts/defaults/mathematics.md");

/// Biology tutor instructions
pub const BIOLOGY: &str = include_str!("prompts/defaults/biology.md");

/// Appended after the question on every prompt
const FORMAT_REMINDER: &str =
    "Important: Keep each step concise but complete. Include all calculations and units where applicable.";

/// All templates with their subjects
pub fn all_templates() -> Vec<(Subject, &'static str)> {
    vec![
        (Subject::Physics, PHYSICS),
        (Subject::Chemistry, CHEMISTRY),
        (Subject::Mathematics, MATHEMATICS),
        (Subject::Biology, BIOLOGY),
    ]
}

/// Look up the instruction template for a subject.
///
/// Falls back to the mathematics template if the subject is somehow
/// missing from the table.
pub fn template_for(subject: Subject) -> &'static str {
    all_templates()
        .into_iter()
        .find(|(s, _)| *s == subject)
        .map(|(_, t)| t)
        .unwrap_or(MATHEMATICS)
}

/// Compose the full prompt sent to the completion endpoint
pub fn build_prompt(subject: Subject, query: &str) -> String {
    format!(
        "{}\n\nQuestion: {}\n\n{}",
        template_for(subject).trim_end(),
        query,
        FORMAT_REMINDER
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_non_empty() {
        for (subject, content) in all_templates() {
            assert!(
                content.len() > 50,
                "Template for '{}' seems too short",
                subject
            );
        }
    }

    #[test]
    fn test_template_count() {
        assert_eq!(all_templates().len(), 4, "Should have 4 subject templates");
    }

    #[test]
    fn test_templates_request_step_format() {
        for (subject, content) in all_templates() {
            assert!(
                content.contains("**Step 1:**"),
                "Template for '{}' should request bold step headers",
                subject
            );
        }
    }

    #[test]
    fn test_build_prompt_embeds_question() {
        let prompt = build_prompt(Subject::Physics, "A 2 kg mass accelerates at 5 m/s^2");
        assert!(prompt.starts_with("You are a physics tutor."));
        assert!(prompt.contains("Question: A 2 kg mass accelerates at 5 m/s^2"));
        assert!(prompt.ends_with(FORMAT_REMINDER));
    }
}
