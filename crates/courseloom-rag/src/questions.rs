//! AI-suggested follow-up questions for a topic.

use courseloom_core::Result;
use regex::Regex;
use tracing::debug;

use crate::traits::TextGenerator;

const MAX_QUESTIONS: usize = 3;

/// Generate up to three follow-up questions a student might ask about a
/// topic. Leading numbering and bullet markers are stripped from each line.
pub fn suggested_questions(generator: &dyn TextGenerator, topic: &str) -> Result<Vec<String>> {
    let prompt = format!(
        "Generate 3 thoughtful follow-up questions that a student might have \
         about the topic: \"{topic}\". Questions should be specific, \
         educational, and promote deeper understanding. One question per \
         line, no numbering.\n\nQuestions:"
    );
    let response = generator.generate(&prompt)?;

    let numbering = Regex::new(r"^\d+[.)]\s*").expect("static regex");
    let bullet = Regex::new(r"^[-*]\s*").expect("static regex");

    let questions: Vec<String> = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let line = numbering.replace(line, "");
            bullet.replace(&line, "").into_owned()
        })
        .filter(|line| !line.is_empty())
        .take(MAX_QUESTIONS)
        .collect();

    debug!("Generated {} suggested questions", questions.len());
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedGenerator(String);

    impl TextGenerator for CannedGenerator {
        fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_strips_numbering_and_bullets() {
        let generator = CannedGenerator(
            "1. What is mitosis?\n- How does DNA replicate?\n2) Why do cells divide?".into(),
        );
        let questions = suggested_questions(&generator, "Cell Biology").unwrap();
        assert_eq!(
            questions,
            vec![
                "What is mitosis?",
                "How does DNA replicate?",
                "Why do cells divide?"
            ]
        );
    }

    #[test]
    fn test_caps_at_three() {
        let generator = CannedGenerator("a?\nb?\nc?\nd?\ne?".into());
        let questions = suggested_questions(&generator, "Topic").unwrap();
        assert_eq!(questions.len(), 3);
    }

    #[test]
    fn test_skips_blank_lines() {
        let generator = CannedGenerator("\n\nOnly question?\n\n".into());
        let questions = suggested_questions(&generator, "Topic").unwrap();
        assert_eq!(questions, vec!["Only question?"]);
    }
}
