//! Client-side validation of a poll before it is created.

use domains::DomainError;

pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 8;

/// A validated question with its non-blank choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDraft {
    pub question: String,
    pub choices: Vec<String>,
}

impl PollDraft {
    /// Trims the question and every choice, drops blank choices, then
    /// enforces a non-empty question and 2..=8 choices.
    pub fn new<I, S>(question: &str, choices: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::InvalidPayload("Question is required".into()));
        }

        let choices: Vec<String> = choices
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if choices.len() < MIN_CHOICES {
            return Err(DomainError::InvalidPayload(format!(
                "At least {MIN_CHOICES} choices are needed"
            )));
        }
        if choices.len() > MAX_CHOICES {
            return Err(DomainError::InvalidPayload(format!(
                "At most {MAX_CHOICES} choices are allowed"
            )));
        }

        Ok(Self {
            question: question.to_string(),
            choices,
        })
    }
}
