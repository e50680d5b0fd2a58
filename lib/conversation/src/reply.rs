//! Yes/no reply recognition.

const AFFIRMATIVE: &[&str] = &["да", "yes", "давай", "ок", "хорошо"];
const NEGATIVE: &[&str] = &["нет", "no", "не", "неправильно"];

/// A user's answer to a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    /// Affirmative.
    Yes,
    /// Negative.
    No,
    /// Anything else.
    Unrecognized,
}

impl YesNo {
    /// Classifies a reply after trimming and lowercasing it.
    ///
    /// Only whole-reply matches count: "да, конечно" is unrecognized.
    #[must_use]
    pub fn parse(reply: &str) -> Self {
        let normalized = reply.trim().to_lowercase();
        if AFFIRMATIVE.contains(&normalized.as_str()) {
            Self::Yes
        } else if NEGATIVE.contains(&normalized.as_str()) {
            Self::No
        } else {
            Self::Unrecognized
        }
    }
}
