//! Intent Result data model.
//!
//! An [`IntentResult`] is produced fresh for every classifier call and is
//! never mutated afterwards; the dialogue engine takes it by value.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The coarse category of the requested calendar action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Create a new event.
    Create,
    /// List events for a day.
    List,
    /// Delete an event.
    Delete,
    /// The request could not be recognized.
    Unknown,
}

impl Intent {
    /// Returns the wire name of the intent.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::List => "list",
            Self::Delete => "delete",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named optional parameters attached to an intent.
///
/// Absence is meaningful ("unspecified"), never an error. When both `start`
/// and `end` are present nothing here checks their order; the calendar
/// backend is the one that rejects an inverted range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
    /// Event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Start time with offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<FixedOffset>>,
    /// End time with offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<FixedOffset>>,
    /// Calendar date used to scope list and delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Free-text names or email addresses, in the order given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-text location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Opaque calendar event identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl Slots {
    /// Turns blank strings into `None` and drops blank participants.
    ///
    /// Classifiers frequently emit `""` where they mean "not mentioned".
    #[must_use]
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let participants = self.participants.map(|list| {
            list.into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
        });

        Self {
            title: clean(self.title),
            start: self.start,
            end: self.end,
            date: self.date,
            participants: participants.filter(|list| !list.is_empty()),
            description: clean(self.description),
            location: clean(self.location),
            event_id: clean(self.event_id),
        }
    }

    /// Returns the target day: the explicit date, else the start's local date.
    #[must_use]
    pub fn target_date(&self) -> Option<NaiveDate> {
        self.date.or_else(|| self.start.map(|start| start.date_naive()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawClarification {
    #[serde(default)]
    needed: bool,
    #[serde(default)]
    questions: Option<Vec<String>>,
}

/// Clarifying questions requested by the classifier.
///
/// Invariant: when [`Clarification::is_needed`] is true the question list is
/// non-empty. A "needed" request without usable questions deserializes as
/// not needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClarification")]
pub struct Clarification {
    needed: bool,
    questions: Vec<String>,
}

impl Clarification {
    /// No clarification required.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Requests the given questions, in order.
    ///
    /// Blank questions are dropped; an empty list yields [`Clarification::none`].
    #[must_use]
    pub fn ask<I, S>(questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let questions: Vec<String> = questions
            .into_iter()
            .map(|q| q.into().trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        Self {
            needed: !questions.is_empty(),
            questions,
        }
    }

    /// Returns true if the user must be asked before anything else happens.
    #[must_use]
    pub fn is_needed(&self) -> bool {
        self.needed
    }

    /// Returns the questions in the order they should be asked.
    #[must_use]
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Consumes the request, returning its questions.
    #[must_use]
    pub fn into_questions(self) -> Vec<String> {
        self.questions
    }
}

impl From<RawClarification> for Clarification {
    fn from(raw: RawClarification) -> Self {
        if raw.needed {
            let clarify = Self::ask(raw.questions.unwrap_or_default());
            if !clarify.is_needed() {
                tracing::warn!("clarification requested without questions, ignoring");
            }
            clarify
        } else {
            Self::none()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawIntentResult {
    intent: Intent,
    confidence: f64,
    #[serde(default)]
    slots: Option<Slots>,
    #[serde(default)]
    clarify: Option<Clarification>,
}

/// The classifier's structured guess for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIntentResult")]
pub struct IntentResult {
    /// The guessed intent.
    pub intent: Intent,
    /// Classifier confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Extracted parameters.
    pub slots: Slots,
    /// Clarifying questions, if any.
    pub clarify: Clarification,
}

impl IntentResult {
    /// Creates a result that needs no clarification.
    #[must_use]
    pub fn new(intent: Intent, confidence: f64, slots: Slots) -> Self {
        Self {
            intent,
            confidence,
            slots,
            clarify: Clarification::none(),
        }
    }

    /// Re-materializes a result the user has explicitly confirmed.
    #[must_use]
    pub fn confirmed(intent: Intent, slots: Slots) -> Self {
        Self::new(intent, 1.0, slots)
    }

    /// Attaches clarifying questions.
    #[must_use]
    pub fn with_clarification(mut self, clarify: Clarification) -> Self {
        self.clarify = clarify;
        self
    }
}

impl TryFrom<RawIntentResult> for IntentResult {
    type Error = String;

    fn try_from(raw: RawIntentResult) -> Result<Self, Self::Error> {
        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(format!(
                "confidence must be within [0.0, 1.0], got {}",
                raw.confidence
            ));
        }

        Ok(Self {
            intent: raw.intent,
            confidence: raw.confidence,
            slots: raw.slots.unwrap_or_default().normalized(),
            clarify: raw.clarify.unwrap_or_default(),
        })
    }
}
