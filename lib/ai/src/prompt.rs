//! Few-shot prompt template for intent classification.
//!
//! The template is a JSON document `{ "system": "...", "examples": [{ "user":
//! "...", "response": { ... } }] }`. Operators can override the built-in
//! template by pointing the bot at a file; a missing or broken file falls back
//! to the default so the bot keeps working.

use crate::backend::{LlmMessage, LlmRequest};
use crate::error::PromptError;
use chrono::NaiveDate;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::warn;

/// Maximum number of few-shot examples sent with each request.
pub const MAX_EXAMPLES: usize = 3;

const DEFAULT_SYSTEM_PROMPT: &str = r#"Вы — JSON-генератор для Telegram-бота планировщика.
Ваша задача — анализировать естественные фразы пользователя на русском языке и возвращать строго структурированный JSON.

ПРАВИЛА:
1. На каждый запрос возвращайте ТОЛЬКО JSON в указанном формате, без дополнительного текста.
2. Все даты и время в формате ISO8601 с часовым поясом (например, +03:00).
3. Если недостаточно данных для выполнения действия — верните clarify.needed=true и заполните questions конкретными уточняющими вопросами.
4. confidence — ваша уверенность в распознавании намерения (0.0-1.0).
5. Для intent используйте: "create" (создать событие), "list" (показать события), "delete" (удалить событие), "unknown" (не удалось распознать).
6. Участники (participants), описание (description) и место (location) необязательны. Не спрашивайте о них, если пользователь их не упомянул. Уточняйте только название (title) и время начала (start) для создания события.

ФОРМАТ ОТВЕТА:
{
  "intent": "create" | "list" | "delete" | "unknown",
  "confidence": 0.0-1.0,
  "slots": {
    "title": "название события",
    "start": "2025-11-27T15:00:00+03:00",
    "end": "2025-11-27T16:00:00+03:00",
    "date": "2025-11-27",
    "participants": ["имя1", "имя2"],
    "description": "описание",
    "location": "место",
    "event_id": null
  },
  "clarify": {
    "needed": false,
    "questions": []
  }
}"#;

/// One worked example shown to the model before the real query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FewShotExample {
    /// The example utterance.
    pub user: String,
    /// The JSON the model is expected to produce for it.
    pub response: JsonValue,
}

/// System prompt plus few-shot examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// System instructions.
    #[serde(default)]
    pub system: String,
    /// Worked examples, in order.
    #[serde(default)]
    pub examples: Vec<FewShotExample>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            examples: vec![FewShotExample {
                user: "назначь на завтра встречу в 15:00 с вадимом".to_string(),
                response: serde_json::json!({
                    "intent": "create",
                    "confidence": 0.95,
                    "slots": {
                        "title": "Встреча с Вадимом",
                        "start": "2025-11-27T15:00:00+03:00",
                        "end": "2025-11-27T16:00:00+03:00",
                        "participants": ["Вадим"]
                    },
                    "clarify": {"needed": false, "questions": []}
                }),
            }],
        }
    }
}

impl PromptTemplate {
    /// Reads a template from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, Report<PromptError>> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| PromptError::ReadFailed {
            path: display.clone(),
            reason: e.to_string(),
        })?;

        let template: Self = serde_json::from_str(&raw).map_err(|e| PromptError::ParseFailed {
            path: display,
            reason: e.to_string(),
        })?;

        Ok(template)
    }

    /// Reads a template from a file, falling back to the built-in default.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(template) => template,
            Err(report) => {
                warn!(error = %report, "using built-in prompt template");
                Self::default()
            }
        }
    }

    /// Builds the completion request for one utterance.
    ///
    /// `today` is appended to the system prompt so relative dates ("завтра")
    /// resolve against the bot's calendar day.
    #[must_use]
    pub fn build_request(&self, utterance: &str, today: Option<NaiveDate>) -> LlmRequest {
        let mut messages = Vec::with_capacity(MAX_EXAMPLES * 2 + 1);
        for example in self.examples.iter().take(MAX_EXAMPLES) {
            messages.push(LlmMessage::user(example.user.clone()));
            messages.push(LlmMessage::assistant(example.response.to_string()));
        }
        messages.push(LlmMessage::user(utterance));

        let system = match today {
            Some(day) => format!(
                "{}\n\nСегодня {} ({}).",
                self.system,
                day.format("%Y-%m-%d"),
                day.format("%A")
            ),
            None => self.system.clone(),
        };

        LlmRequest::from_messages(messages)
            .with_system(system)
            .with_json_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MessageRole;
    use std::io::Write;

    #[test]
    fn default_template_has_one_example() {
        let template = PromptTemplate::default();
        assert!(template.system.contains("JSON"));
        assert_eq!(template.examples.len(), 1);
    }

    #[test]
    fn request_contains_examples_then_query() {
        let template = PromptTemplate::default();
        let request = template.build_request("покажи события на 27 ноября", None);

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, MessageRole::User);
        assert_eq!(request.messages[1].role, MessageRole::Assistant);
        assert!(request.messages[1].content.contains("Встреча с Вадимом"));
        assert_eq!(request.messages[2].role, MessageRole::User);
        assert_eq!(request.messages[2].content, "покажи события на 27 ноября");
        assert!(request.json_output);
    }

    #[test]
    fn only_first_three_examples_are_sent() {
        let example = FewShotExample {
            user: "x".to_string(),
            response: serde_json::json!({"intent": "unknown", "confidence": 0.1}),
        };
        let template = PromptTemplate {
            system: "s".to_string(),
            examples: vec![example; 5],
        };

        let request = template.build_request("q", None);
        assert_eq!(request.messages.len(), MAX_EXAMPLES * 2 + 1);
    }

    #[test]
    fn today_is_appended_to_system_prompt() {
        let template = PromptTemplate::default();
        let today = NaiveDate::from_ymd_opt(2025, 11, 26).expect("valid date");
        let request = template.build_request("q", Some(today));
        assert!(request.system.expect("system").contains("2025-11-26"));
    }

    #[test]
    fn loads_template_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"system": "custom", "examples": [{{"user": "u", "response": {{"intent": "list"}}}}]}}"#
        )
        .expect("write");

        let template = PromptTemplate::from_path(file.path()).expect("valid template");
        assert_eq!(template.system, "custom");
        assert_eq!(template.examples[0].user, "u");
    }

    #[test]
    fn broken_file_falls_back_to_default() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");

        assert!(PromptTemplate::from_path(file.path()).is_err());
        assert_eq!(
            PromptTemplate::load_or_default(file.path()),
            PromptTemplate::default()
        );
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().expect("temp dir");
        let template = PromptTemplate::load_or_default(&dir.path().join("absent.json"));
        assert_eq!(template, PromptTemplate::default());
    }
}
