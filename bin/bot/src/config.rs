//! Centralized bot configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys: `TELEGRAM__TOKEN`, `LLM__API_KEY`,
//! `CALENDAR__BACKEND`, `DIALOGUE__CONFIDENCE_THRESHOLD` and so on.

use crate::error::StartupError;
use chrono::FixedOffset;
use rootcause::Report;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Values that mean "not configured yet".
const PLACEHOLDERS: &[&str] = &["your_telegram_token_here", "your_openrouter_api_key_here"];

/// Largest accepted distance from UTC, in minutes.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Longest accepted default event, in minutes.
const MAX_EVENT_DURATION_MINUTES: u64 = 7 * 24 * 60;

/// Bot configuration composed from per-component sections.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Telegram Bot API settings.
    pub telegram: TelegramConfig,

    /// Intent classifier settings.
    pub llm: LlmConfig,

    /// Calendar backend settings.
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Dialogue engine settings.
    #[serde(default)]
    pub dialogue: DialogueConfig,
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Token issued by @BotFather.
    pub token: String,

    /// Bot API base URL.
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,

    /// Long-poll timeout for `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_seconds() -> u64 {
    25
}

/// Intent classifier settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Bearer token for the completion endpoint.
    pub api_key: String,

    /// Chat-completions URL.
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,

    /// Model identifier.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Prompt template file. A missing file falls back to the built-in prompt.
    #[serde(default = "default_prompt_path")]
    pub prompt_path: PathBuf,
}

fn default_llm_api_url() -> String {
    chronobot_ai::openai::DEFAULT_API_URL.to_string()
}

fn default_llm_model() -> String {
    "mistralai/mistral-7b-instruct:free".to_string()
}

fn default_llm_temperature() -> f32 {
    0.3
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_prompt_path() -> PathBuf {
    PathBuf::from("prompts/prompt_templates.json")
}

/// Which calendar implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarBackendKind {
    /// Google Calendar API v3.
    #[default]
    Google,
    /// Process-local calendar, for trying the bot without a Google account.
    Memory,
}

/// Calendar backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: CalendarBackendKind,

    /// Calendar to operate on.
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// OAuth client ID.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Long-lived OAuth refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// IANA zone name attached to created events.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Offset of the bot's calendar day from UTC, in minutes.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

fn default_utc_offset_minutes() -> i32 {
    180
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            backend: CalendarBackendKind::default(),
            calendar_id: default_calendar_id(),
            client_id: None,
            client_secret: None,
            refresh_token: None,
            timezone: default_timezone(),
            utc_offset_minutes: default_utc_offset_minutes(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl CalendarConfig {
    /// The configured offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is beyond +-18 hours.
    pub fn utc_offset(&self) -> Result<FixedOffset, Report<StartupError>> {
        Some(self.utc_offset_minutes)
            .filter(|minutes| minutes.abs() <= MAX_OFFSET_MINUTES)
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .ok_or_else(|| {
                StartupError::InvalidSetting {
                    key: "calendar.utc_offset_minutes",
                    reason: format!("{} is outside +-18h", self.utc_offset_minutes),
                }
                .into()
            })
    }
}

/// Dialogue engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DialogueConfig {
    /// Confidence below which a guess is confirmed with the user.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Length of events created without an end time, in minutes.
    #[serde(default = "default_event_duration_minutes")]
    pub default_event_duration_minutes: u64,

    /// Lifetime of a pending dialogue state, in seconds.
    #[serde(default = "default_pending_ttl_seconds")]
    pub pending_ttl_seconds: u64,

    /// Interval between sweeps of expired states, in seconds.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_confidence_threshold() -> f64 {
    0.80
}

fn default_event_duration_minutes() -> u64 {
    60
}

fn default_pending_ttl_seconds() -> u64 {
    900
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            default_event_duration_minutes: default_event_duration_minutes(),
            pending_ttl_seconds: default_pending_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl DialogueConfig {
    /// Default event length.
    #[must_use]
    pub fn default_event_duration(&self) -> Duration {
        Duration::from_secs(self.default_event_duration_minutes.saturating_mul(60))
    }

    /// Pending state lifetime.
    #[must_use]
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_seconds)
    }

    /// Sweep interval.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

fn require(key: &'static str, value: Option<&str>) -> Result<(), StartupError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && !PLACEHOLDERS.contains(&v) => Ok(()),
        Some(_) | None => Err(StartupError::InvalidSetting {
            key,
            reason: "must be set to a real value".to_string(),
        }),
    }
}

fn positive(key: &'static str, value: u64) -> Result<(), StartupError> {
    if value == 0 {
        return Err(StartupError::InvalidSetting {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

impl BotConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Report<StartupError>> {
        let builder = config::Config::builder().add_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        );
        Self::from_builder(builder)
    }

    /// Builds and validates configuration from any `config` source.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources fail to load, deserialize or validate.
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Report<StartupError>> {
        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StartupError::ConfigLoad {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the bot cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), Report<StartupError>> {
        require("telegram.token", Some(&self.telegram.token))?;
        require("llm.api_key", Some(&self.llm.api_key))?;
        positive("telegram.poll_timeout_seconds", self.telegram.poll_timeout_seconds)?;
        positive("llm.timeout_seconds", self.llm.timeout_seconds)?;
        positive("calendar.timeout_seconds", self.calendar.timeout_seconds)?;

        if self.calendar.backend == CalendarBackendKind::Google {
            require("calendar.client_id", self.calendar.client_id.as_deref())?;
            require("calendar.client_secret", self.calendar.client_secret.as_deref())?;
            require("calendar.refresh_token", self.calendar.refresh_token.as_deref())?;
        }
        self.calendar.utc_offset()?;

        let threshold = self.dialogue.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(StartupError::InvalidSetting {
                key: "dialogue.confidence_threshold",
                reason: format!("{threshold} is outside [0, 1]"),
            }
            .into());
        }
        let duration = self.dialogue.default_event_duration_minutes;
        positive("dialogue.default_event_duration_minutes", duration)?;
        if duration > MAX_EVENT_DURATION_MINUTES {
            return Err(StartupError::InvalidSetting {
                key: "dialogue.default_event_duration_minutes",
                reason: format!("{duration} exceeds {MAX_EVENT_DURATION_MINUTES}"),
            }
            .into());
        }
        positive("dialogue.pending_ttl_seconds", self.dialogue.pending_ttl_seconds)?;
        positive(
            "dialogue.sweep_interval_seconds",
            self.dialogue.sweep_interval_seconds,
        )?;
        Ok(())
    }
}
