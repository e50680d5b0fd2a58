//! Error types for the bot binary.

use std::fmt;

/// Errors that stop the bot from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Configuration could not be loaded.
    ConfigLoad { reason: String },
    /// A setting is present but unusable.
    InvalidSetting { key: &'static str, reason: String },
    /// A collaborator could not be constructed.
    Backend { component: &'static str, reason: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigLoad { reason } => {
                write!(f, "failed to load configuration: {reason}")
            }
            Self::InvalidSetting { key, reason } => {
                write!(f, "invalid setting '{key}': {reason}")
            }
            Self::Backend { component, reason } => {
                write!(f, "failed to initialize {component}: {reason}")
            }
        }
    }
}

impl std::error::Error for StartupError {}
