//! Multi-turn dialogue handling for chronobot.
//!
//! This crate provides:
//!
//! - **Context Store**: at most one pending dialogue state per conversation,
//!   bounded by a TTL
//! - **Dialogue Engine**: the per-message state machine over classifier
//!   results and yes/no replies
//! - **Action Dispatcher**: calendar create, list and delete with
//!   user-facing replies
//! - **Conversation Driver**: command routing and per-conversation
//!   serialization
//! - **Transport**: the seam between the driver and a chat platform

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod driver;
pub mod engine;
pub mod error;
pub mod format;
pub mod messages;
pub mod reply;
pub mod state;
pub mod transport;

pub use command::Command;
pub use context::{ContextStore, DEFAULT_PENDING_TTL};
pub use dispatcher::{ActionDispatcher, DEFAULT_EVENT_DURATION, Dispatch};
pub use driver::ConversationDriver;
pub use engine::{DEFAULT_CONFIDENCE_THRESHOLD, DialogueEngine};
pub use error::TransportError;
pub use reply::YesNo;
pub use state::{PendingEntry, PendingState};
pub use transport::{Inbound, Transport};
