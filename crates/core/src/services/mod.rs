//! Domain services.

pub mod message;
pub mod thread;

pub use message::{CreateMessageInput, MessageService};
pub use thread::{ParticipantProfile, ThreadService};
