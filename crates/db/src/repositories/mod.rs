//! Data-access repositories.

pub mod message;
pub mod participant;
pub mod thread;
pub mod user;

pub use message::MessageRepository;
pub use participant::ParticipantRepository;
pub use thread::ThreadRepository;
pub use user::UserRepository;
