//! Database entities.

pub mod message;
pub mod participant;
pub mod thread;
pub mod user;

pub use message::Entity as Message;
pub use participant::Entity as Participant;
pub use thread::Entity as Thread;
pub use user::Entity as User;
