pub mod event;
pub mod forward_message;
pub mod message_log;
pub mod participant;
pub mod pending_relay;
pub mod user;

pub use event::*;
pub use forward_message::*;
pub use message_log::*;
pub use participant::*;
pub use pending_relay::*;
pub use user::*;
