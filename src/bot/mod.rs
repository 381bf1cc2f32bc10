pub mod commands;
pub mod history;
pub mod handlers;
pub mod keyboards;
pub mod transport;
