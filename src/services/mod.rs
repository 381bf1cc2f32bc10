pub mod distribution;
pub mod health;
pub mod janitor;
pub mod registration;
pub mod relay;
