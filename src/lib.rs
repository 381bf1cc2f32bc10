//! # Secret Santa Bot
//!
//! A Telegram bot for Secret Santa and Saint Nicholas gift exchanges.
//!
//! ## Features
//! - Events with open/closed registration and deep-link invitations
//! - Random pairing of participants with nobody drawing themselves
//! - Anonymous messages between a gift giver and their recipient
//! - Persistent storage with SQLite

/// Bot command handlers and message processing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Derangement sampling for gift assignments
pub mod pairing;
/// Event lifecycle, distribution, relay and background services
pub mod services;
/// Utility functions for datetime, validation, and formatting
pub mod utils;
