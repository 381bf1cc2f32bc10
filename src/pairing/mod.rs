//! Participant pairing for gift exchanges.
//!
//! The engine turns the participant set of one event into a derangement:
//! every participant gives exactly one gift, receives exactly one gift, and
//! never draws their own name. It knows nothing about storage or Telegram;
//! callers hand it identifiers and persist the result themselves.

pub mod derangement;

pub use derangement::*;
