use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::utils::logging::log_pairing_event;

/// Number of discarded passes after which a successful draw is still logged as anomalous.
pub const ANOMALOUS_ATTEMPTS: u32 = 50;

/// Default safety cap for the rejection-sampling loop.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// What a drawer does when the name on top of the hat is their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawRule {
    /// Reject the whole pass and draw again from fresh shuffles.
    ///
    /// Exactly uniform over all derangements.
    #[default]
    Strict,
    /// Take the next name instead and leave the own name in the hat for the
    /// following drawer. A pass only fails when the last drawer is left with
    /// their own name.
    Lookahead,
}

impl DrawRule {
    /// Name used in configuration (`PAIRING_DRAW_RULE`) and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawRule::Strict => "strict",
            DrawRule::Lookahead => "lookahead",
        }
    }
}

impl fmt::Display for DrawRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawRule {
    type Err = PairingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(DrawRule::Strict),
            "lookahead" => Ok(DrawRule::Lookahead),
            other => Err(PairingError::UnknownDrawRule(other.to_string())),
        }
    }
}

/// Tuning of [`distribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingSettings {
    /// Passes to try before giving up with [`PairingError::NotConverged`].
    /// Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// How a drawer reacts to drawing their own name.
    pub draw_rule: DrawRule,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            draw_rule: DrawRule::default(),
        }
    }
}

/// Why no pairing was produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PairingError {
    /// Nobody can give to someone else with fewer than two people.
    #[error("at least 2 participants are required, got {count}")]
    TooFewParticipants {
        /// Size of the participant list that was passed in.
        count: usize,
    },

    /// The same participant appears twice in the input.
    #[error("participant list contains duplicates")]
    DuplicateParticipant,

    /// Every allowed pass ended in a self-draw.
    #[error("no valid pairing found after {attempts} attempts")]
    NotConverged {
        /// Passes that were tried.
        attempts: u32,
    },

    /// A configured draw rule name is neither `strict` nor `lookahead`.
    #[error("unknown draw rule: {0:?}")]
    UnknownDrawRule(String),
}

/// A completed derangement.
///
/// Only the forward direction (giver → recipient) is authoritative; the
/// reverse index is rebuilt from it and never edited on its own.
#[derive(Debug, Clone)]
pub struct Pairing<T: Eq + Hash> {
    recipients: HashMap<T, T>,
    givers: HashMap<T, T>,
    attempts: u32,
}

impl<T: Clone + Eq + Hash> Pairing<T> {
    fn new(recipients: HashMap<T, T>, attempts: u32) -> Self {
        let givers = recipients
            .iter()
            .map(|(giver, recipient)| (recipient.clone(), giver.clone()))
            .collect();

        Self {
            recipients,
            givers,
            attempts,
        }
    }

    /// Who `giver` buys a gift for.
    pub fn recipient_of(&self, giver: &T) -> Option<&T> {
        self.recipients.get(giver)
    }

    /// Who drew `recipient`.
    pub fn giver_of(&self, recipient: &T) -> Option<&T> {
        self.givers.get(recipient)
    }

    /// Iterates `(giver, recipient)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &T)> {
        self.recipients.iter()
    }

    /// Number of participants, which is also the number of gifts.
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    /// Always `false` for a pairing returned by [`distribute`].
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Number of passes it took, including the successful one.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The giver → recipient map, dropping the reverse index.
    pub fn into_assignments(self) -> HashMap<T, T> {
        self.recipients
    }
}

/// Pairs every participant with a recipient other than themselves.
///
/// Each pass shuffles the drawing order and the hat independently, then lets
/// drawers take names from the top of the hat in order. Passes that end in a
/// self-draw are thrown away and redrawn with fresh randomness, up to
/// `settings.max_attempts` passes.
pub fn distribute<T, R>(
    participants: &[T],
    rng: &mut R,
    settings: &PairingSettings,
) -> Result<Pairing<T>, PairingError>
where
    T: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    if participants.len() < 2 {
        return Err(PairingError::TooFewParticipants {
            count: participants.len(),
        });
    }

    let unique: HashSet<&T> = participants.iter().collect();
    if unique.len() != participants.len() {
        return Err(PairingError::DuplicateParticipant);
    }

    let max_attempts = settings.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if let Some(recipients) = draw_once(participants, rng, settings.draw_rule) {
            if attempt > ANOMALOUS_ATTEMPTS {
                tracing::warn!(
                    "PAIRING: {} participants needed {} passes with rule {}",
                    participants.len(),
                    attempt,
                    settings.draw_rule
                );
            } else {
                log_pairing_event(
                    "pairing complete",
                    &format!(
                        "{} participants, {} pass(es), rule {}",
                        participants.len(),
                        attempt,
                        settings.draw_rule
                    ),
                );
            }
            return Ok(Pairing::new(recipients, attempt));
        }
    }

    tracing::error!(
        "PAIRING: gave up on {} participants after {} passes with rule {}",
        participants.len(),
        max_attempts,
        settings.draw_rule
    );
    Err(PairingError::NotConverged {
        attempts: max_attempts,
    })
}

/// One pass over freshly shuffled lists. `None` means the pass must be discarded.
fn draw_once<T, R>(participants: &[T], rng: &mut R, rule: DrawRule) -> Option<HashMap<T, T>>
where
    T: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let mut drawing_order = participants.to_vec();
    drawing_order.shuffle(rng);

    let mut hat = participants.to_vec();
    hat.shuffle(rng);

    // The last drawer must not end up facing their own name at the bottom.
    let last = hat.len() - 1;
    if hat[last] == drawing_order[last] {
        let other = rng.gen_range(0..last);
        hat.swap(other, last);
    }

    let mut hat: VecDeque<T> = hat.into();
    let mut recipients = HashMap::with_capacity(participants.len());

    for giver in drawing_order {
        let drew_self = hat.front() == Some(&giver);
        let recipient = if !drew_self {
            hat.pop_front()
        } else {
            match rule {
                DrawRule::Strict => None,
                DrawRule::Lookahead => hat.remove(1),
            }
        }?;
        recipients.insert(giver, recipient);
    }

    Some(recipients)
}

/// Checks that `assignments` is a derangement of `participants`.
pub fn is_derangement<T: Eq + Hash>(participants: &[T], assignments: &HashMap<T, T>) -> bool {
    if assignments.len() != participants.len() {
        return false;
    }

    let mut received = HashSet::with_capacity(participants.len());
    for participant in participants {
        match assignments.get(participant) {
            Some(recipient) if recipient != participant => {
                if !participants.contains(recipient) || !received.insert(recipient) {
                    return false;
                }
            }
            _ => return false,
        }
    }

    true
}
