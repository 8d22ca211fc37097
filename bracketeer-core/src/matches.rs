//! Matches and their result state machine
//!
//! A match moves `Unseeded -> Ready` once both slots are assigned and
//! `Ready -> Completed` exactly once, when its outcome is recorded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TournamentError;
use crate::participant::ParticipantId;

/// Match identifier (index into the tournament's match table)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(pub usize);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// One side of a match
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    /// Not decided yet (bracket placeholder)
    #[default]
    Empty,
    /// Padding opponent that forfeits automatically
    Bye,
    /// A real participant
    Filled(ParticipantId),
}

impl Slot {
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Slot::Empty)
    }

    pub fn participant(&self) -> Option<ParticipantId> {
        match self {
            Slot::Filled(id) => Some(*id),
            Slot::Empty | Slot::Bye => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Empty => write!(f, "TBD"),
            Slot::Bye => write!(f, "BYE"),
            Slot::Filled(id) => write!(f, "{}", id),
        }
    }
}

/// Reported result of a match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(ParticipantId),
    Tie,
}

/// Lifecycle state of a match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchState {
    /// One or both slots still empty
    Unseeded,
    /// Both slots assigned, waiting for a result
    Ready,
    /// Result recorded
    Completed,
}

/// A two-slot contest
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Match {
    id: MatchId,
    round: u32,
    home: Slot,
    away: Slot,
    outcome: Option<Outcome>,
    loser: Option<ParticipantId>,
}

impl Match {
    pub(crate) fn new(id: MatchId, round: u32, home: Slot, away: Slot) -> Self {
        Self {
            id,
            round,
            home,
            away,
            outcome: None,
            loser: None,
        }
    }

    /// Empty bracket placeholder, filled in as feeder matches finish
    pub(crate) fn placeholder(id: MatchId, round: u32) -> Self {
        Self::new(id, round, Slot::Empty, Slot::Empty)
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Swiss round, or bracket depth (1 = first round) for elimination
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn home(&self) -> Slot {
        self.home
    }

    pub fn away(&self) -> Slot {
        self.away
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Winning participant, if the match was decided (ties have none)
    pub fn winner(&self) -> Option<ParticipantId> {
        match self.outcome {
            Some(Outcome::Winner(id)) => Some(id),
            _ => None,
        }
    }

    /// Losing participant; `None` for ties, byes and undecided matches
    pub fn loser(&self) -> Option<ParticipantId> {
        self.loser
    }

    pub fn state(&self) -> MatchState {
        if self.outcome.is_some() {
            MatchState::Completed
        } else if self.home.is_assigned() && self.away.is_assigned() {
            MatchState::Ready
        } else {
            MatchState::Unseeded
        }
    }

    /// Both players known and no result yet
    pub fn is_active(&self) -> bool {
        self.state() == MatchState::Ready
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// True if `id` occupies either slot
    pub fn involves(&self, id: ParticipantId) -> bool {
        self.home == Slot::Filled(id) || self.away == Slot::Filled(id)
    }

    /// Check that `outcome` may be recorded, without changing anything.
    pub(crate) fn validate(&self, outcome: &Outcome) -> Result<(), TournamentError> {
        match self.state() {
            MatchState::Completed => return Err(TournamentError::AlreadyReported { id: self.id }),
            MatchState::Unseeded => {
                return Err(TournamentError::MatchNotReady {
                    id: self.id,
                    state: MatchState::Unseeded,
                })
            }
            MatchState::Ready => {}
        }

        match outcome {
            Outcome::Tie => Ok(()),
            Outcome::Winner(winner) if self.involves(*winner) => Ok(()),
            Outcome::Winner(winner) => Err(TournamentError::NotInMatch {
                id: self.id,
                winner: *winner,
            }),
        }
    }

    /// Record the outcome and derive the loser. Callers validate first.
    pub(crate) fn record(&mut self, outcome: Outcome) {
        debug_assert!(self.validate(&outcome).is_ok());

        self.loser = match outcome {
            Outcome::Tie => None,
            Outcome::Winner(winner) if self.home == Slot::Filled(winner) => self.away.participant(),
            Outcome::Winner(_) => self.home.participant(),
        };
        self.outcome = Some(outcome);
    }

    pub(crate) fn set_home(&mut self, slot: Slot) {
        self.home = slot;
    }

    pub(crate) fn set_away(&mut self, slot: Slot) {
        self.away = slot;
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} vs {}", self.id, self.home, self.away)?;
        match self.outcome {
            Some(Outcome::Winner(id)) => write!(f, " (winner {})", id),
            Some(Outcome::Tie) => write!(f, " (tie)"),
            None => Ok(()),
        }
    }
}
