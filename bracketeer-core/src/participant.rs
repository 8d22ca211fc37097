//! Tournament participants
//!
//! Level 4 - Data types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::matches::MatchId;

/// Stable participant identity, chosen by whoever enters the participant
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A competitor entered into a tournament
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identity (unique within a tournament)
    pub id: ParticipantId,
    /// Display name
    pub name: String,
    score: u32,
    history: Vec<MatchId>,
}

impl Participant {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId(id),
            name: name.into(),
            score: 0,
            history: Vec::new(),
        }
    }

    /// Cumulative tournament score
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Matches this participant has been placed in, oldest first
    pub fn history(&self) -> &[MatchId] {
        &self.history
    }

    /// The match the participant was most recently placed in
    pub fn current_match(&self) -> Option<MatchId> {
        self.history.last().copied()
    }

    pub(crate) fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub(crate) fn enter_match(&mut self, id: MatchId) {
        self.history.push(id);
    }

    /// Clears everything a previous run may have left behind.
    pub(crate) fn reset(&mut self) {
        self.score = 0;
        self.history.clear();
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.score)
    }
}
