//! Error types for tournament operations

use crate::matches::{MatchId, MatchState};
use crate::participant::ParticipantId;

/// Errors raised by tournament construction, lifecycle and result reporting.
///
/// Every error is raised before any state is touched, so a rejected call
/// leaves the tournament exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TournamentError {
    // Configuration
    #[error("Tournament has no participants")]
    NoParticipants,

    #[error("Swiss pairing needs an even number of participants, got {0}")]
    OddParticipantCount(usize),

    #[error("Single elimination needs at least two participants, got {0}")]
    TooFewParticipants(usize),

    #[error("Swiss tournament needs at least one round")]
    ZeroRounds,

    #[error("Participant {0} was entered more than once")]
    DuplicateParticipant(ParticipantId),

    // Protocol misuse
    #[error("Tournament has already been started")]
    AlreadyStarted,

    #[error("Tournament has not been started")]
    NotStarted,

    // Invalid transitions
    #[error("Unknown match {0}")]
    UnknownMatch(MatchId),

    #[error("Match {id} already has a result")]
    AlreadyReported { id: MatchId },

    #[error("Match {id} is {state:?}, results can only be reported on ready matches")]
    MatchNotReady { id: MatchId, state: MatchState },

    #[error("{format} does not allow tied matches")]
    TieNotAllowed { format: &'static str },

    #[error("Participant {winner} is not playing in match {id}")]
    NotInMatch { id: MatchId, winner: ParticipantId },
}

impl TournamentError {
    /// True for errors that make the tournament instance unusable.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TournamentError::NoParticipants
                | TournamentError::OddParticipantCount(_)
                | TournamentError::TooFewParticipants(_)
                | TournamentError::ZeroRounds
                | TournamentError::DuplicateParticipant(_)
        )
    }
}
