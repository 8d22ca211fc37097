//! Bracketeer Core - Tournament pairing and advancement
//!
//! This crate runs a competition from seeding to a final ranking:
//! - Participants, matches and the match result state machine
//! - Swiss format (re-paired by standing, repeat pairings avoided)
//! - Single-elimination format (pre-built bracket, byes, winner propagation)
//! - Lifecycle events for observers
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: Tournament (orchestration)
//! - Level 2: Format engines (Swiss, SingleElimination)
//! - Level 3: pairing, bracket construction, bye resolution (steps)
//! - Level 4: data types, events, configuration
//!
//! ## Example
//!
//! ```
//! use bracketeer_core::{Participant, Side, Tournament};
//!
//! let players = (1..=4).map(|i| Participant::new(i, format!("Player {}", i))).collect();
//! let mut tournament = Tournament::single_elimination(players).unwrap();
//! tournament.on_complete(|state| println!("Winner: {}", state.rank()[0]));
//! tournament.start().unwrap();
//!
//! loop {
//!     let Some(id) = tournament.active_matches().first().map(|m| m.id()) else {
//!         break;
//!     };
//!     tournament.report_winner(id, Side::Home).unwrap();
//! }
//! assert!(tournament.is_complete());
//! ```

mod config;
mod elimination;
mod error;
mod events;
mod matches;
mod participant;
mod shared;
mod state;
mod swiss;
mod tournament;

pub use config::{ScoringPolicy, TournamentConfig, TournamentFormat};
pub use elimination::{bracket_size, SingleElimination};
pub use error::TournamentError;
pub use events::{Event, EventBus, EventKind, Handler, Reporter};
pub use matches::{Match, MatchId, MatchState, Outcome, Slot};
pub use participant::{Participant, ParticipantId};
pub use shared::SharedTournament;
pub use state::{Phase, Standing, TournamentState};
pub use swiss::{pair_round, Pairing, Swiss};
pub use tournament::{resolve, Context, Format, Side, Tournament};
