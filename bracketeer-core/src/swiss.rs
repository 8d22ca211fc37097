//! Swiss format: fixed number of rounds, re-paired by standing each round
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 2: seed / advance (format contract)
//! - Level 3: setup_round
//! - Level 4: pair_round (pure pairing step)

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::TournamentError;
use crate::events::Event;
use crate::matches::{MatchId, Slot};
use crate::participant::ParticipantId;
use crate::tournament::{Context, Format};

/// One pairing produced for a round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pairing {
    pub home: ParticipantId,
    pub away: ParticipantId,
    /// Home had already faced everyone left in the queue
    pub forced_repeat: bool,
}

/// Swiss pairing engine
#[derive(Clone, Debug)]
pub struct Swiss {
    rounds: u32,
    opponents: FxHashMap<ParticipantId, Vec<ParticipantId>>,
    /// Matches of the current round still waiting for a result
    pending: usize,
}

impl Swiss {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds,
            opponents: FxHashMap::default(),
            pending: 0,
        }
    }

    fn record_pairing(&mut self, a: ParticipantId, b: ParticipantId) {
        self.opponents.entry(a).or_default().push(b);
        self.opponents.entry(b).or_default().push(a);
    }

    // ========================================================================
    // LEVEL 3 - STEPS
    // ========================================================================

    /// Pair everyone by current rank and open the next round
    fn setup_round(&mut self, ctx: &mut Context<'_>) {
        let round = ctx.state().current_round() + 1;
        ctx.set_round(round);

        let order = ctx.state().ranked_ids();
        ctx.set_ranking(order.clone());

        let pairings = pair_round(&order, &self.opponents);
        self.pending = pairings.len();
        info!("Round {} of {}: {} pairings", round, self.rounds, pairings.len());

        for pairing in pairings {
            if pairing.forced_repeat {
                warn!(
                    "Round {}: {} has played everyone left, repeating against {}",
                    round, pairing.home, pairing.away
                );
            }

            let id = ctx.create_match(round, Slot::Filled(pairing.home), Slot::Filled(pairing.away));
            self.record_pairing(pairing.home, pairing.away);
            debug!("Round {}: {} vs {} ({})", round, pairing.home, pairing.away, id);
            ctx.emit(Event::MatchReady(id));
        }

        ctx.emit(Event::StartRound(round));
    }
}

// ============================================================================
// LEVEL 2 - FORMAT CONTRACT
// ============================================================================

impl Format for Swiss {
    fn name(&self) -> &'static str {
        "Swiss"
    }

    fn validate(&self, participants: usize) -> Result<(), TournamentError> {
        if self.rounds == 0 {
            return Err(TournamentError::ZeroRounds);
        }
        match participants {
            0 => Err(TournamentError::NoParticipants),
            n if n % 2 == 1 => Err(TournamentError::OddParticipantCount(n)),
            _ => Ok(()),
        }
    }

    fn seed(&mut self, ctx: &mut Context<'_>) -> Result<(), TournamentError> {
        self.opponents.clear();
        self.setup_round(ctx);
        Ok(())
    }

    fn advance(&mut self, ctx: &mut Context<'_>, finished: MatchId) -> Result<(), TournamentError> {
        self.pending = self.pending.saturating_sub(1);
        if self.pending > 0 {
            debug!("{} done, {} left this round", finished, self.pending);
            return Ok(());
        }

        if ctx.state().current_round() < self.rounds {
            self.setup_round(ctx);
        } else {
            ctx.complete();
        }
        Ok(())
    }

    fn opponents_of(&self, id: ParticipantId) -> &[ParticipantId] {
        self.opponents.get(&id).map_or(&[][..], Vec::as_slice)
    }
}

// ============================================================================
// LEVEL 4 - PAIRING
// ============================================================================

/// Greedy pairing of `order` (best first).
///
/// The front of the queue plays the first remaining participant it has not
/// met yet; when it has met all of them it plays the new front again.
pub fn pair_round(
    order: &[ParticipantId],
    opponents: &FxHashMap<ParticipantId, Vec<ParticipantId>>,
) -> Vec<Pairing> {
    let mut queue: VecDeque<ParticipantId> = order.iter().copied().collect();
    let mut pairings = Vec::with_capacity(order.len() / 2);

    while let Some(home) = queue.pop_front() {
        let faced = opponents.get(&home).map_or(&[][..], Vec::as_slice);

        let fresh = queue.iter().position(|p| !faced.contains(p));
        let (away, forced_repeat) = match fresh {
            Some(i) => (queue.remove(i), false),
            None => (queue.pop_front(), true),
        };

        match away {
            Some(away) => pairings.push(Pairing {
                home,
                away,
                forced_repeat,
            }),
            // Odd counts are rejected at construction
            None => break,
        }
    }

    pairings
}
