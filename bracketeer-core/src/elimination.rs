//! Single-elimination bracket
//!
//! The whole bracket is built when the tournament starts. Matches live in
//! the tournament's match table; the bracket only keeps, per match id, the
//! parent it feeds and the two matches that feed it.
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 2: seed / advance (format contract)
//! - Level 3: seed_first_round, build_bracket, resolve_byes
//! - Level 4: bracket_size

use std::collections::VecDeque;
use std::iter;

use tracing::{debug, info};

use crate::error::TournamentError;
use crate::events::Event;
use crate::matches::{MatchId, Outcome, Slot};
use crate::participant::ParticipantId;
use crate::state::{Phase, TournamentState};
use crate::tournament::{resolve, Context, Format, Side};

/// Bracket links of one match
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct BracketNode {
    /// Match the winner moves on to; `None` for the final
    parent: Option<MatchId>,
    /// Matches feeding the (home, away) slots; `None` for first-round matches
    sources: Option<(MatchId, MatchId)>,
}

/// Single-elimination engine
#[derive(Clone, Debug, Default)]
pub struct SingleElimination {
    field_size: usize,
    /// Indexed by `MatchId`
    nodes: Vec<BracketNode>,
    final_match: Option<MatchId>,
}

impl SingleElimination {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_node(&mut self, id: MatchId, node: BracketNode) {
        debug_assert_eq!(id.0, self.nodes.len());
        self.nodes.push(node);
    }

    // ========================================================================
    // LEVEL 3 - STEPS
    // ========================================================================

    /// Strongest remaining plays weakest remaining; byes pad the bottom.
    fn seed_first_round(&mut self, ctx: &mut Context<'_>) -> Vec<MatchId> {
        let ranking = ctx.state().ranked_ids();
        let byes = self.field_size - ranking.len();

        let mut queue: VecDeque<Slot> = ranking
            .into_iter()
            .map(Slot::Filled)
            .chain(iter::repeat(Slot::Bye).take(byes))
            .collect();

        let mut leaves = Vec::with_capacity(self.field_size / 2);
        while queue.len() >= 2 {
            let (Some(home), Some(away)) = (queue.pop_front(), queue.pop_back()) else {
                break;
            };
            let id = ctx.create_match(1, home, away);
            self.push_node(id, BracketNode::default());
            debug!("Seeded {}: {} vs {}", id, home, away);
            leaves.push(id);
            ctx.emit(Event::MatchReady(id));
        }

        leaves
    }

    /// Pair matches two by two into placeholders until only the final is left.
    fn build_bracket(&mut self, ctx: &mut Context<'_>, leaves: Vec<MatchId>) {
        let mut level = leaves;
        let mut round = 1;

        while level.len() > 1 {
            round += 1;
            let mut next = Vec::with_capacity(level.len() / 2);

            for pair in level.chunks_exact(2) {
                let (top, bottom) = (pair[0], pair[1]);
                let id = ctx.create_placeholder(round);
                self.push_node(
                    id,
                    BracketNode {
                        parent: None,
                        sources: Some((top, bottom)),
                    },
                );
                self.nodes[top.0].parent = Some(id);
                self.nodes[bottom.0].parent = Some(id);
                next.push(id);
            }

            level = next;
        }

        self.final_match = level.first().copied();
    }

    /// Auto-complete every ready match against a bye, in match order,
    /// until none is left.
    fn resolve_byes(&mut self, ctx: &mut Context<'_>) -> Result<(), TournamentError> {
        while let Some((id, winner)) = next_bye(ctx.state()) {
            debug!("{} is a bye, {} advances", id, winner);
            resolve(&mut *self, ctx, id, Outcome::Winner(winner))?;
        }
        Ok(())
    }
}

/// First ready match whose away slot is a bye, with its home participant
fn next_bye(state: &TournamentState) -> Option<(MatchId, ParticipantId)> {
    state
        .active_matches()
        .filter(|m| m.away() == Slot::Bye)
        .find_map(|m| m.home().participant().map(|home| (m.id(), home)))
}

// ============================================================================
// LEVEL 2 - FORMAT CONTRACT
// ============================================================================

impl Format for SingleElimination {
    fn name(&self) -> &'static str {
        "Single elimination"
    }

    fn validate(&self, participants: usize) -> Result<(), TournamentError> {
        match participants {
            0 => Err(TournamentError::NoParticipants),
            1 => Err(TournamentError::TooFewParticipants(1)),
            _ => Ok(()),
        }
    }

    fn allows_ties(&self) -> bool {
        false
    }

    fn seed(&mut self, ctx: &mut Context<'_>) -> Result<(), TournamentError> {
        let (rounds, field_size) = bracket_size(ctx.state().num_players());
        self.field_size = field_size;
        self.nodes.clear();
        ctx.set_round(1);

        info!(
            "Bracket: {} players, field of {}, {} rounds",
            ctx.state().num_players(),
            field_size,
            rounds
        );

        let leaves = self.seed_first_round(ctx);
        self.build_bracket(ctx, leaves);
        self.resolve_byes(ctx)
    }

    fn advance(&mut self, ctx: &mut Context<'_>, finished: MatchId) -> Result<(), TournamentError> {
        let node = self.nodes.get(finished.0).copied().unwrap_or_default();

        let Some(parent) = node.parent else {
            // Only the final has no parent
            ctx.complete();
            return Ok(());
        };

        let Some(winner) = ctx.state().get_match(finished).and_then(|m| m.winner()) else {
            return Ok(());
        };

        let side = match self.nodes.get(parent.0).and_then(|n| n.sources) {
            Some((home_source, _)) if home_source == finished => Side::Home,
            _ => Side::Away,
        };
        ctx.assign(parent, side, winner);
        debug!("{} advances from {} to {} ({:?})", winner, finished, parent, side);

        let ready = ctx.state().get_match(parent).map(|m| (m.is_active(), m.round()));
        if let Some((true, round)) = ready {
            if round > ctx.state().current_round() {
                ctx.set_round(round);
            }
            ctx.emit(Event::MatchReady(parent));
        }
        Ok(())
    }

    fn champion(&self, state: &TournamentState) -> Option<ParticipantId> {
        if state.phase() != Phase::Complete {
            return None;
        }
        self.final_match
            .and_then(|id| state.get_match(id))
            .and_then(|m| m.winner())
    }

    fn next_match(&self, id: MatchId) -> Option<MatchId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// (rounds, field size) for `players` entrants: the field is the smallest
/// power of two that holds everyone.
pub fn bracket_size(players: usize) -> (u32, usize) {
    let field_size = players.max(1).next_power_of_two();
    (field_size.trailing_zeros(), field_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_size() {
        assert_eq!(bracket_size(2), (1, 2));
        assert_eq!(bracket_size(3), (2, 4));
        assert_eq!(bracket_size(4), (2, 4));
        assert_eq!(bracket_size(5), (3, 8));
        assert_eq!(bracket_size(8), (3, 8));
        assert_eq!(bracket_size(9), (4, 16));
        assert_eq!(bracket_size(1), (0, 1));
    }

    #[test]
    fn test_validate() {
        let format = SingleElimination::new();
        assert_eq!(format.validate(0), Err(TournamentError::NoParticipants));
        assert_eq!(format.validate(1), Err(TournamentError::TooFewParticipants(1)));
        assert_eq!(format.validate(2), Ok(()));
        assert_eq!(format.validate(7), Ok(()));
    }

    #[test]
    fn test_ties_not_allowed() {
        assert!(!SingleElimination::new().allows_ties());
    }

    #[test]
    fn test_unstarted_bracket_has_no_links() {
        let format = SingleElimination::new();
        assert_eq!(format.next_match(MatchId(0)), None);
        assert_eq!(format.final_match, None);
    }

    #[test]
    fn test_eight_player_links() {
        use crate::participant::Participant;
        use crate::tournament::Tournament;

        let roster = (1..=8).map(|i| Participant::new(i, format!("P{}", i))).collect();
        let mut t = Tournament::single_elimination(roster).unwrap();
        t.start().unwrap();

        // Leaves 0..4 feed 4 and 5 pairwise, which feed the final 6
        let parents: Vec<Option<usize>> =
            (0..7).map(|i| t.next_match(MatchId(i)).map(|p| p.0)).collect();
        assert_eq!(
            parents,
            vec![Some(4), Some(4), Some(5), Some(5), Some(6), Some(6), None]
        );
    }
}
