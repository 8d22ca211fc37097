//! Tournament state shared by every format: roster, match table, standings
//!
//! Level 3 - Steps and Level 4 - Accessors

use std::cmp::Reverse;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::TournamentError;
use crate::matches::{Match, MatchId, Outcome, Slot};
use crate::participant::{Participant, ParticipantId};

/// Lifecycle phase of a tournament
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Constructed, `start()` not called yet
    Pending,
    /// Started, waiting for results
    Running,
    /// Terminal: `on_complete` has fired
    Complete,
}

/// Standing of a participant in the tournament
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based position in the ranking
    pub place: usize,
    pub id: ParticipantId,
    pub name: String,
    /// Tournament score
    pub score: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// Completed matches, byes included
    pub played: u32,
}

/// Participants, matches and ranking of one tournament
#[derive(Clone, Debug)]
pub struct TournamentState {
    participants: Vec<Participant>,
    index: FxHashMap<ParticipantId, usize>,
    matches: Vec<Match>,
    /// Most recent ranking, used to break score ties
    ranking: Vec<ParticipantId>,
    phase: Phase,
    round: u32,
}

impl TournamentState {
    pub(crate) fn new(participants: Vec<Participant>) -> Result<Self, TournamentError> {
        if participants.is_empty() {
            return Err(TournamentError::NoParticipants);
        }

        let mut index = FxHashMap::default();
        for (i, p) in participants.iter().enumerate() {
            if index.insert(p.id, i).is_some() {
                return Err(TournamentError::DuplicateParticipant(p.id));
            }
        }

        let ranking = participants.iter().map(|p| p.id).collect();

        Ok(Self {
            participants,
            index,
            matches: Vec::new(),
            ranking,
            phase: Phase::Pending,
            round: 0,
        })
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Participants in insertion order
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.index.get(&id).map(|&i| &self.participants[i])
    }

    pub fn num_players(&self) -> usize {
        self.participants.len()
    }

    /// Every match ever created, in creation order
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn get_match(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(id.0)
    }

    /// Matches with both players assigned and no result
    pub fn active_matches(&self) -> impl Iterator<Item = &Match> + '_ {
        self.matches.iter().filter(|m| m.is_active())
    }

    /// Matches with a recorded result
    pub fn completed_matches(&self) -> impl Iterator<Item = &Match> + '_ {
        self.matches.iter().filter(|m| m.is_complete())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Round counter (Swiss round, or deepest bracket round reached)
    pub fn current_round(&self) -> u32 {
        self.round
    }

    /// Participant ids by descending score.
    ///
    /// Equal scores keep their order from the most recent ranking (insertion
    /// order before the first one).
    pub fn ranked_ids(&self) -> Vec<ParticipantId> {
        let mut ids = self.ranking.clone();
        // sort_by_key is stable
        ids.sort_by_key(|id| Reverse(self.score_of(*id)));
        ids
    }

    /// Participants by descending score, ties broken by the prior ranking
    pub fn rank(&self) -> Vec<&Participant> {
        self.ranked_ids()
            .into_iter()
            .filter_map(|id| self.participant(id))
            .collect()
    }

    /// Ranking with win/loss/tie records
    pub fn standings(&self) -> Vec<Standing> {
        self.rank()
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let (wins, losses, ties) = self.record_of(p.id);
                Standing {
                    place: i + 1,
                    id: p.id,
                    name: p.name.clone(),
                    score: p.score(),
                    wins,
                    losses,
                    ties,
                    played: wins + losses + ties,
                }
            })
            .collect()
    }

    fn score_of(&self, id: ParticipantId) -> u32 {
        self.participant(id).map_or(0, Participant::score)
    }

    fn record_of(&self, id: ParticipantId) -> (u32, u32, u32) {
        let mut wins = 0;
        let mut losses = 0;
        let mut ties = 0;

        for m in self.completed_matches().filter(|m| m.involves(id)) {
            match m.outcome() {
                Some(Outcome::Tie) => ties += 1,
                Some(Outcome::Winner(w)) if w == id => wins += 1,
                Some(Outcome::Winner(_)) => losses += 1,
                None => {}
            }
        }

        (wins, losses, ties)
    }

    // ------------------------------------------------------------------
    // Mutation (crate-internal, driven by the tournament and its format)
    // ------------------------------------------------------------------

    /// Reset scores and histories for a fresh run
    pub(crate) fn reset_participants(&mut self) {
        for p in &mut self.participants {
            p.reset();
        }
    }

    pub(crate) fn set_ranking(&mut self, ranking: Vec<ParticipantId>) {
        debug_assert_eq!(ranking.len(), self.participants.len());
        self.ranking = ranking;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    pub(crate) fn award(&mut self, slot: Slot, points: u32) {
        if let Some(id) = slot.participant() {
            if let Some(&i) = self.index.get(&id) {
                self.participants[i].award(points);
            }
        }
    }

    /// Append a match and record it in the history of its players
    pub(crate) fn push_match(&mut self, round: u32, home: Slot, away: Slot) -> MatchId {
        let id = MatchId(self.matches.len());
        self.matches.push(Match::new(id, round, home, away));
        self.enter(home, id);
        self.enter(away, id);
        id
    }

    pub(crate) fn push_placeholder(&mut self, round: u32) -> MatchId {
        let id = MatchId(self.matches.len());
        self.matches.push(Match::placeholder(id, round));
        id
    }

    pub(crate) fn match_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.get_mut(id.0)
    }

    pub(crate) fn enter(&mut self, slot: Slot, id: MatchId) {
        if let Some(pid) = slot.participant() {
            if let Some(&i) = self.index.get(&pid) {
                self.participants[i].enter_match(id);
            }
        }
    }
}
