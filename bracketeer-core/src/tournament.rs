//! Tournament orchestration shared by every format
//!
//! Level 1 - Orchestration and Level 2 - Phases
//!
//! A [`Tournament`] owns the roster and match table ([`TournamentState`]),
//! the event handlers ([`EventBus`]) and one [`Format`] engine. Reporting a
//! result runs one pipeline: validate, record, score, fire
//! `on_match_complete`, then let the format advance.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{ScoringPolicy, TournamentConfig};
use crate::elimination::SingleElimination;
use crate::error::TournamentError;
use crate::events::{Event, EventBus, EventKind, Reporter};
use crate::matches::{Match, MatchId, Outcome, Slot};
use crate::participant::{Participant, ParticipantId};
use crate::state::{Phase, Standing, TournamentState};
use crate::swiss::Swiss;

/// Which slot of a match
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

// ============================================================================
// FORMAT CONTRACT
// ============================================================================

/// Pairing and advancement rules of a tournament format.
///
/// `seed` creates the initial matches when the tournament starts; `advance`
/// runs once after every recorded (and already scored) result.
pub trait Format: Send + fmt::Debug {
    /// Human-readable format name
    fn name(&self) -> &'static str;

    /// Reject participant counts or parameters this format cannot run
    fn validate(&self, participants: usize) -> Result<(), TournamentError>;

    /// Whether a match may end in a tie
    fn allows_ties(&self) -> bool {
        true
    }

    /// Ranking used for the first seeding. Defaults to insertion order.
    fn initial_order(&self, state: &TournamentState) -> Vec<ParticipantId> {
        state.participants().iter().map(|p| p.id).collect()
    }

    /// Points for (home, away) once `finished` has its outcome
    fn points(&self, policy: &ScoringPolicy, finished: &Match) -> (u32, u32) {
        match finished.outcome() {
            Some(Outcome::Tie) => (policy.tie, policy.tie),
            Some(Outcome::Winner(w)) if finished.home() == Slot::Filled(w) => {
                (policy.win, policy.loss)
            }
            Some(Outcome::Winner(_)) => (policy.loss, policy.win),
            None => (0, 0),
        }
    }

    /// Create the first matches
    fn seed(&mut self, ctx: &mut Context<'_>) -> Result<(), TournamentError>;

    /// React to a finished match
    fn advance(&mut self, ctx: &mut Context<'_>, finished: MatchId) -> Result<(), TournamentError>;

    /// Overall winner once the tournament is complete
    fn champion(&self, state: &TournamentState) -> Option<ParticipantId> {
        if state.phase() == Phase::Complete {
            state.ranked_ids().first().copied()
        } else {
            None
        }
    }

    /// Match the winner of `id` moves on to. `None` when results do not
    /// carry a winner forward (and for a bracket's final).
    fn next_match(&self, _id: MatchId) -> Option<MatchId> {
        None
    }

    /// Opponents `id` has been paired with, oldest first, when the format
    /// tracks them
    fn opponents_of(&self, _id: ParticipantId) -> &[ParticipantId] {
        &[]
    }
}

/// Mutable view handed to a [`Format`] while it seeds or advances
pub struct Context<'a> {
    state: &'a mut TournamentState,
    events: &'a mut EventBus,
    scoring: &'a ScoringPolicy,
}

impl<'a> Context<'a> {
    pub fn state(&self) -> &TournamentState {
        &*self.state
    }

    /// Fire `event` to its handlers
    pub fn emit(&mut self, event: Event) {
        self.events.emit(&*self.state, &event);
    }

    /// Append a match with both slots known
    pub fn create_match(&mut self, round: u32, home: Slot, away: Slot) -> MatchId {
        self.state.push_match(round, home, away)
    }

    /// Append an empty placeholder match
    pub fn create_placeholder(&mut self, round: u32) -> MatchId {
        self.state.push_placeholder(round)
    }

    /// Put `participant` into one slot of match `id`
    pub fn assign(&mut self, id: MatchId, side: Side, participant: ParticipantId) {
        let slot = Slot::Filled(participant);
        if let Some(m) = self.state.match_mut(id) {
            match side {
                Side::Home => m.set_home(slot),
                Side::Away => m.set_away(slot),
            }
            self.state.enter(slot, id);
        }
    }

    /// Remember `ranking` as the order that breaks future score ties
    pub fn set_ranking(&mut self, ranking: Vec<ParticipantId>) {
        self.state.set_ranking(ranking);
    }

    pub fn set_round(&mut self, round: u32) {
        self.state.set_round(round);
    }

    /// Enter the terminal phase and fire `on_complete`
    pub fn complete(&mut self) {
        self.state.set_phase(Phase::Complete);
        info!(
            "Tournament complete after {} matches",
            self.state.completed_matches().count()
        );
        self.emit(Event::Complete);
    }
}

/// Record `outcome` on match `id`, score it, fire `on_match_complete` and
/// let `format` advance.
///
/// Everything is validated before the first mutation, so an `Err` leaves the
/// tournament untouched.
pub fn resolve<F: Format + ?Sized>(
    format: &mut F,
    ctx: &mut Context<'_>,
    id: MatchId,
    outcome: Outcome,
) -> Result<(), TournamentError> {
    let m = ctx
        .state
        .get_match(id)
        .ok_or(TournamentError::UnknownMatch(id))?;
    m.validate(&outcome)?;
    if outcome == Outcome::Tie && !format.allows_ties() {
        return Err(TournamentError::TieNotAllowed {
            format: format.name(),
        });
    }

    let (home, away, home_points, away_points) = {
        let m = ctx
            .state
            .match_mut(id)
            .ok_or(TournamentError::UnknownMatch(id))?;
        m.record(outcome);
        let (home_points, away_points) = format.points(ctx.scoring, m);
        (m.home(), m.away(), home_points, away_points)
    };
    ctx.state.award(home, home_points);
    ctx.state.award(away, away_points);
    debug!("{} finished {:?} ({} vs {})", id, outcome, home, away);

    ctx.emit(Event::MatchComplete(id));
    format.advance(ctx, id)
}

// ============================================================================
// TOURNAMENT
// ============================================================================

/// A single competition run by one format
pub struct Tournament {
    state: TournamentState,
    format: Box<dyn Format>,
    events: EventBus,
    scoring: ScoringPolicy,
}

impl Tournament {
    /// Build a tournament from a configuration
    pub fn new(
        participants: Vec<Participant>,
        config: &TournamentConfig,
    ) -> Result<Self, TournamentError> {
        Self::with_format(participants, config.format.build(), config.scoring)
    }

    /// Build a tournament around any [`Format`] implementation
    pub fn with_format(
        participants: Vec<Participant>,
        format: Box<dyn Format>,
        scoring: ScoringPolicy,
    ) -> Result<Self, TournamentError> {
        format.validate(participants.len())?;
        let state = TournamentState::new(participants)?;

        Ok(Self {
            state,
            format,
            events: EventBus::new(),
            scoring,
        })
    }

    /// Swiss tournament with default scoring
    pub fn swiss(participants: Vec<Participant>, rounds: u32) -> Result<Self, TournamentError> {
        Self::with_format(participants, Box::new(Swiss::new(rounds)), ScoringPolicy::default())
    }

    /// Single-elimination tournament with default scoring
    pub fn single_elimination(participants: Vec<Participant>) -> Result<Self, TournamentError> {
        Self::with_format(
            participants,
            Box::new(SingleElimination::new()),
            ScoringPolicy::default(),
        )
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Register a handler for `kind`
    ///
    /// Results the handler queues on its [`Reporter`] are resolved once the
    /// current advancement has finished, in queue order.
    pub fn add_callback<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&TournamentState, &Event, &mut Reporter) + Send + 'static,
    {
        self.events.subscribe(kind, handler);
    }

    pub fn on_start<F>(&mut self, mut handler: F)
    where
        F: FnMut(&TournamentState) + Send + 'static,
    {
        self.add_callback(EventKind::Start, move |state, _, _| handler(state));
    }

    pub fn on_match_ready<F>(&mut self, handler: F)
    where
        F: FnMut(&TournamentState, &Match) + Send + 'static,
    {
        self.add_match_callback(EventKind::MatchReady, handler);
    }

    pub fn on_match_complete<F>(&mut self, handler: F)
    where
        F: FnMut(&TournamentState, &Match) + Send + 'static,
    {
        self.add_match_callback(EventKind::MatchComplete, handler);
    }

    pub fn on_start_round<F>(&mut self, mut handler: F)
    where
        F: FnMut(&TournamentState, u32) + Send + 'static,
    {
        self.add_callback(EventKind::StartRound, move |state, event, _| {
            if let Event::StartRound(round) = event {
                handler(state, *round);
            }
        });
    }

    pub fn on_complete<F>(&mut self, mut handler: F)
    where
        F: FnMut(&TournamentState) + Send + 'static,
    {
        self.add_callback(EventKind::Complete, move |state, _, _| handler(state));
    }

    fn add_match_callback<F>(&mut self, kind: EventKind, mut handler: F)
    where
        F: FnMut(&TournamentState, &Match) + Send + 'static,
    {
        self.add_callback(kind, move |state, event, _| {
            if let Some(m) = event.match_id().and_then(|id| state.get_match(id)) {
                handler(state, m);
            }
        });
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Reset scores, fix the initial ranking, fire `on_start` and seed the
    /// first matches. Callable once.
    pub fn start(&mut self) -> Result<(), TournamentError> {
        if self.state.phase() != Phase::Pending {
            return Err(TournamentError::AlreadyStarted);
        }

        self.state.reset_participants();
        let order = self.format.initial_order(&self.state);
        self.state.set_ranking(order);
        self.state.set_phase(Phase::Running);

        info!(
            "Starting {} tournament with {} players",
            self.format.name(),
            self.state.num_players()
        );

        let mut ctx = Context {
            state: &mut self.state,
            events: &mut self.events,
            scoring: &self.scoring,
        };
        ctx.emit(Event::Start);
        self.format.seed(&mut ctx)?;

        self.resolve_deferred();
        Ok(())
    }

    /// Report the result of a ready match
    pub fn report_result(&mut self, id: MatchId, outcome: Outcome) -> Result<(), TournamentError> {
        if self.state.phase() == Phase::Pending {
            return Err(TournamentError::NotStarted);
        }

        let result = self.resolve_one(id, outcome);
        match result {
            Ok(()) => self.resolve_deferred(),
            Err(ref e) => warn!("Rejected result for {}: {}", id, e),
        }
        result
    }

    /// Report a win for whoever plays on `side` of match `id`
    pub fn report_winner(&mut self, id: MatchId, side: Side) -> Result<(), TournamentError> {
        if self.state.phase() == Phase::Pending {
            return Err(TournamentError::NotStarted);
        }

        let m = self
            .state
            .get_match(id)
            .ok_or(TournamentError::UnknownMatch(id))?;
        if m.is_complete() {
            return Err(TournamentError::AlreadyReported { id });
        }

        let state = m.state();
        let slot = match side {
            Side::Home => m.home(),
            Side::Away => m.away(),
        };
        match slot.participant() {
            Some(winner) => self.report_result(id, Outcome::Winner(winner)),
            None => Err(TournamentError::MatchNotReady { id, state }),
        }
    }

    fn resolve_one(&mut self, id: MatchId, outcome: Outcome) -> Result<(), TournamentError> {
        let mut ctx = Context {
            state: &mut self.state,
            events: &mut self.events,
            scoring: &self.scoring,
        };
        resolve(self.format.as_mut(), &mut ctx, id, outcome)
    }

    /// Resolve results queued by handlers until the queue is empty. Each
    /// one runs only after the previous advancement has finished.
    fn resolve_deferred(&mut self) {
        while let Some((id, outcome)) = self.events.next_deferred() {
            debug!("Resolving queued result for {}", id);
            if let Err(e) = self.resolve_one(id, outcome) {
                warn!("Rejected queued result for {}: {}", id, e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> &TournamentState {
        &self.state
    }

    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    pub fn scoring(&self) -> &ScoringPolicy {
        &self.scoring
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_complete(&self) -> bool {
        self.state.phase() == Phase::Complete
    }

    pub fn current_round(&self) -> u32 {
        self.state.current_round()
    }

    pub fn rank(&self) -> Vec<&Participant> {
        self.state.rank()
    }

    pub fn standings(&self) -> Vec<Standing> {
        self.state.standings()
    }

    pub fn matches(&self) -> &[Match] {
        self.state.matches()
    }

    pub fn get_match(&self, id: MatchId) -> Option<&Match> {
        self.state.get_match(id)
    }

    pub fn active_matches(&self) -> Vec<&Match> {
        self.state.active_matches().collect()
    }

    pub fn completed_matches(&self) -> Vec<&Match> {
        self.state.completed_matches().collect()
    }

    /// Tournament winner, once complete
    pub fn champion(&self) -> Option<&Participant> {
        self.format
            .champion(&self.state)
            .and_then(|id| self.state.participant(id))
    }

    /// Match the winner of `id` moves on to (bracket formats)
    pub fn next_match(&self, id: MatchId) -> Option<MatchId> {
        self.format.next_match(id)
    }

    /// Opponents `id` has been paired with so far (Swiss)
    pub fn opponents_of(&self, id: ParticipantId) -> &[ParticipantId] {
        self.format.opponents_of(id)
    }
}

impl fmt::Debug for Tournament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tournament")
            .field("format", &self.format)
            .field("phase", &self.state.phase())
            .field("round", &self.state.current_round())
            .field("matches", &self.state.matches().len())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn roster(n: u32) -> Vec<Participant> {
        (1..=n).map(|i| Participant::new(i, format!("P{}", i))).collect()
    }

    /// Every player meets the next one once; completes after one result.
    #[derive(Debug)]
    struct SingleGame;

    impl Format for SingleGame {
        fn name(&self) -> &'static str {
            "Single game"
        }

        fn validate(&self, participants: usize) -> Result<(), TournamentError> {
            if participants == 2 {
                Ok(())
            } else {
                Err(TournamentError::TooFewParticipants(participants))
            }
        }

        fn seed(&mut self, ctx: &mut Context<'_>) -> Result<(), TournamentError> {
            let order = ctx.state().ranked_ids();
            let id = ctx.create_match(1, Slot::Filled(order[0]), Slot::Filled(order[1]));
            ctx.emit(Event::MatchReady(id));
            Ok(())
        }

        fn advance(&mut self, ctx: &mut Context<'_>, _finished: MatchId) -> Result<(), TournamentError> {
            ctx.complete();
            Ok(())
        }
    }

    fn single_game() -> Tournament {
        Tournament::with_format(roster(2), Box::new(SingleGame), ScoringPolicy::default()).unwrap()
    }

    #[test]
    fn test_format_validation_runs_at_construction() {
        let err = Tournament::with_format(roster(3), Box::new(SingleGame), ScoringPolicy::default())
            .unwrap_err();
        assert_eq!(err, TournamentError::TooFewParticipants(3));
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut t = single_game();
        t.start().unwrap();
        assert_eq!(t.start(), Err(TournamentError::AlreadyStarted));
        assert_eq!(t.matches().len(), 1);
    }

    #[test]
    fn test_report_before_start_rejected() {
        let mut t = single_game();
        assert_eq!(
            t.report_result(MatchId(0), Outcome::Tie),
            Err(TournamentError::NotStarted)
        );
        assert_eq!(
            t.report_winner(MatchId(0), Side::Home),
            Err(TournamentError::NotStarted)
        );
    }

    #[test]
    fn test_handler_report_resolves_after_seeding() {
        let mut t = single_game();
        t.add_callback(EventKind::MatchReady, |state, event, reporter| {
            if let Some(m) = event.match_id().and_then(|id| state.get_match(id)) {
                reporter.report_slot(m, m.away());
            }
        });

        t.start().unwrap();
        assert!(t.is_complete());
        assert_eq!(t.champion().map(|p| p.id), Some(ParticipantId(2)));
    }

    #[test]
    fn test_rejected_queued_report_is_dropped() {
        let mut t = single_game();
        // Reports the already finished match a second time
        t.add_callback(EventKind::MatchComplete, |_, event, reporter| {
            if let Some(id) = event.match_id() {
                reporter.report_result(id, Outcome::Tie);
            }
        });

        t.start().unwrap();
        t.report_winner(MatchId(0), Side::Home).unwrap();
        assert_eq!(t.rank()[0].score(), 3);
        assert_eq!(t.rank()[1].score(), 0);
    }

    #[test]
    fn test_default_format_hooks() {
        let mut t = single_game();
        t.start().unwrap();
        assert_eq!(t.next_match(MatchId(0)), None);
        assert!(t.opponents_of(ParticipantId(1)).is_empty());
    }

    #[test]
    fn test_unknown_match_rejected() {
        let mut t = single_game();
        t.start().unwrap();
        assert_eq!(
            t.report_result(MatchId(7), Outcome::Tie),
            Err(TournamentError::UnknownMatch(MatchId(7)))
        );
    }

    #[test]
    fn test_default_scoring_win() {
        let mut t = single_game();
        t.start().unwrap();
        t.report_winner(MatchId(0), Side::Away).unwrap();

        let ranked: Vec<u32> = t.rank().iter().map(|p| p.id.0).collect();
        assert_eq!(ranked, vec![2, 1]);
        assert_eq!(t.rank()[0].score(), 3);
        assert_eq!(t.rank()[1].score(), 0);
        assert!(t.is_complete());
        assert_eq!(t.champion().map(|p| p.id), Some(ParticipantId(2)));
    }

    #[test]
    fn test_default_scoring_tie() {
        let mut t = single_game();
        t.start().unwrap();
        t.report_result(MatchId(0), Outcome::Tie).unwrap();
        assert!(t.rank().iter().all(|p| p.score() == 1));
    }

    #[test]
    fn test_custom_scoring_policy() {
        let scoring = ScoringPolicy {
            win: 2,
            tie: 1,
            loss: 1,
        };
        let mut t = Tournament::with_format(roster(2), Box::new(SingleGame), scoring).unwrap();
        t.start().unwrap();
        t.report_winner(MatchId(0), Side::Home).unwrap();
        let scores: Vec<u32> = t.rank().iter().map(|p| p.score()).collect();
        assert_eq!(scores, vec![2, 1]);
    }

    #[test]
    fn test_event_order_for_one_result() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut t = single_game();
        for kind in EventKind::ALL {
            let log = Arc::clone(&log);
            t.add_callback(kind, move |_, event, _| log.lock().unwrap().push(*event));
        }

        t.start().unwrap();
        t.report_winner(MatchId(0), Side::Home).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Event::Start,
                Event::MatchReady(MatchId(0)),
                Event::MatchComplete(MatchId(0)),
                Event::Complete,
            ]
        );
    }

    #[test]
    fn test_handlers_see_scored_state() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut t = single_game();
        let sink = Arc::clone(&seen);
        t.on_match_complete(move |state, m| {
            let winner = m.winner().and_then(|id| state.participant(id)).unwrap();
            sink.lock().unwrap().push(winner.score());
        });

        t.start().unwrap();
        t.report_winner(MatchId(0), Side::Home).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_report_winner_on_finished_match() {
        let mut t = single_game();
        t.start().unwrap();
        t.report_winner(MatchId(0), Side::Home).unwrap();
        assert_eq!(
            t.report_winner(MatchId(0), Side::Away),
            Err(TournamentError::AlreadyReported { id: MatchId(0) })
        );
    }

    #[test]
    fn test_start_resets_scores() {
        let mut roster = roster(2);
        roster[0].award(9);
        let mut t =
            Tournament::with_format(roster, Box::new(SingleGame), ScoringPolicy::default()).unwrap();
        t.start().unwrap();
        assert!(t.rank().iter().all(|p| p.score() == 0));
    }
}
