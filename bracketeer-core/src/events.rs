//! Lifecycle events and the per-tournament handler registry
//!
//! Handlers for one event kind fire in registration order. Nothing is
//! promised about the relative order of different kinds raised by the
//! same cause.
//!
//! Handlers may report results through the [`Reporter`] they are handed.
//! Those reports are queued and resolved only after the advancement that
//! raised the event has finished.

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::matches::{Match, MatchId, Outcome, Slot};
use crate::state::TournamentState;

/// Kinds of lifecycle events a handler can subscribe to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Start,
    MatchReady,
    MatchComplete,
    StartRound,
    Complete,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Start,
        EventKind::MatchReady,
        EventKind::MatchComplete,
        EventKind::StartRound,
        EventKind::Complete,
    ];

    /// Conventional callback name (`on_start`, `on_match_ready`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Start => "on_start",
            EventKind::MatchReady => "on_match_ready",
            EventKind::MatchComplete => "on_match_complete",
            EventKind::StartRound => "on_start_round",
            EventKind::Complete => "on_complete",
        }
    }

    /// Inverse of [`EventKind::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lifecycle event with its payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Tournament started, before any match is seeded
    Start,
    /// Both players of a match are known
    MatchReady(MatchId),
    /// A result was recorded and scored
    MatchComplete(MatchId),
    /// All pairings of a Swiss round were created
    StartRound(u32),
    /// Tournament reached its terminal state
    Complete,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Start => EventKind::Start,
            Event::MatchReady(_) => EventKind::MatchReady,
            Event::MatchComplete(_) => EventKind::MatchComplete,
            Event::StartRound(_) => EventKind::StartRound,
            Event::Complete => EventKind::Complete,
        }
    }

    /// The match this event is about, if any
    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            Event::MatchReady(id) | Event::MatchComplete(id) => Some(*id),
            Event::Start | Event::StartRound(_) | Event::Complete => None,
        }
    }
}

/// Results reported from inside event handlers, in report order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reporter {
    queued: VecDeque<(MatchId, Outcome)>,
}

impl Reporter {
    /// Queue a result for match `id`
    pub fn report_result(&mut self, id: MatchId, outcome: Outcome) {
        self.queued.push_back((id, outcome));
    }

    /// Queue a win for the participant in `slot` of `m`. Unfilled slots are ignored.
    pub fn report_slot(&mut self, m: &Match, slot: Slot) {
        if let Some(winner) = slot.participant() {
            self.report_result(m.id(), Outcome::Winner(winner));
        }
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub(crate) fn pop(&mut self) -> Option<(MatchId, Outcome)> {
        self.queued.pop_front()
    }
}

/// Boxed event handler. Handlers see the tournament read-only and report
/// results through the queue.
pub type Handler = Box<dyn FnMut(&TournamentState, &Event, &mut Reporter) + Send>;

/// Ordered handler registry, scoped to one tournament
#[derive(Default)]
pub struct EventBus {
    handlers: FxHashMap<EventKind, Vec<Handler>>,
    deferred: Reporter,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `kind`
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&TournamentState, &Event, &mut Reporter) + Send + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Run every handler registered for the event's kind, in order
    pub fn emit(&mut self, state: &TournamentState, event: &Event) {
        let Self { handlers, deferred } = self;
        if let Some(handlers) = handlers.get_mut(&event.kind()) {
            for handler in handlers.iter_mut() {
                handler(state, event, deferred);
            }
        }
    }

    /// Oldest result queued by a handler
    pub(crate) fn next_deferred(&mut self) -> Option<(MatchId, Outcome)> {
        self.deferred.pop()
    }

    /// Results queued by handlers and not yet resolved
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.name(), &self.handler_count(kind));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Participant;
    use std::sync::{Arc, Mutex};

    fn state() -> TournamentState {
        TournamentState::new(vec![Participant::new(1, "A"), Participant::new(2, "B")])
            .expect("valid roster")
    }

    #[test]
    fn test_handlers_fire_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            bus.subscribe(EventKind::Start, move |_, _, _| log.lock().unwrap().push(tag));
        }

        bus.emit(&state(), &Event::Start);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_only_matching_kind_fires() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let ready_log = Arc::clone(&log);
        bus.subscribe(EventKind::MatchReady, move |_, event, _| {
            ready_log.lock().unwrap().push(*event)
        });
        let complete_log = Arc::clone(&log);
        bus.subscribe(EventKind::Complete, move |_, event, _| {
            complete_log.lock().unwrap().push(*event)
        });

        let state = state();
        bus.emit(&state, &Event::MatchReady(MatchId(2)));
        bus.emit(&state, &Event::Start);

        assert_eq!(*log.lock().unwrap(), vec![Event::MatchReady(MatchId(2))]);
    }

    #[test]
    fn test_emit_without_handlers_is_noop() {
        let mut bus = EventBus::new();
        bus.emit(&state(), &Event::Complete);
        assert_eq!(bus.handler_count(EventKind::Complete), 0);
    }

    #[test]
    fn test_handler_reports_are_queued() {
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::MatchReady, |_, event, reporter| {
            if let Some(id) = event.match_id() {
                reporter.report_result(id, Outcome::Tie);
            }
        });

        let state = state();
        bus.emit(&state, &Event::MatchReady(MatchId(0)));
        bus.emit(&state, &Event::MatchReady(MatchId(1)));
        bus.emit(&state, &Event::Start);

        assert_eq!(bus.deferred_count(), 2);
        assert_eq!(bus.next_deferred(), Some((MatchId(0), Outcome::Tie)));
        assert_eq!(bus.next_deferred(), Some((MatchId(1), Outcome::Tie)));
        assert_eq!(bus.next_deferred(), None);
    }

    #[test]
    fn test_report_slot_skips_unfilled() {
        use crate::participant::ParticipantId;

        let m = Match::new(MatchId(3), 1, Slot::Filled(ParticipantId(1)), Slot::Bye);
        let mut reporter = Reporter::default();
        reporter.report_slot(&m, m.away());
        assert!(reporter.is_empty());

        reporter.report_slot(&m, m.home());
        assert_eq!(reporter.pop(), Some((MatchId(3), Outcome::Winner(ParticipantId(1)))));
    }

    #[test]
    fn test_event_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("on_full"), None);
    }

    #[test]
    fn test_event_kind_and_match() {
        assert_eq!(Event::MatchComplete(MatchId(1)).kind(), EventKind::MatchComplete);
        assert_eq!(Event::MatchComplete(MatchId(1)).match_id(), Some(MatchId(1)));
        assert_eq!(Event::StartRound(2).match_id(), None);
    }
}
