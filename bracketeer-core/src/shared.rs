//! Thread-safe tournament handle
//!
//! One mutex per tournament serializes every result report, so bracket
//! tables, opponent history and each match's `Ready -> Completed`
//! transition are only touched by one reporter at a time.
//!
//! A handler that panics poisons the lock. The handle keeps serving the
//! tournament afterwards: results already recorded stay recorded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::TournamentError;
use crate::matches::{MatchId, Outcome};
use crate::tournament::{Side, Tournament};

/// Cloneable handle to a tournament shared between threads
#[derive(Clone, Debug)]
pub struct SharedTournament {
    inner: Arc<Mutex<Tournament>>,
}

impl SharedTournament {
    pub fn new(tournament: Tournament) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tournament)),
        }
    }

    pub fn start(&self) -> Result<(), TournamentError> {
        self.lock().start()
    }

    /// Report a result; at most one report per match succeeds
    pub fn report_result(&self, id: MatchId, outcome: Outcome) -> Result<(), TournamentError> {
        self.lock().report_result(id, outcome)
    }

    pub fn report_winner(&self, id: MatchId, side: Side) -> Result<(), TournamentError> {
        self.lock().report_winner(id, side)
    }

    /// Run `f` with shared access
    pub fn read<R>(&self, f: impl FnOnce(&Tournament) -> R) -> R {
        f(&self.lock())
    }

    /// Run `f` with exclusive access (e.g. to register callbacks)
    pub fn update<R>(&self, f: impl FnOnce(&mut Tournament) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Tournament> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Tournament> for SharedTournament {
    fn from(tournament: Tournament) -> Self {
        Self::new(tournament)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Participant;
    use std::thread;

    fn roster(n: u32) -> Vec<Participant> {
        (1..=n).map(|i| Participant::new(i, format!("P{}", i))).collect()
    }

    #[test]
    fn test_concurrent_reports_only_one_wins() {
        let shared = SharedTournament::new(Tournament::swiss(roster(2), 1).unwrap());
        shared.start().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let side = if i % 2 == 0 { Side::Home } else { Side::Away };
                    shared.report_winner(MatchId(0), side)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == TournamentError::AlreadyReported { id: MatchId(0) }));

        let total: u32 = shared.read(|t| t.rank().iter().map(|p| p.score()).sum());
        assert_eq!(total, 3);
        assert!(shared.read(|t| t.is_complete()));
    }

    #[test]
    fn test_panicking_handler_does_not_poison_handle() {
        let shared = SharedTournament::new(Tournament::swiss(roster(4), 1).unwrap());
        shared.update(|t| {
            t.on_match_complete(|_, m| {
                if m.id() == MatchId(0) {
                    panic!("handler failure");
                }
            })
        });
        shared.start().unwrap();

        let reporter = shared.clone();
        let outcome = thread::spawn(move || reporter.report_winner(MatchId(0), Side::Home)).join();
        assert!(outcome.is_err());

        // The result was recorded before the handler ran
        assert_eq!(
            shared.read(|t| t.get_match(MatchId(0)).map(|m| m.is_complete())),
            Some(true)
        );
        assert_eq!(
            shared.report_winner(MatchId(0), Side::Away),
            Err(TournamentError::AlreadyReported { id: MatchId(0) })
        );
        shared.report_winner(MatchId(1), Side::Home).unwrap();
    }

    #[test]
    fn test_concurrent_round_completion() {
        let shared = SharedTournament::new(Tournament::swiss(roster(8), 2).unwrap());
        shared.start().unwrap();

        let first_round: Vec<MatchId> =
            shared.read(|t| t.active_matches().iter().map(|m| m.id()).collect());
        assert_eq!(first_round.len(), 4);

        let handles: Vec<_> = first_round
            .into_iter()
            .map(|id| {
                let shared = shared.clone();
                thread::spawn(move || shared.report_winner(id, Side::Home))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        shared.read(|t| {
            assert_eq!(t.current_round(), 2);
            assert_eq!(t.matches().len(), 8);
            assert_eq!(t.active_matches().len(), 4);
        });
    }
}
