//! Simulate command - run a tournament with random results
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), simulate(), print_report()
//! - Level 3: create_participants(), attach_event_logging(), play_random_results()
//! - Level 4: rng and formatting utilities

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use bracketeer_core::{
    MatchId, Participant, Side, Standing, Tournament, TournamentConfig, TournamentFormat,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Swiss,
    Single,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Tournament format (overrides the config file)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Number of participants
    #[arg(long, default_value = "8")]
    pub players: u32,

    /// Swiss rounds (defaults to players / 2)
    #[arg(long)]
    pub rounds: Option<u32>,

    /// Tournament config JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output standings as JSON
    #[arg(long)]
    pub json: bool,
}

/// Outcome of one simulated tournament
#[derive(Clone, Debug, Serialize)]
struct SimulationReport {
    format: &'static str,
    players: usize,
    rounds: u32,
    matches: usize,
    /// Results reported by the driver (byes excluded)
    reported: usize,
    champion: Option<String>,
    standings: Vec<Standing>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run simulate command
///
/// 1. Resolve the configuration
/// 2. Play the tournament out with random winners
/// 3. Report standings
pub fn run(args: SimulateArgs, seed: Option<u64>) -> Result<()> {
    let config = build_config(&args)?;
    let mut rng = create_rng(seed);

    tracing::info!(
        "Simulating {:?} with {} players (seed={:?})",
        config.format,
        args.players,
        seed
    );

    let report = simulate(&config, args.players, &mut rng)?;

    print_report(&report, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Config file (or defaults) with command-line overrides applied
fn build_config(args: &SimulateArgs) -> Result<TournamentConfig> {
    let mut config = match &args.config {
        Some(path) => TournamentConfig::load(path)?,
        None => TournamentConfig::default(),
    };

    match args.format {
        Some(FormatArg::Swiss) => {
            config.format = TournamentFormat::Swiss {
                rounds: default_rounds(args.players),
            }
        }
        Some(FormatArg::Single) => config.format = TournamentFormat::SingleElimination,
        None => {}
    }

    if let (Some(requested), TournamentFormat::Swiss { rounds }) =
        (args.rounds, &mut config.format)
    {
        *rounds = requested;
    }

    Ok(config)
}

/// Build, start and finish one tournament
fn simulate(
    config: &TournamentConfig,
    players: u32,
    rng: &mut ChaCha8Rng,
) -> Result<SimulationReport> {
    let participants = create_participants(players, rng);
    let mut tournament = match Tournament::new(participants, config) {
        Ok(tournament) => tournament,
        Err(e) if e.is_configuration() => {
            bail!("Invalid tournament setup: {} (check --players, --rounds and --config)", e)
        }
        Err(e) => return Err(e).context("Failed to build tournament"),
    };

    attach_event_logging(&mut tournament);
    tournament.start().context("Failed to start tournament")?;

    let reported = play_random_results(&mut tournament, rng)?;

    Ok(SimulationReport {
        format: tournament.format_name(),
        players: tournament.state().num_players(),
        rounds: tournament.current_round(),
        matches: tournament.matches().len(),
        reported,
        champion: tournament.champion().map(|p| p.name.clone()),
        standings: tournament.standings(),
    })
}

fn print_report(report: &SimulationReport, json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print_text_report(report);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Players 1..=n in shuffled seeding order
fn create_participants(players: u32, rng: &mut ChaCha8Rng) -> Vec<Participant> {
    let mut participants: Vec<Participant> = (1..=players)
        .map(|i| Participant::new(i, format!("Player {}", i)))
        .collect();
    participants.shuffle(rng);
    participants
}

fn attach_event_logging(tournament: &mut Tournament) {
    tournament.on_start(|state| {
        tracing::info!("Tournament started with {} players", state.num_players());
    });

    tournament.on_start_round(|state, round| {
        tracing::info!(
            "Round {} paired, {} matches waiting",
            round,
            state.active_matches().count()
        );
    });

    tournament.on_match_ready(|_, m| {
        tracing::debug!(
            "{} ready (round {}): {} vs {}",
            m.id(),
            m.round(),
            m.home(),
            m.away()
        );
    });

    tournament.on_match_complete(|state, m| {
        match m.winner().and_then(|id| state.participant(id)) {
            Some(winner) => tracing::info!("{} won by {}", m.id(), winner),
            None => tracing::info!("{} tied", m.id()),
        }
    });

    tournament.on_complete(|state| {
        if let Some(leader) = state.rank().first() {
            tracing::info!("Tournament complete, leader: {}", leader);
        }
    });
}

/// Report a random winner on a random active match until the tournament
/// completes. Returns the number of results reported.
fn play_random_results(tournament: &mut Tournament, rng: &mut ChaCha8Rng) -> Result<usize> {
    let mut reported = 0;

    while !tournament.is_complete() {
        let active: Vec<MatchId> = tournament.active_matches().iter().map(|m| m.id()).collect();
        let Some(&id) = active.choose(rng) else {
            bail!("Tournament stalled: no active matches before completion");
        };

        let side = if rng.gen_bool(0.5) { Side::Home } else { Side::Away };
        tournament
            .report_winner(id, side)
            .with_context(|| format!("Failed to report result for {}", id))?;
        reported += 1;
    }

    Ok(reported)
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Swiss rounds when none are given
fn default_rounds(players: u32) -> u32 {
    (players / 2).max(1)
}

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn print_text_report(report: &SimulationReport) {
    println!("\n=== {} Results ===", report.format);
    println!("Players:   {}", report.players);
    println!("Rounds:    {}", report.rounds);
    println!("Matches:   {} ({} reported)", report.matches, report.reported);
    if let Some(champion) = &report.champion {
        println!("Champion:  {}", champion);
    }

    println!("\n{:>5}  {:<16} {:>5} {:>3} {:>3} {:>3}", "Place", "Player", "Score", "W", "L", "T");
    for s in &report.standings {
        println!(
            "{:>5}  {:<16} {:>5} {:>3} {:>3} {:>3}",
            s.place, s.name, s.score, s.wins, s.losses, s.ties
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
