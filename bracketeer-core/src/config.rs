//! Configuration types for tournaments
//!
//! Level 4 - Utilities and configuration

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::elimination::SingleElimination;
use crate::swiss::Swiss;
use crate::tournament::Format;

/// Tournament format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Re-pair by standing every round, fixed number of rounds
    Swiss { rounds: u32 },
    /// Knockout bracket built up front, padded with byes
    SingleElimination,
}

impl Default for TournamentFormat {
    fn default() -> Self {
        TournamentFormat::SingleElimination
    }
}

impl TournamentFormat {
    /// Instantiate the engine for this format
    pub fn build(&self) -> Box<dyn Format> {
        match *self {
            TournamentFormat::Swiss { rounds } => Box::new(Swiss::new(rounds)),
            TournamentFormat::SingleElimination => Box::new(SingleElimination::new()),
        }
    }
}

/// Points awarded per match result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub win: u32,
    pub tie: u32,
    pub loss: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            win: 3,
            tie: 1,
            loss: 0,
        }
    }
}

/// Tournament configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Tournament format
    pub format: TournamentFormat,
    /// Points per result
    #[serde(default)]
    pub scoring: ScoringPolicy,
}

impl TournamentConfig {
    /// Create Swiss tournament config
    pub fn swiss(rounds: u32) -> Self {
        Self {
            format: TournamentFormat::Swiss { rounds },
            ..Default::default()
        }
    }

    /// Create single-elimination tournament config
    pub fn single_elimination() -> Self {
        Self {
            format: TournamentFormat::SingleElimination,
            ..Default::default()
        }
    }

    /// Set custom scoring
    pub fn with_scoring(mut self, scoring: ScoringPolicy) -> Self {
        self.scoring = scoring;
        self
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
