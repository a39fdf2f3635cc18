use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of cells on the standard board: one centre hex and its six neighbours.
pub const DEFAULT_BOARD_SIZE: usize = 7;
/// Largest board the terminal layout can place
pub const MAX_BOARD_SIZE: usize = 64;
pub const DEFAULT_INITIAL_TIME: i64 = 18;

pub const MATCH_POINTS: u64 = 10;
pub const MATCH_BONUS_SECS: i64 = 2;
pub const MISMATCH_PENALTY_SECS: i64 = 2;
pub const TIME_POWER_UP_SECS: i64 = 10;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HexColor {
    Orange,
    Green,
    Blue,
    Purple,
}

impl HexColor {
    pub const ALL: [HexColor; 4] = [
        HexColor::Orange,
        HexColor::Green,
        HexColor::Blue,
        HexColor::Purple,
    ];

    /// Position of the color inside a theme's four-color table
    pub fn theme_slot(self) -> usize {
        match self {
            HexColor::Orange => 0,
            HexColor::Green => 1,
            HexColor::Blue => 2,
            HexColor::Purple => 3,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PowerUpKind {
    Time,
    Skip,
    Thaw,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [PowerUpKind::Time, PowerUpKind::Skip, PowerUpKind::Thaw];
}

/// Remaining uses per power-up kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUps {
    pub time: u32,
    pub skip: u32,
    pub thaw: u32,
}

impl Default for PowerUps {
    fn default() -> Self {
        Self {
            time: 5,
            skip: 5,
            thaw: 0,
        }
    }
}

impl PowerUps {
    pub fn count(&self, kind: PowerUpKind) -> u32 {
        match kind {
            PowerUpKind::Time => self.time,
            PowerUpKind::Skip => self.skip,
            PowerUpKind::Thaw => self.thaw,
        }
    }

    /// Takes one use of `kind`. Returns false (and changes nothing) when depleted.
    pub fn consume(&mut self, kind: PowerUpKind) -> bool {
        let slot = match kind {
            PowerUpKind::Time => &mut self.time,
            PowerUpKind::Skip => &mut self.skip,
            PowerUpKind::Thaw => &mut self.thaw,
        };
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub board_size: usize,
    pub initial_time: i64,
    pub palette: Vec<HexColor>,
    pub initial_power_ups: PowerUps,
    /// Report elapsed seconds with the outcome so the recorder can track a best time
    pub track_best_time: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            initial_time: DEFAULT_INITIAL_TIME,
            palette: HexColor::ALL.to_vec(),
            initial_power_ups: PowerUps::default(),
            track_best_time: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_size == 0 {
            return Err(ConfigError::EmptyBoard);
        }
        if self.board_size > MAX_BOARD_SIZE {
            return Err(ConfigError::BoardTooLarge(self.board_size));
        }
        if self.initial_time < 1 {
            return Err(ConfigError::NonPositiveTime(self.initial_time));
        }
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Correct,
    Incorrect,
}

/// Result of a finished session, handed to the stats recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub score: u64,
    pub won: bool,
    pub elapsed_secs: Option<u64>,
}

/// Authoritative state of one play session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Signed on purpose: consecutive mismatches may push it below zero before the end check
    pub time_remaining: i64,
    pub score: u64,
    pub target: usize,
    pub board: Vec<HexColor>,
    pub power_ups: PowerUps,
    pub status: Status,
    /// Whole seconds the clock has run in this session
    pub elapsed_secs: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            time_remaining: 0,
            score: 0,
            target: 0,
            board: Vec::new(),
            power_ups: PowerUps::default(),
            status: Status::Idle,
            elapsed_secs: 0,
        }
    }
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn has_ended(&self) -> bool {
        self.status == Status::Ended
    }

    pub fn board_size(&self) -> usize {
        self.board.len()
    }

    /// One flag per cell; only the target's is set
    pub fn pattern_indicator(&self) -> Vec<bool> {
        (0..self.board.len()).map(|i| i == self.target).collect()
    }
}
