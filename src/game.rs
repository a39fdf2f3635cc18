use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::session::{
    PowerUpKind, SessionConfig, SessionOutcome, SessionState, Signal, Status, MATCH_BONUS_SECS,
    MATCH_POINTS, MISMATCH_PENALTY_SECS, TIME_POWER_UP_SECS,
};

/// Real time between two clock ticks
pub const CLOCK_INTERVAL: Duration = Duration::from_secs(1);
/// How long a correct match stays visible before the board is regenerated
pub const REGEN_DELAY: Duration = Duration::from_millis(200);

/// Everything the presentation layer can ask the engine to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Select(usize),
    UsePowerUp(PowerUpKind),
    /// One clock tick, for callers that own their own 1 Hz source
    Tick,
    /// Real time passed; drives the session clock and the delayed regeneration
    Advance(Duration),
}

/// State transitions observed by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Started,
    PatternGenerated,
    Signal(Signal),
    PowerUpUsed(PowerUpKind),
    /// Frozen cells should be cleared. The engine never freezes a cell itself.
    Thawed,
    Ended(SessionOutcome),
}

/// Converts frame time into whole-second ticks. Stopped clocks keep no carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionClock {
    running: bool,
    carried: Duration,
}

impl SessionClock {
    pub fn start(&mut self) {
        self.running = true;
        self.carried = Duration::ZERO;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.carried = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Adds `dt` and returns the number of whole intervals that completed
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if !self.running {
            return 0;
        }
        self.carried += dt;
        let mut ticks = 0;
        while self.carried >= CLOCK_INTERVAL {
            self.carried -= CLOCK_INTERVAL;
            ticks += 1;
        }
        ticks
    }
}

/// Regeneration scheduled after a correct match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRegen {
    remaining: Duration,
}

/// The session engine: owns one session, its clock and its scheduled continuation
#[derive(Debug)]
pub struct Game {
    config: SessionConfig,
    state: SessionState,
    clock: SessionClock,
    pending_regen: Option<PendingRegen>,
    events: Vec<GameEvent>,
    rng: StdRng,
}

impl Game {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        Self::from_rng(config, StdRng::from_entropy())
    }

    /// Deterministic board generation, used by tests and `--seed`
    pub fn with_seed(config: SessionConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::from_rng(config, StdRng::seed_from_u64(seed))
    }

    fn from_rng(config: SessionConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = SessionState {
            time_remaining: config.initial_time,
            power_ups: config.initial_power_ups,
            ..SessionState::default()
        };
        Ok(Self {
            config,
            state,
            clock: SessionClock::default(),
            pending_regen: None,
            events: Vec::new(),
            rng,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Owned copy of the current state for renderers that outlive the borrow
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn has_pending_regen(&self) -> bool {
        self.pending_regen.is_some()
    }

    /// Single mutation entry point: runs `cmd` and returns the events it produced
    pub fn update(&mut self, cmd: Command) -> Vec<GameEvent> {
        match cmd {
            Command::Start => {
                self.start();
            }
            Command::Select(index) => {
                self.select(index);
            }
            Command::UsePowerUp(kind) => {
                self.use_power_up(kind);
            }
            Command::Tick => {
                self.tick();
            }
            Command::Advance(dt) => self.advance(dt),
        }
        self.drain_events()
    }

    /// Events produced by direct method calls since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resets to a fresh running session. Any previous clock or pending
    /// regeneration is discarded first.
    pub fn start(&mut self) -> &SessionState {
        self.clock.stop();
        self.pending_regen = None;

        self.state = SessionState {
            time_remaining: self.config.initial_time,
            score: 0,
            power_ups: self.config.initial_power_ups,
            status: Status::Running,
            ..SessionState::default()
        };
        self.events.push(GameEvent::Started);
        self.generate_pattern();
        self.clock.start();

        info!(
            board_size = self.config.board_size,
            initial_time = self.config.initial_time,
            "session started"
        );
        &self.state
    }

    pub fn generate_pattern(&mut self) {
        let size = self.config.board_size;
        let palette = &self.config.palette;
        let rng = &mut self.rng;

        self.state.target = rng.gen_range(0..size);
        self.state.board = (0..size)
            .map(|_| palette[rng.gen_range(0..palette.len())])
            .collect();

        self.events.push(GameEvent::PatternGenerated);
        debug!(target_cell = self.state.target, "pattern generated");
    }

    /// Handles a cell selection. Returns `None` when the input is ignored.
    pub fn select(&mut self, index: usize) -> Option<Signal> {
        if !self.state.is_running() || index >= self.config.board_size {
            return None;
        }

        if index == self.state.target {
            self.state.score += MATCH_POINTS;
            self.state.time_remaining += MATCH_BONUS_SECS;
            self.pending_regen = Some(PendingRegen {
                remaining: REGEN_DELAY,
            });
            self.events.push(GameEvent::Signal(Signal::Correct));
            debug!(cell = index, score = self.state.score, "correct selection");
            Some(Signal::Correct)
        } else {
            self.state.time_remaining -= MISMATCH_PENALTY_SECS;
            self.events.push(GameEvent::Signal(Signal::Incorrect));
            debug!(
                cell = index,
                time_remaining = self.state.time_remaining,
                "incorrect selection"
            );
            if self.state.time_remaining <= 0 {
                self.end();
            }
            Some(Signal::Incorrect)
        }
    }

    /// One clock tick. Returns the outcome if this tick ended the session.
    pub fn tick(&mut self) -> Option<SessionOutcome> {
        if !self.state.is_running() {
            return None;
        }
        self.state.time_remaining -= 1;
        self.state.elapsed_secs += 1;
        if self.state.time_remaining <= 0 {
            return self.end();
        }
        None
    }

    /// Consumes one use of `kind`. Returns false when nothing happened.
    pub fn use_power_up(&mut self, kind: PowerUpKind) -> bool {
        if !self.state.is_running() || !self.state.power_ups.consume(kind) {
            return false;
        }
        self.events.push(GameEvent::PowerUpUsed(kind));

        match kind {
            PowerUpKind::Time => {
                self.state.time_remaining += TIME_POWER_UP_SECS;
            }
            PowerUpKind::Skip => {
                self.pending_regen = None;
                self.generate_pattern();
            }
            PowerUpKind::Thaw => {
                self.events.push(GameEvent::Thawed);
            }
        }
        debug!(%kind, remaining = self.state.power_ups.count(kind), "power-up used");
        true
    }

    /// Finishes the session. Only the first call on a running session
    /// produces an outcome.
    pub fn end(&mut self) -> Option<SessionOutcome> {
        if !self.state.is_running() {
            return None;
        }
        self.state.status = Status::Ended;
        self.clock.stop();
        self.pending_regen = None;

        let outcome = SessionOutcome {
            score: self.state.score,
            won: self.state.score > 0,
            elapsed_secs: self
                .config
                .track_best_time
                .then_some(self.state.elapsed_secs),
        };
        self.events.push(GameEvent::Ended(outcome));
        info!(
            score = outcome.score,
            won = outcome.won,
            elapsed_secs = self.state.elapsed_secs,
            "session ended"
        );
        Some(outcome)
    }

    /// Feeds real elapsed time to the pending regeneration and the clock
    pub fn advance(&mut self, dt: Duration) {
        if let Some(pending) = self.pending_regen.as_mut() {
            if pending.remaining <= dt {
                self.pending_regen = None;
                if self.state.is_running() {
                    self.generate_pattern();
                }
            } else {
                pending.remaining -= dt;
            }
        }

        for _ in 0..self.clock.advance(dt) {
            if self.tick().is_some() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PowerUps;
    use assert_matches::assert_matches;

    fn game_with(config: SessionConfig) -> Game {
        let mut game = Game::with_seed(config, 42).unwrap();
        game.start();
        game.drain_events();
        game
    }

    fn game() -> Game {
        game_with(SessionConfig::default())
    }

    fn wrong_cell(game: &Game) -> usize {
        (game.state().target + 1) % game.config().board_size
    }

    #[test]
    fn new_game_is_idle_until_started() {
        let mut game = Game::with_seed(SessionConfig::default(), 1).unwrap();
        assert_eq!(game.state().status, Status::Idle);
        assert_eq!(game.select(0), None);
        assert_eq!(game.tick(), None);
        assert!(!game.use_power_up(PowerUpKind::Time));
        assert_eq!(game.end(), None);
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn start_generates_first_pattern() {
        let mut game = Game::with_seed(SessionConfig::default(), 7).unwrap();
        let events = game.update(Command::Start);

        assert_eq!(events, vec![GameEvent::Started, GameEvent::PatternGenerated]);
        let state = game.state();
        assert_eq!(state.status, Status::Running);
        assert_eq!(state.score, 0);
        assert_eq!(state.time_remaining, 18);
        assert!(state.target < 7);
        assert_eq!(state.board.len(), 7);
        assert!(game.clock().is_running());
    }

    #[test]
    fn new_rejects_invalid_config() {
        let cfg = SessionConfig {
            board_size: 0,
            ..SessionConfig::default()
        };
        assert_matches!(Game::new(cfg), Err(ConfigError::EmptyBoard));

        let cfg = SessionConfig {
            initial_time: 0,
            ..SessionConfig::default()
        };
        assert_matches!(
            Game::with_seed(cfg, 1),
            Err(ConfigError::NonPositiveTime(0))
        );
    }

    #[test]
    fn board_uses_only_palette_colors() {
        let palette = vec![crate::session::HexColor::Green];
        let mut game = game_with(SessionConfig {
            palette: palette.clone(),
            board_size: 12,
            ..SessionConfig::default()
        });
        for _ in 0..20 {
            game.generate_pattern();
            assert_eq!(game.state().board.len(), 12);
            assert!(game.state().board.iter().all(|c| palette.contains(c)));
            assert!(game.state().target < 12);
        }
    }

    #[test]
    fn correct_selection_scores_and_schedules_regen() {
        let mut game = game();
        let target = game.state().target;

        let events = game.update(Command::Select(target));

        assert_eq!(events, vec![GameEvent::Signal(Signal::Correct)]);
        assert_eq!(game.state().score, 10);
        assert_eq!(game.state().time_remaining, 20);
        assert!(game.has_pending_regen());

        // not yet
        let events = game.update(Command::Advance(Duration::from_millis(150)));
        assert!(events.is_empty());

        let events = game.update(Command::Advance(Duration::from_millis(50)));
        assert_eq!(events, vec![GameEvent::PatternGenerated]);
        assert!(!game.has_pending_regen());
    }

    #[test]
    fn second_match_replaces_pending_regen() {
        let mut game = game();
        let target = game.state().target;
        game.select(target);
        game.update(Command::Advance(Duration::from_millis(150)));
        game.select(target);
        game.drain_events();

        let events = game.update(Command::Advance(Duration::from_millis(150)));
        assert!(events.is_empty());
        let events = game.update(Command::Advance(Duration::from_millis(50)));
        assert_eq!(events, vec![GameEvent::PatternGenerated]);
        assert_eq!(game.state().score, 20);
    }

    #[test]
    fn incorrect_selection_costs_time() {
        let mut game = game();
        let before = game.state().clone();

        let signal = game.select(wrong_cell(&game));

        assert_eq!(signal, Some(Signal::Incorrect));
        assert_eq!(game.state().time_remaining, 16);
        assert_eq!(game.state().score, 0);
        assert_eq!(game.state().board, before.board);
        assert_eq!(game.state().target, before.target);
        assert!(!game.has_pending_regen());
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut game = game();
        let before = game.snapshot();
        assert_eq!(game.select(7), None);
        assert_eq!(game.select(usize::MAX), None);
        assert_eq!(game.snapshot(), before);
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn mismatch_to_zero_ends_session() {
        let mut game = game_with(SessionConfig {
            initial_time: 3,
            ..SessionConfig::default()
        });
        game.select(wrong_cell(&game));
        assert!(game.state().is_running());
        assert_eq!(game.state().time_remaining, 1);

        let events = game.update(Command::Select(wrong_cell(&game)));
        assert_eq!(game.state().time_remaining, -1);
        assert_eq!(game.state().status, Status::Ended);
        assert_matches!(
            events.as_slice(),
            [
                GameEvent::Signal(Signal::Incorrect),
                GameEvent::Ended(SessionOutcome {
                    score: 0,
                    won: false,
                    elapsed_secs: None
                })
            ]
        );
        assert!(!game.clock().is_running());
    }

    #[test]
    fn tick_decrements_and_ends_at_zero() {
        let mut game = game_with(SessionConfig {
            initial_time: 1,
            ..SessionConfig::default()
        });

        let outcome = game.tick();

        assert_eq!(game.state().status, Status::Ended);
        assert!(game.state().time_remaining <= 0);
        assert_eq!(
            outcome,
            Some(SessionOutcome {
                score: 0,
                won: false,
                elapsed_secs: None
            })
        );
    }

    #[test]
    fn ticks_are_suppressed_after_end() {
        let mut game = game_with(SessionConfig {
            initial_time: 1,
            ..SessionConfig::default()
        });
        game.tick();
        game.drain_events();

        assert_eq!(game.tick(), None);
        assert_eq!(game.state().time_remaining, 0);
        assert!(game.update(Command::Tick).is_empty());
        assert!(game
            .update(Command::Advance(Duration::from_secs(5)))
            .is_empty());
        assert_eq!(game.state().time_remaining, 0);
    }

    #[test]
    fn end_is_idempotent() {
        let mut game = game();
        let target = game.state().target;
        game.select(target);

        let first = game.end();
        let second = game.end();

        assert_eq!(
            first,
            Some(SessionOutcome {
                score: 10,
                won: true,
                elapsed_secs: None
            })
        );
        assert_eq!(second, None);
        let ended = game
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Ended(_)))
            .count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn end_cancels_pending_regen() {
        let mut game = game();
        let target = game.state().target;
        game.select(target);
        game.end();
        let board = game.state().board.clone();
        game.drain_events();

        let events = game.update(Command::Advance(Duration::from_secs(1)));

        assert!(events.is_empty());
        assert_eq!(game.state().board, board);
    }

    #[test]
    fn restart_cancels_pending_regen_and_resets_clock() {
        let mut game = game();
        let target = game.state().target;
        game.select(target);
        game.update(Command::Advance(Duration::from_millis(900)));
        game.update(Command::Start);

        assert!(!game.has_pending_regen());
        assert_eq!(game.state().score, 0);
        assert_eq!(game.state().time_remaining, 18);

        // the 900ms carried before the restart must not count
        game.update(Command::Advance(Duration::from_millis(500)));
        assert_eq!(game.state().time_remaining, 18);
        game.update(Command::Advance(Duration::from_millis(500)));
        assert_eq!(game.state().time_remaining, 17);
    }

    #[test]
    fn advance_emits_one_tick_per_second() {
        let mut game = game();
        for _ in 0..25 {
            game.update(Command::Advance(Duration::from_millis(100)));
        }
        assert_eq!(game.state().time_remaining, 16);
        assert_eq!(game.state().elapsed_secs, 2);
    }

    #[test]
    fn advance_stops_ticking_once_ended() {
        let mut game = game_with(SessionConfig {
            initial_time: 2,
            ..SessionConfig::default()
        });
        let events = game.update(Command::Advance(Duration::from_secs(10)));

        assert_eq!(game.state().time_remaining, 0);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::Ended(_)))
                .count(),
            1
        );
    }

    #[test]
    fn time_power_up_adds_ten_seconds() {
        let mut game = game();
        assert!(game.use_power_up(PowerUpKind::Time));
        assert_eq!(game.state().time_remaining, 28);
        assert_eq!(game.state().power_ups.time, 4);
    }

    #[test]
    fn skip_regenerates_immediately() {
        let mut game = game();
        let target = game.state().target;
        game.select(target);
        game.drain_events();

        let events = game.update(Command::UsePowerUp(PowerUpKind::Skip));

        assert_eq!(
            events,
            vec![
                GameEvent::PowerUpUsed(PowerUpKind::Skip),
                GameEvent::PatternGenerated
            ]
        );
        assert_eq!(game.state().power_ups.skip, 4);
        assert!(!game.has_pending_regen());
        assert_eq!(game.state().time_remaining, 20);
    }

    #[test]
    fn depleted_skip_changes_nothing() {
        let mut game = game_with(SessionConfig {
            initial_power_ups: PowerUps {
                time: 5,
                skip: 0,
                thaw: 0,
            },
            ..SessionConfig::default()
        });
        let before = game.snapshot();

        assert!(!game.use_power_up(PowerUpKind::Skip));

        assert_eq!(game.snapshot(), before);
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn thaw_only_records_consumption() {
        let mut game = game_with(SessionConfig {
            initial_power_ups: PowerUps {
                time: 0,
                skip: 0,
                thaw: 1,
            },
            ..SessionConfig::default()
        });
        let before = game.snapshot();

        let events = game.update(Command::UsePowerUp(PowerUpKind::Thaw));

        assert_eq!(
            events,
            vec![GameEvent::PowerUpUsed(PowerUpKind::Thaw), GameEvent::Thawed]
        );
        assert_eq!(game.state().power_ups.thaw, 0);
        assert_eq!(game.state().board, before.board);
        assert_eq!(game.state().time_remaining, before.time_remaining);
    }

    #[test]
    fn power_ups_are_ignored_after_end() {
        let mut game = game();
        game.end();
        assert!(!game.use_power_up(PowerUpKind::Time));
        assert_eq!(game.state().power_ups.time, 5);
    }

    #[test]
    fn tracked_outcome_reports_elapsed_seconds() {
        let mut game = game_with(SessionConfig {
            initial_time: 3,
            track_best_time: true,
            ..SessionConfig::default()
        });
        let target = game.state().target;
        game.select(target);
        game.tick();
        game.tick();

        let outcome = game.end().unwrap();
        assert_eq!(outcome.elapsed_secs, Some(2));
        assert!(outcome.won);
    }

    #[test]
    fn clock_carries_partial_intervals() {
        let mut clock = SessionClock::default();
        assert_eq!(clock.advance(Duration::from_secs(3)), 0);

        clock.start();
        assert_eq!(clock.advance(Duration::from_millis(700)), 0);
        assert_eq!(clock.advance(Duration::from_millis(700)), 1);
        assert_eq!(clock.advance(Duration::from_millis(2600)), 3);

        clock.stop();
        assert!(!clock.is_running());
        assert_eq!(clock.advance(Duration::from_secs(1)), 0);
    }
}
