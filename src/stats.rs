use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::session::SessionOutcome;
use crate::store::{KvStore, STATS_KEY};
use crate::util::{format_clock, win_rate_percent};

/// Shown instead of a best time when none has been recorded
pub const BEST_TIME_PLACEHOLDER: &str = "--:--";

/// Cumulative statistics across all sessions.
///
/// Serialized as a flat JSON object with camelCase keys. Missing keys read
/// as zero so older records stay loadable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsAggregate {
    pub games_played: u64,
    pub high_score: u64,
    pub total_score: u64,
    pub wins: u64,
    pub best_time: Option<u64>,
    pub current_streak: u64,
}

impl StatsAggregate {
    /// Folds a finished session into the aggregate
    pub fn record(&mut self, outcome: &SessionOutcome) {
        self.games_played += 1;
        self.total_score += outcome.score;
        self.high_score = self.high_score.max(outcome.score);

        if outcome.won {
            self.wins += 1;
            self.current_streak += 1;
            // zero seconds counts as no time at all
            if let Some(secs) = outcome.elapsed_secs.filter(|&s| s > 0) {
                if self.best_time.map_or(true, |best| secs < best) {
                    self.best_time = Some(secs);
                }
            }
        } else {
            self.current_streak = 0;
        }
    }

    pub fn display(&self) -> StatsDisplay {
        derive_display(self)
    }
}

/// Presentation-ready view of a [`StatsAggregate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsDisplay {
    pub games_played: u64,
    pub high_score: u64,
    pub total_score: u64,
    pub win_rate_percent: u64,
    pub best_time_formatted: String,
    pub current_streak: u64,
}

pub fn derive_display(aggregate: &StatsAggregate) -> StatsDisplay {
    StatsDisplay {
        games_played: aggregate.games_played,
        high_score: aggregate.high_score,
        total_score: aggregate.total_score,
        win_rate_percent: win_rate_percent(aggregate.wins, aggregate.games_played),
        best_time_formatted: aggregate
            .best_time
            .filter(|&secs| secs > 0)
            .map(format_clock)
            .unwrap_or_else(|| BEST_TIME_PLACEHOLDER.to_string()),
        current_streak: aggregate.current_streak,
    }
}

/// Owns the aggregate and writes it back after every change
#[derive(Debug)]
pub struct StatsRecorder<S: KvStore> {
    store: S,
    aggregate: StatsAggregate,
}

impl<S: KvStore> StatsRecorder<S> {
    /// Reads the persisted aggregate, falling back to zeroes on any problem
    pub fn load(store: S) -> Self {
        let aggregate = match store.get(STATS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "stats record is unreadable, starting from defaults");
                StatsAggregate::default()
            }),
            Ok(None) => StatsAggregate::default(),
            Err(e) => {
                warn!(error = %e, "failed to load stats, starting from defaults");
                StatsAggregate::default()
            }
        };
        Self { store, aggregate }
    }

    pub fn aggregate(&self) -> &StatsAggregate {
        &self.aggregate
    }

    pub fn display(&self) -> StatsDisplay {
        derive_display(&self.aggregate)
    }

    pub fn record(&mut self, outcome: &SessionOutcome) -> &StatsAggregate {
        self.aggregate.record(outcome);
        debug!(?outcome, games_played = self.aggregate.games_played, "session recorded");
        self.persist();
        &self.aggregate
    }

    /// Clears all statistics
    pub fn reset(&mut self) {
        self.aggregate = StatsAggregate::default();
        self.persist();
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Storage faults are logged and never reach gameplay
    fn persist(&mut self) {
        let result = serde_json::to_string(&self.aggregate)
            .map_err(StoreError::from)
            .and_then(|json| self.store.set(STATS_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist stats");
        }
    }
}
