use crate::config::FeedConfig;
use crate::money::Money;
use crate::rng::RandomSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fabricated win by another "player"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinEvent {
    pub id: Uuid,
    pub username: String,
    pub game: String,
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
    pub is_jackpot: bool,
}

impl WinEvent {
    /// Relative age, e.g. `"42s ago"`, `"3m ago"`, `"1h ago"`
    pub fn time_ago(&self, now: DateTime<Utc>) -> String {
        let seconds = (now - self.timestamp).num_seconds().max(0);
        if seconds < 60 {
            format!("{}s ago", seconds)
        } else if seconds < 3600 {
            format!("{}m ago", seconds / 60)
        } else {
            format!("{}h ago", seconds / 3600)
        }
    }
}

/// Builds win events from the configured catalogs and amount ranges
#[derive(Debug, Clone)]
pub struct WinEventFactory {
    config: FeedConfig,
}

impl WinEventFactory {
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    pub fn fabricate(&self, rng: &mut dyn RandomSource, timestamp: DateTime<Utc>) -> WinEvent {
        let is_jackpot = rng.chance(self.config.jackpot_chance);
        let (min, max) = if is_jackpot {
            (self.config.jackpot_min, self.config.jackpot_max)
        } else {
            (self.config.regular_min, self.config.regular_max)
        };
        let amount = uniform_amount(min, max, rng.next_f64());
        let username = self.config.usernames[rng.index(self.config.usernames.len())].clone();
        let game = self.config.games[rng.index(self.config.games.len())].clone();

        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&rng.next_u64().to_le_bytes());
        bytes[8..].copy_from_slice(&rng.next_u64().to_le_bytes());

        WinEvent {
            id: uuid::Builder::from_random_bytes(bytes).into_uuid(),
            username,
            game,
            amount,
            timestamp,
            is_jackpot,
        }
    }
}

/// Uniform amount in `[min, max)`, floored to the cent
fn uniform_amount(min: Money, max: Money, draw: f64) -> Money {
    let span = max.cents().saturating_sub(min.cents());
    let offset = ((draw * span as f64).floor() as u64).min(span.saturating_sub(1));
    Money::from_cents(min.cents() + offset)
}
