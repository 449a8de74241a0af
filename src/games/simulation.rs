//! Offline RTP simulation
//!
//! Runs the outcome engine in a tight loop without a ledger, tallying tiers
//! and money flow. Used to check the paytable's observed rates against its
//! configured bands.

use crate::errors::SpinDripResult;
use crate::games::engine::OutcomeEngine;
use crate::games::types::{Theme, Tier};
use crate::money::Money;
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};

/// Aggregate outcome of a batch of simulated spins
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimulationReport {
    pub spins: u64,
    pub jackpots: u64,
    pub minors: u64,
    pub losses: u64,
    pub total_bet: Money,
    pub total_paid: Money,
    pub biggest_win: Money,
}

impl SimulationReport {
    fn rate(&self, count: u64) -> f64 {
        if self.spins == 0 {
            0.0
        } else {
            count as f64 / self.spins as f64
        }
    }

    pub fn jackpot_rate(&self) -> f64 {
        self.rate(self.jackpots)
    }

    pub fn minor_rate(&self) -> f64 {
        self.rate(self.minors)
    }

    pub fn loss_rate(&self) -> f64 {
        self.rate(self.losses)
    }

    /// Observed return to player
    pub fn rtp(&self) -> f64 {
        if self.total_bet.is_zero() {
            0.0
        } else {
            self.total_paid.as_decimal() / self.total_bet.as_decimal()
        }
    }
}

/// Evaluate `spins` outcomes at a fixed bet
pub fn simulate(
    engine: &OutcomeEngine,
    theme: &Theme,
    bet: Money,
    spins: u64,
    rng: &mut dyn RandomSource,
) -> SpinDripResult<SimulationReport> {
    let mut report = SimulationReport::default();

    for _ in 0..spins {
        let result = engine.spin(bet, theme, rng)?;
        report.spins += 1;
        report.total_bet = report.total_bet.saturating_add(bet);
        report.total_paid = report.total_paid.saturating_add(result.win_amount);
        report.biggest_win = report.biggest_win.max(result.win_amount);
        match result.tier {
            Tier::Jackpot => report.jackpots += 1,
            Tier::Minor => report.minors += 1,
            Tier::Loss => report.losses += 1,
        }
    }

    Ok(report)
}
