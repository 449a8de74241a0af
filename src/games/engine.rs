//! Outcome engine
//!
//! Pure tier evaluation: given a bet, a theme and a primary draw, produce the
//! reel symbols and the payout. Secondary draws (payout multiplier, free reel
//! symbol, losing-line symbols) come from the injected [`RandomSource`], so a
//! scripted source reproduces any spin exactly. The engine never touches the
//! ledger.

use crate::config::PaytableConfig;
use crate::errors::{ConfigurationError, LedgerError, SpinDripResult};
use crate::games::types::{SpinResult, Theme, Tier, REEL_COUNT};
use crate::money::Money;
use crate::rng::RandomSource;
use tracing::error;

/// Tiered payout evaluator
#[derive(Debug, Clone)]
pub struct OutcomeEngine {
    paytable: PaytableConfig,
}

impl OutcomeEngine {
    pub fn new(paytable: PaytableConfig) -> Self {
        Self { paytable }
    }

    pub fn paytable(&self) -> &PaytableConfig {
        &self.paytable
    }

    /// Map a primary draw in `[0, 1)` to its tier
    pub fn classify(&self, draw: f64) -> Tier {
        if draw < self.paytable.jackpot_threshold {
            Tier::Jackpot
        } else if draw < self.paytable.minor_threshold {
            Tier::Minor
        } else {
            Tier::Loss
        }
    }

    /// Spin with a fresh primary draw from `rng`
    pub fn spin(&self, bet: Money, theme: &Theme, rng: &mut dyn RandomSource) -> SpinDripResult<SpinResult> {
        let draw = rng.next_f64();
        self.evaluate(bet, theme, draw, rng)
    }

    /// Evaluate a spin for a given primary draw
    pub fn evaluate(
        &self,
        bet: Money,
        theme: &Theme,
        draw: f64,
        rng: &mut dyn RandomSource,
    ) -> SpinDripResult<SpinResult> {
        let tier = self.classify(draw);

        let (symbols, multiplier) = match tier {
            Tier::Jackpot => {
                let anchor = theme.jackpot_symbol().to_string();
                let multiplier = Self::multiplier(
                    self.paytable.jackpot_multiplier_base,
                    self.paytable.jackpot_multiplier_span,
                    rng.next_f64(),
                );
                ([anchor.clone(), anchor.clone(), anchor], multiplier)
            }
            Tier::Minor => {
                let anchor = theme.minor_symbol().to_string();
                let free = theme.symbol(rng.index(theme.symbols().len())).to_string();
                let multiplier = Self::multiplier(
                    self.paytable.minor_multiplier_base,
                    self.paytable.minor_multiplier_span,
                    rng.next_f64(),
                );
                ([anchor.clone(), anchor, free], multiplier)
            }
            Tier::Loss => (self.losing_line(theme, rng)?, 0),
        };

        let win_amount = bet
            .checked_mul(multiplier)
            .ok_or(LedgerError::PayoutOverflow { bet, multiplier })?;

        Ok(SpinResult {
            theme_id: theme.id().to_string(),
            bet,
            symbols,
            tier,
            multiplier,
            win_amount,
        })
    }

    /// Random symbols for one churn frame; presentation only
    pub fn churn_frame(&self, theme: &Theme, rng: &mut dyn RandomSource) -> [String; REEL_COUNT] {
        std::array::from_fn(|_| theme.symbol(rng.index(theme.symbols().len())).to_string())
    }

    fn multiplier(base: u64, span: u64, draw: f64) -> u64 {
        let offset = (draw * span as f64).floor() as u64;
        base + offset.min(span.saturating_sub(1))
    }

    fn losing_line(&self, theme: &Theme, rng: &mut dyn RandomSource) -> SpinDripResult<[String; REEL_COUNT]> {
        let count = theme.symbols().len();
        let first = rng.index(count);
        let second = rng.index(count);
        let mut third = rng.index(count);

        let symbol = |i: usize| theme.symbol(i);
        let mut retries = 0;
        while symbol(first) == symbol(second) && symbol(second) == symbol(third) {
            if retries == self.paytable.loss_resample_limit {
                error!(
                    "theme {} exhausted {} loss resamples; symbol set too small",
                    theme.id(),
                    retries
                );
                return Err(ConfigurationError::SymbolSetTooSmall {
                    theme: theme.id().to_string(),
                    retries,
                }
                .into());
            }
            third = rng.index(count);
            retries += 1;
        }

        Ok([
            symbol(first).to_string(),
            symbol(second).to_string(),
            symbol(third).to_string(),
        ])
    }
}

impl Default for OutcomeEngine {
    fn default() -> Self {
        Self::new(PaytableConfig::default())
    }
}
