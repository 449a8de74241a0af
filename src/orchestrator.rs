//! Spin orchestrator
//!
//! Drives one spin through `Idle -> Churning -> Settling -> Idle`:
//!
//! 1. the bet is validated and, under the phase lock, debited from the ledger
//! 2. during the churn phase random frames are published on a short tick
//! 3. the outcome engine is invoked once with a fresh draw and any win is
//!    credited
//! 4. the phase returns to `Idle` and the result is published
//!
//! The cycle after the debit runs in its own tokio task, so a caller that
//! stops waiting cannot leave a debited bet unsettled.

use crate::autoplay::AutoplayReason;
use crate::config::{SpinDripConfig, TimingConfig};
use crate::errors::{SchedulerError, SpinDripResult, WagerError};
use crate::games::{BetRules, OutcomeEngine, SpinResult, Theme, Tier, REEL_COUNT};
use crate::ledger::Ledger;
use crate::money::Money;
use crate::rng::SharedRandom;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where the orchestrator is in the spin cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinPhase {
    Idle,
    Churning,
    Settling,
}

/// Notifications published to session observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpinEvent {
    /// Bet accepted and debited
    Started { bet: Money, balance: Money },
    /// Presentation frame during the churn phase
    Churn { symbols: [String; REEL_COUNT] },
    /// Outcome settled into the ledger
    Settled {
        result: SpinResult,
        balance: Money,
        big_win: bool,
    },
    AutoplayChanged { enabled: bool, reason: AutoplayReason },
}

/// Running totals for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub total_spins: u64,
    pub total_wagered: Money,
    pub total_won: Money,
    /// Win of the most recent spin, zero after a loss
    pub last_win: Money,
    pub biggest_win: Money,
    pub jackpots: u64,
    pub minors: u64,
    pub losses: u64,
}

impl SessionStats {
    pub fn record(&mut self, result: &SpinResult) {
        self.total_spins += 1;
        self.total_wagered = self.total_wagered.saturating_add(result.bet);
        self.total_won = self.total_won.saturating_add(result.win_amount);
        self.last_win = result.win_amount;
        self.biggest_win = self.biggest_win.max(result.win_amount);
        match result.tier {
            Tier::Jackpot => self.jackpots += 1,
            Tier::Minor => self.minors += 1,
            Tier::Loss => self.losses += 1,
        }
    }

    /// Observed return to player over the session
    pub fn observed_rtp(&self) -> f64 {
        if self.total_wagered.is_zero() {
            0.0
        } else {
            self.total_won.as_decimal() / self.total_wagered.as_decimal()
        }
    }
}

struct OrchestratorInner {
    ledger: Ledger,
    engine: OutcomeEngine,
    theme: Theme,
    rules: BetRules,
    timing: TimingConfig,
    rng: SharedRandom,
    phase: Mutex<SpinPhase>,
    stats: Mutex<SessionStats>,
    events: broadcast::Sender<SpinEvent>,
}

/// Single-flight spin state machine over a shared ledger
#[derive(Clone)]
pub struct SpinOrchestrator {
    inner: Arc<OrchestratorInner>,
}

/// Puts the phase back to `Idle` when the cycle ends, however it ends
struct IdleOnDrop<'a> {
    phase: &'a Mutex<SpinPhase>,
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *lock(self.phase) = SpinPhase::Idle;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SpinOrchestrator {
    pub fn new(config: &SpinDripConfig, theme: Theme, ledger: Ledger, rng: SharedRandom) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(OrchestratorInner {
                ledger,
                engine: OutcomeEngine::new(config.paytable.clone()),
                theme,
                rules: BetRules::from_config(&config.game),
                timing: config.timing.clone(),
                rng,
                phase: Mutex::new(SpinPhase::Idle),
                stats: Mutex::new(SessionStats::default()),
                events,
            }),
        }
    }

    /// Run one full spin cycle at `bet`.
    ///
    /// Rejections (`InvalidBet`, `AlreadyInFlight`, `InsufficientFunds`)
    /// leave the ledger untouched.
    pub async fn request_spin(&self, bet: Money) -> SpinDripResult<SpinResult> {
        self.inner.rules.validate(bet)?;
        let balance = self.begin(bet)?;
        debug!("spin accepted: bet {} balance {}", bet, balance);
        self.publish(SpinEvent::Started { bet, balance });

        let inner = self.inner.clone();
        // the inner result is the settlement itself
        tokio::spawn(async move { inner.run_cycle(bet).await })
            .await
            .map_err(|e| SchedulerError::TaskFailed {
                task: "spin".to_string(),
                reason: e.to_string(),
            })?
    }

    /// Idle -> Churning, debiting the bet under the phase lock
    fn begin(&self, bet: Money) -> SpinDripResult<Money> {
        let mut phase = lock(&self.inner.phase);
        if *phase != SpinPhase::Idle {
            return Err(WagerError::AlreadyInFlight.into());
        }
        let balance = self.inner.ledger.debit(bet)?;
        *phase = SpinPhase::Churning;
        Ok(balance)
    }

    pub fn phase(&self) -> SpinPhase {
        *lock(&self.inner.phase)
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == SpinPhase::Idle
    }

    pub fn stats(&self) -> SessionStats {
        lock(&self.inner.stats).clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpinEvent> {
        self.inner.events.subscribe()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.inner.ledger
    }

    pub fn rules(&self) -> &BetRules {
        &self.inner.rules
    }

    pub fn theme(&self) -> &Theme {
        &self.inner.theme
    }

    pub(crate) fn publish(&self, event: SpinEvent) {
        self.inner.publish(event);
    }
}

impl OrchestratorInner {
    fn publish(&self, event: SpinEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    async fn run_cycle(&self, bet: Money) -> SpinDripResult<SpinResult> {
        let idle = IdleOnDrop { phase: &self.phase };

        self.churn().await;
        *lock(&self.phase) = SpinPhase::Settling;

        let outcome = {
            let mut rng = self.rng.lock();
            self.engine.spin(bet, &self.theme, &mut **rng)
        };
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("spin evaluation failed, refunding {}: {}", bet, e);
                if let Err(refund) = self.ledger.credit(bet) {
                    error!("refund of {} failed: {}", bet, refund);
                }
                return Err(e);
            }
        };

        let balance = if result.is_win() {
            self.ledger.credit(result.win_amount)?
        } else {
            self.ledger.balance()
        };
        lock(&self.stats).record(&result);

        if result.tier == Tier::Jackpot {
            info!(
                "jackpot on {}: {} x{} = {}",
                self.theme.id(),
                bet,
                result.multiplier,
                result.win_amount
            );
        } else if result.is_win() {
            info!("win {} on bet {}", result.win_amount, bet);
        } else {
            debug!("loss on bet {}", bet);
        }

        drop(idle);
        self.publish(SpinEvent::Settled {
            result: result.clone(),
            balance,
            big_win: result.tier == Tier::Jackpot,
        });
        Ok(result)
    }

    /// Publish random frames until the churn duration has elapsed
    async fn churn(&self) {
        let duration = self.timing.churn_duration();
        if duration.is_zero() {
            return;
        }
        let tick = self.timing.churn_tick().max(Duration::from_millis(1));
        let deadline = Instant::now() + duration;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let symbols = {
                let mut rng = self.rng.lock();
                self.engine.churn_frame(&self.theme, &mut **rng)
            };
            self.publish(SpinEvent::Churn { symbols });
            time::sleep(tick.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::ThemeCatalog;
    use crate::rng::{SeededRandom, SequenceRandom};

    // every value lands in the loss band and on a distinct symbol
    const LOSING_DRAWS: [f64; 4] = [0.5, 0.3, 0.7, 0.9];

    fn orchestrator(config: &SpinDripConfig, balance: Money, draws: Vec<f64>) -> SpinOrchestrator {
        let theme = ThemeCatalog::built_in().lookup("golden-rooster").unwrap().clone();
        SpinOrchestrator::new(
            config,
            theme,
            Ledger::new(balance),
            SharedRandom::new(SequenceRandom::new(draws)),
        )
    }

    #[tokio::test]
    async fn test_jackpot_settles_into_ledger() {
        // primary draw 0.03, multiplier draw 0.0 -> x50
        let orch = orchestrator(&SpinDripConfig::instant(), Money::from_dollars(10), vec![0.03, 0.0]);

        let result = orch.request_spin(Money::from_dollars(1)).await.unwrap();

        assert_eq!(result.tier, Tier::Jackpot);
        assert_eq!(result.win_amount, Money::from_dollars(50));
        assert_eq!(orch.ledger().balance(), Money::from_dollars(59));
        assert!(orch.is_idle());
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balance() {
        let orch = orchestrator(&SpinDripConfig::instant(), Money::from_dollars(5), vec![0.5]);

        let err = orch.request_spin(Money::from_dollars(10)).await.unwrap_err();

        assert!(err.is_insufficient_funds());
        assert_eq!(orch.ledger().balance(), Money::from_dollars(5));
        assert!(orch.is_idle());
        assert_eq!(orch.stats().total_spins, 0);
    }

    #[tokio::test]
    async fn test_invalid_bet_rejected_before_debit() {
        let orch = orchestrator(&SpinDripConfig::instant(), Money::from_dollars(5), vec![0.5]);

        let err = orch.request_spin(Money::from_cents(30)).await.unwrap_err();
        assert!(err.is_invalid_bet());
        let err = orch.request_spin(Money::ZERO).await.unwrap_err();
        assert!(err.is_invalid_bet());
        assert_eq!(orch.ledger().balance(), Money::from_dollars(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_during_churn_is_rejected() {
        let orch = orchestrator(&SpinDripConfig::default(), Money::from_dollars(10), LOSING_DRAWS.to_vec());
        let first = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.request_spin(Money::from_dollars(1)).await })
        };

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(orch.phase(), SpinPhase::Churning);

        let err = orch.request_spin(Money::from_dollars(1)).await.unwrap_err();
        assert!(err.is_already_in_flight());
        assert_eq!(orch.ledger().balance(), Money::from_dollars(9));

        let result = first.await.unwrap().unwrap();
        assert_eq!(result.tier, Tier::Loss);
        assert!(orch.is_idle());
        assert_eq!(orch.stats().total_spins, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_sequence() {
        let orch = orchestrator(&SpinDripConfig::default(), Money::from_dollars(10), LOSING_DRAWS.to_vec());
        let mut events = orch.subscribe();

        let result = orch.request_spin(Money::from_dollars(1)).await.unwrap();

        match events.try_recv().unwrap() {
            SpinEvent::Started { bet, balance } => {
                assert_eq!(bet, Money::from_dollars(1));
                assert_eq!(balance, Money::from_dollars(9));
            }
            other => panic!("expected Started, got {:?}", other),
        }

        let mut frames = 0;
        loop {
            match events.try_recv().unwrap() {
                SpinEvent::Churn { .. } => frames += 1,
                SpinEvent::Settled { result: settled, balance, big_win } => {
                    assert_eq!(settled, result);
                    assert_eq!(balance, Money::from_dollars(9));
                    assert!(!big_win);
                    break;
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        // 1500ms of churn on a 100ms tick
        assert_eq!(frames, 15);
    }

    #[tokio::test]
    async fn test_balance_equation_over_many_spins() {
        let config = SpinDripConfig::instant();
        let theme = ThemeCatalog::built_in().lookup("dollar-eagle").unwrap().clone();
        let orch = SpinOrchestrator::new(
            &config,
            theme,
            Ledger::new(Money::from_dollars(1_000)),
            SharedRandom::new(SeededRandom::new(11)),
        );

        for _ in 0..500 {
            let before = orch.ledger().balance();
            let bet = Money::from_cents(50);
            let result = orch.request_spin(bet).await.unwrap();
            let after = orch.ledger().balance();
            assert_eq!(after.cents() + bet.cents(), before.cents() + result.win_amount.cents());
        }

        let stats = orch.stats();
        assert_eq!(stats.total_spins, 500);
        assert_eq!(stats.jackpots + stats.minors + stats.losses, 500);
        assert_eq!(stats.total_wagered, Money::from_dollars(250));
    }

    #[test]
    fn test_session_stats_record() {
        let mut stats = SessionStats::default();
        let win = SpinResult {
            theme_id: "t".to_string(),
            bet: Money::from_dollars(2),
            symbols: ["A".to_string(), "A".to_string(), "C".to_string()],
            tier: Tier::Minor,
            multiplier: 4,
            win_amount: Money::from_dollars(8),
        };
        let loss = SpinResult {
            tier: Tier::Loss,
            multiplier: 0,
            win_amount: Money::ZERO,
            symbols: ["A".to_string(), "B".to_string(), "C".to_string()],
            ..win.clone()
        };

        stats.record(&win);
        assert_eq!(stats.last_win, Money::from_dollars(8));
        stats.record(&loss);

        assert_eq!(stats.total_spins, 2);
        assert_eq!(stats.last_win, Money::ZERO);
        assert_eq!(stats.biggest_win, Money::from_dollars(8));
        assert_eq!(stats.minors, 1);
        assert_eq!(stats.losses, 1);
        assert!((stats.observed_rtp() - 2.0).abs() < 1e-9);
    }
}
