//! Autoplay scheduler
//!
//! While enabled, fires a spin on a fixed period. A firing is skipped while
//! the orchestrator is mid-spin; a shortfall in funds turns autoplay off on
//! its own and publishes the transition.

use crate::errors::{LedgerError, SpinDripResult};
use crate::money::Money;
use crate::orchestrator::{SpinEvent, SpinOrchestrator};
use crate::scheduler::{spawn_periodic, TaskHandle, TickControl};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Why autoplay changed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoplayReason {
    /// Caller toggled it
    Requested,
    /// Balance no longer covers the bet
    InsufficientFunds,
    /// A spin failed for a reason other than funds
    SpinFailed,
}

struct AutoplayState {
    task: Option<TaskHandle>,
    bet: Money,
}

/// Periodic spin trigger bound to one orchestrator
#[derive(Clone)]
pub struct Autoplay {
    orchestrator: SpinOrchestrator,
    interval: Duration,
    enabled: Arc<AtomicBool>,
    state: Arc<Mutex<AutoplayState>>,
}

impl Autoplay {
    pub fn new(orchestrator: SpinOrchestrator, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            enabled: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(AutoplayState {
                task: None,
                bet: Money::ZERO,
            })),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Bet used by the most recent enable
    pub async fn bet(&self) -> Money {
        self.state.lock().await.bet
    }

    /// Start firing spins at `bet`.
    ///
    /// Fails without enabling when the bet is invalid or unaffordable.
    /// Enabling again replaces the running trigger.
    pub async fn enable(&self, bet: Money) -> SpinDripResult<()> {
        self.orchestrator.rules().validate(bet)?;
        let available = self.orchestrator.ledger().balance();
        if available < bet {
            return Err(LedgerError::InsufficientFunds {
                requested: bet,
                available,
            }
            .into());
        }

        let mut state = self.state.lock().await;
        if let Some(previous) = state.task.take() {
            previous.cancel().await;
        }

        let orchestrator = self.orchestrator.clone();
        let enabled = self.enabled.clone();
        state.task = Some(spawn_periodic("autoplay", self.interval, move || {
            let orchestrator = orchestrator.clone();
            let enabled = enabled.clone();
            async move { fire(&orchestrator, &enabled, bet).await }
        }));
        state.bet = bet;

        if !self.enabled.swap(true, Ordering::SeqCst) {
            info!("autoplay enabled at {} every {:?}", bet, self.interval);
            self.orchestrator.publish(SpinEvent::AutoplayChanged {
                enabled: true,
                reason: AutoplayReason::Requested,
            });
        }
        Ok(())
    }

    /// Stop autoplay; once this returns no further autoplay spin starts.
    ///
    /// Idempotent.
    pub async fn disable(&self) {
        let mut state = self.state.lock().await;
        if let Some(task) = state.task.take() {
            task.cancel().await;
        }
        if self.enabled.swap(false, Ordering::SeqCst) {
            info!("autoplay disabled");
            self.orchestrator.publish(SpinEvent::AutoplayChanged {
                enabled: false,
                reason: AutoplayReason::Requested,
            });
        }
    }
}

/// One autoplay firing
async fn fire(orchestrator: &SpinOrchestrator, enabled: &AtomicBool, bet: Money) -> TickControl {
    if !orchestrator.is_idle() {
        debug!("autoplay tick skipped: spin in flight");
        return TickControl::Continue;
    }
    if !orchestrator.ledger().can_afford(bet) {
        return stop(orchestrator, enabled, AutoplayReason::InsufficientFunds);
    }

    match orchestrator.request_spin(bet).await {
        Ok(_) if orchestrator.ledger().can_afford(bet) => TickControl::Continue,
        Ok(_) => stop(orchestrator, enabled, AutoplayReason::InsufficientFunds),
        Err(e) if e.is_already_in_flight() => TickControl::Continue,
        Err(e) if e.is_insufficient_funds() => stop(orchestrator, enabled, AutoplayReason::InsufficientFunds),
        Err(e) => {
            warn!("autoplay spin failed: {}", e);
            stop(orchestrator, enabled, AutoplayReason::SpinFailed)
        }
    }
}

fn stop(orchestrator: &SpinOrchestrator, enabled: &AtomicBool, reason: AutoplayReason) -> TickControl {
    if enabled.swap(false, Ordering::SeqCst) {
        info!("autoplay stopped: {:?}", reason);
        orchestrator.publish(SpinEvent::AutoplayChanged { enabled: false, reason });
    }
    TickControl::Stop
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpinDripConfig;
    use crate::games::ThemeCatalog;
    use crate::ledger::Ledger;
    use crate::rng::{SharedRandom, SequenceRandom};
    use tokio::time;

    const LOSING_DRAWS: [f64; 4] = [0.5, 0.3, 0.7, 0.9];

    fn autoplay(config: &SpinDripConfig, balance: Money) -> Autoplay {
        let theme = ThemeCatalog::built_in().lookup("golden-rooster").unwrap().clone();
        let orchestrator = SpinOrchestrator::new(
            config,
            theme,
            Ledger::new(balance),
            SharedRandom::new(SequenceRandom::new(LOSING_DRAWS.to_vec())),
        );
        Autoplay::new(orchestrator, config.timing.autoplay_interval())
    }

    #[tokio::test(start_paused = true)]
    async fn test_spins_on_each_period() {
        let autoplay = autoplay(&SpinDripConfig::instant(), Money::from_dollars(10));
        autoplay.enable(Money::from_dollars(1)).await.unwrap();
        assert!(autoplay.is_enabled());

        time::sleep(Duration::from_millis(6_500)).await;
        assert_eq!(autoplay.orchestrator.stats().total_spins, 3);
        assert_eq!(autoplay.orchestrator.ledger().balance(), Money::from_dollars(7));

        autoplay.disable().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_disables_when_funds_run_out() {
        let autoplay = autoplay(&SpinDripConfig::instant(), Money::from_dollars(1));
        let mut events = autoplay.orchestrator.subscribe();
        autoplay.enable(Money::from_dollars(1)).await.unwrap();

        time::sleep(Duration::from_secs(20)).await;

        assert!(!autoplay.is_enabled());
        assert_eq!(autoplay.orchestrator.stats().total_spins, 1);
        assert_eq!(autoplay.orchestrator.ledger().balance(), Money::ZERO);

        let mut transitions = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SpinEvent::AutoplayChanged { enabled, reason } = event {
                transitions.push((enabled, reason));
            }
        }
        assert_eq!(
            transitions,
            vec![
                (true, AutoplayReason::Requested),
                (false, AutoplayReason::InsufficientFunds)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_requires_funds() {
        let autoplay = autoplay(&SpinDripConfig::instant(), Money::from_cents(50));
        let err = autoplay.enable(Money::from_dollars(1)).await.unwrap_err();
        assert!(err.is_insufficient_funds());
        assert!(!autoplay.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_is_idempotent_and_final() {
        let autoplay = autoplay(&SpinDripConfig::instant(), Money::from_dollars(100));
        autoplay.enable(Money::from_dollars(1)).await.unwrap();

        time::sleep(Duration::from_millis(4_100)).await;
        autoplay.disable().await;
        autoplay.disable().await;
        let spins = autoplay.orchestrator.stats().total_spins;
        assert_eq!(spins, 2);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(autoplay.orchestrator.stats().total_spins, spins);
        assert!(!autoplay.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_while_spin_in_flight() {
        // churn longer than the autoplay period
        let mut config = SpinDripConfig::default();
        config.timing.churn_duration_ms = 3_000;
        let autoplay = autoplay(&config, Money::from_dollars(100));

        let manual = {
            let orchestrator = autoplay.orchestrator.clone();
            tokio::spawn(async move { orchestrator.request_spin(Money::from_dollars(1)).await })
        };
        autoplay.enable(Money::from_dollars(1)).await.unwrap();

        // tick at 2000ms lands mid-churn and is skipped
        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(autoplay.orchestrator.stats().total_spins, 0);

        manual.await.unwrap().unwrap();
        assert_eq!(autoplay.orchestrator.stats().total_spins, 1);

        autoplay.disable().await;
    }
}
