//! Session facade
//!
//! [`GameSession`] owns everything one local player needs: the ledger, the
//! spin orchestrator, autoplay, the win feed and the selected bet. It is the
//! surface the presentation layer and the deposit/withdraw collaborators
//! talk to.

use crate::autoplay::Autoplay;
use crate::config::SpinDripConfig;
use crate::errors::{ConfigurationError, SpinDripResult};
use crate::feed::{FeedStream, WinFeed};
use crate::games::{BetRules, SpinResult, Theme, ThemeCatalog};
use crate::ledger::Ledger;
use crate::money::Money;
use crate::orchestrator::{SessionStats, SpinEvent, SpinOrchestrator};
use crate::rng::SharedRandom;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::info;

pub struct GameSession {
    config: SpinDripConfig,
    ledger: Ledger,
    orchestrator: SpinOrchestrator,
    autoplay: Autoplay,
    feed: WinFeed,
    bet: Mutex<Money>,
}

impl GameSession {
    /// Session on the built-in themes with OS entropy
    pub fn new(config: SpinDripConfig) -> SpinDripResult<Self> {
        Self::with_random(config, &ThemeCatalog::built_in(), SharedRandom::from_entropy())
    }

    /// Session with an explicit theme catalog and random source
    pub fn with_random(config: SpinDripConfig, catalog: &ThemeCatalog, rng: SharedRandom) -> SpinDripResult<Self> {
        config.validate()?;

        let theme = catalog.resolve(&config.game.default_theme)?.clone();
        if theme.distinct_symbols() < 2 {
            return Err(ConfigurationError::SymbolSetTooSmall {
                theme: theme.id().to_string(),
                retries: 0,
            }
            .into());
        }

        let ledger = Ledger::new(config.game.starting_balance);
        let orchestrator = SpinOrchestrator::new(&config, theme, ledger.clone(), rng.clone());
        let autoplay = Autoplay::new(orchestrator.clone(), config.timing.autoplay_interval());
        let feed = WinFeed::new(config.feed.clone(), rng)?;

        info!(
            "session ready on {} with balance {}",
            orchestrator.theme().id(),
            config.game.starting_balance
        );

        Ok(Self {
            bet: Mutex::new(config.game.default_bet),
            config,
            ledger,
            orchestrator,
            autoplay,
            feed,
        })
    }

    fn bet_guard(&self) -> MutexGuard<'_, Money> {
        self.bet.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spin once at `bet`
    pub async fn request_spin(&self, bet: Money) -> SpinDripResult<SpinResult> {
        self.orchestrator.request_spin(bet).await
    }

    /// Spin once at the selected bet
    pub async fn spin(&self) -> SpinDripResult<SpinResult> {
        self.request_spin(self.bet()).await
    }

    /// Turn autoplay on at the selected bet, or off
    pub async fn set_autoplay(&self, enabled: bool) -> SpinDripResult<()> {
        if enabled {
            self.autoplay.enable(self.bet()).await
        } else {
            self.autoplay.disable().await;
            Ok(())
        }
    }

    pub fn is_autoplay_enabled(&self) -> bool {
        self.autoplay.is_enabled()
    }

    pub fn get_balance(&self) -> Money {
        self.ledger.balance()
    }

    /// Deposit collaborator hook; returns the new balance
    pub fn on_deposit(&self, amount: Money) -> SpinDripResult<Money> {
        let balance = self.ledger.credit(amount)?;
        info!("deposit {} -> balance {}", amount, balance);
        Ok(balance)
    }

    /// Withdrawal collaborator hook; returns the new balance
    pub fn on_withdraw(&self, amount: Money) -> SpinDripResult<Money> {
        let balance = self.ledger.debit(amount)?;
        info!("withdraw {} -> balance {}", amount, balance);
        Ok(balance)
    }

    /// Start the win feed if needed and subscribe to it
    pub async fn subscribe_to_feed(&self) -> FeedStream {
        self.feed.start().await;
        self.feed.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SpinEvent> {
        self.orchestrator.subscribe()
    }

    pub fn bet(&self) -> Money {
        *self.bet_guard()
    }

    /// Select a bet; rejected if zero or off the step grid
    pub fn set_bet(&self, bet: Money) -> SpinDripResult<Money> {
        self.rules().validate(bet)?;
        *self.bet_guard() = bet;
        Ok(bet)
    }

    pub fn increase_bet(&self) -> Money {
        let balance = self.get_balance();
        let mut bet = self.bet_guard();
        *bet = self.rules().increase(*bet, balance);
        *bet
    }

    pub fn decrease_bet(&self) -> Money {
        let mut bet = self.bet_guard();
        *bet = self.rules().decrease(*bet);
        *bet
    }

    /// Largest bet the balance covers
    pub fn max_bet(&self) -> Money {
        let balance = self.get_balance();
        let mut bet = self.bet_guard();
        *bet = self.rules().max_for_balance(balance);
        *bet
    }

    pub fn rules(&self) -> &BetRules {
        self.orchestrator.rules()
    }

    pub fn theme(&self) -> &Theme {
        self.orchestrator.theme()
    }

    pub fn stats(&self) -> SessionStats {
        self.orchestrator.stats()
    }

    pub fn feed(&self) -> &WinFeed {
        &self.feed
    }

    pub fn orchestrator(&self) -> &SpinOrchestrator {
        &self.orchestrator
    }

    pub fn config(&self) -> &SpinDripConfig {
        &self.config
    }

    /// Stop autoplay and the feed timers
    pub async fn shutdown(&self) {
        self.autoplay.disable().await;
        self.feed.shutdown().await;
        info!("session shut down with balance {}", self.get_balance());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::rng::SeededRandom;

    fn session(balance: Money) -> GameSession {
        let config = ConfigBuilder::new()
            .starting_balance(balance)
            .timing(SpinDripConfig::instant().timing)
            .build()
            .unwrap();
        GameSession::with_random(config, &ThemeCatalog::built_in(), SharedRandom::new(SeededRandom::new(4))).unwrap()
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let mut config = SpinDripConfig::instant();
        config.game.default_theme = "sea-treasures".to_string();
        let session =
            GameSession::with_random(config, &ThemeCatalog::built_in(), SharedRandom::new(SeededRandom::new(1))).unwrap();
        assert_eq!(session.theme().id(), "golden-rooster");
    }

    #[test]
    fn test_single_symbol_theme_rejected_at_startup() {
        let mut catalog = ThemeCatalog::new("mono");
        catalog.insert(Theme::new("mono", "Mono", vec!["7".to_string(); 5]).unwrap());
        let mut config = SpinDripConfig::instant();
        config.game.default_theme = "mono".to_string();

        assert!(GameSession::with_random(config, &catalog, SharedRandom::new(SeededRandom::new(1))).is_err());
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let session = session(Money::ZERO);
        assert_eq!(session.on_deposit(Money::from_dollars(20)).unwrap(), Money::from_dollars(20));
        assert_eq!(session.on_withdraw(Money::from_cents(750)).unwrap(), Money::from_cents(1250));

        let err = session.on_withdraw(Money::from_dollars(100)).unwrap_err();
        assert!(err.is_insufficient_funds());
        assert_eq!(session.get_balance(), Money::from_cents(1250));
    }

    #[test]
    fn test_bet_stepper() {
        let session = session(Money::from_cents(320));
        assert_eq!(session.bet(), Money::from_dollars(1));

        assert_eq!(session.increase_bet(), Money::from_cents(150));
        assert_eq!(session.decrease_bet(), Money::from_dollars(1));
        assert_eq!(session.max_bet(), Money::from_dollars(3));
        assert_eq!(session.increase_bet(), Money::from_dollars(3));

        assert!(session.set_bet(Money::from_cents(70)).is_err());
        assert_eq!(session.set_bet(Money::from_dollars(2)).unwrap(), Money::from_dollars(2));
    }

    #[tokio::test]
    async fn test_spin_at_selected_bet() {
        let session = session(Money::from_dollars(10));
        let result = session.spin().await.unwrap();
        assert_eq!(result.bet, Money::from_dollars(1));
        assert_eq!(
            session.get_balance().cents(),
            Money::from_dollars(9).cents() + result.win_amount.cents()
        );
        assert_eq!(session.stats().total_spins, 1);
    }
}
