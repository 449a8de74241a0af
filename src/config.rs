//! Configuration management with validation and defaults
//!
//! A single [`SpinDripConfig`] carries the wagering rules, the payout table,
//! the presentation timings and the win-feed catalogs. It can be built in
//! code, loaded from TOML, and overridden through `SPINDRIP_*` environment
//! variables.

use crate::errors::{ConfigurationError, SpinDripResult};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Complete session configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpinDripConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub paytable: PaytableConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Wagering rules
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    pub starting_balance: Money,
    pub min_bet: Money,
    pub max_bet: Money,
    pub bet_step: Money,
    pub default_bet: Money,
    pub default_theme: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_balance: Money::ZERO,
            min_bet: Money::from_cents(50),
            max_bet: Money::from_dollars(10),
            bet_step: Money::from_cents(50),
            default_bet: Money::from_dollars(1),
            default_theme: "golden-rooster".to_string(),
        }
    }
}

/// Tier probabilities and payout multipliers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaytableConfig {
    /// Draws below this land on the jackpot tier
    pub jackpot_threshold: f64,
    /// Draws below this (and at or above the jackpot threshold) land on the minor tier
    pub minor_threshold: f64,
    pub jackpot_multiplier_base: u64,
    pub jackpot_multiplier_span: u64,
    pub minor_multiplier_base: u64,
    pub minor_multiplier_span: u64,
    /// Retry ceiling for re-drawing the third reel of a losing line
    pub loss_resample_limit: u32,
}

impl Default for PaytableConfig {
    fn default() -> Self {
        Self {
            jackpot_threshold: 0.05,
            minor_threshold: 0.15,
            jackpot_multiplier_base: 50,
            jackpot_multiplier_span: 100,
            minor_multiplier_base: 2,
            minor_multiplier_span: 8,
            loss_resample_limit: 64,
        }
    }
}

impl PaytableConfig {
    pub fn jackpot_chance(&self) -> f64 {
        self.jackpot_threshold
    }

    pub fn minor_chance(&self) -> f64 {
        self.minor_threshold - self.jackpot_threshold
    }

    /// Expected return per unit staked, from the table alone
    pub fn theoretical_rtp(&self) -> f64 {
        let mean = |base: u64, span: u64| base as f64 + (span.saturating_sub(1)) as f64 / 2.0;
        self.jackpot_chance() * mean(self.jackpot_multiplier_base, self.jackpot_multiplier_span)
            + self.minor_chance() * mean(self.minor_multiplier_base, self.minor_multiplier_span)
    }
}

/// Presentation and scheduling timings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Length of the churn phase; zero skips it
    pub churn_duration_ms: u64,
    pub churn_tick_ms: u64,
    pub autoplay_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            churn_duration_ms: 1500,
            churn_tick_ms: 100,
            autoplay_interval_ms: 2000,
        }
    }
}

impl TimingConfig {
    pub fn churn_duration(&self) -> Duration {
        Duration::from_millis(self.churn_duration_ms)
    }

    pub fn churn_tick(&self) -> Duration {
        Duration::from_millis(self.churn_tick_ms)
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms)
    }
}

/// Win feed generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    pub capacity: usize,
    /// Number of most-recent entries the featured pointer rotates over
    pub featured_window: usize,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub rotation_interval_ms: u64,
    pub jackpot_chance: f64,
    pub jackpot_min: Money,
    pub jackpot_max: Money,
    pub regular_min: Money,
    pub regular_max: Money,
    /// Events fabricated immediately when production starts
    pub initial_events: usize,
    pub usernames: Vec<String>,
    pub games: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            featured_window: 3,
            min_interval_ms: 8000,
            max_interval_ms: 13000,
            rotation_interval_ms: 3000,
            jackpot_chance: 0.10,
            jackpot_min: Money::from_dollars(500),
            jackpot_max: Money::from_dollars(2000),
            regular_min: Money::from_dollars(5),
            regular_max: Money::from_dollars(200),
            initial_events: 5,
            usernames: [
                "Jaydo420", "MissCashout", "SpinKing88", "LuckyLuke", "CasinoQueen",
                "BigWinner", "SlotMaster", "GoldRush", "JackpotJoe", "WinnerTakesAll",
                "CashCow", "SpinDoctor", "LuckyCharm", "MoneyMaker", "BigBaller",
                "SlotLord", "CasinoKing", "WinBig", "LuckyStrike", "CashMachine",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            games: [
                "Golden Rooster", "MBK Gangster", "Crown Rich", "Dollar Eagle", "Lion Gold",
                "Happy Buddha", "Soccer Magic", "Sea Treasures", "Fire Dragon", "Lucky Seven",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl FeedConfig {
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.rotation_interval_ms)
    }
}

impl SpinDripConfig {
    /// No churn phase; spins settle as soon as they are accepted
    pub fn instant() -> Self {
        Self {
            timing: TimingConfig {
                churn_duration_ms: 0,
                ..TimingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> SpinDripResult<()> {
        self.validate_game()?;
        self.validate_paytable()?;
        self.validate_timing()?;
        self.validate_feed()?;
        Ok(())
    }

    fn validate_game(&self) -> SpinDripResult<()> {
        let game = &self.game;
        if game.bet_step.is_zero() {
            return Err(invalid("game.bet_step", game.bet_step, "Bet step cannot be zero"));
        }
        if game.min_bet.is_zero() {
            return Err(invalid("game.min_bet", game.min_bet, "Minimum bet must be positive"));
        }
        if game.max_bet < game.min_bet {
            return Err(invalid("game.max_bet", game.max_bet, "Maximum bet is below the minimum bet"));
        }
        if game.min_bet.cents() % game.bet_step.cents() != 0 {
            return Err(invalid("game.min_bet", game.min_bet, "Minimum bet is not a multiple of the bet step"));
        }
        if game.default_bet < game.min_bet || game.default_bet > game.max_bet {
            return Err(invalid("game.default_bet", game.default_bet, "Default bet is outside the bet limits"));
        }
        if game.default_bet.cents() % game.bet_step.cents() != 0 {
            return Err(invalid("game.default_bet", game.default_bet, "Default bet is not a multiple of the bet step"));
        }
        if game.default_theme.is_empty() {
            return Err(ConfigurationError::MissingRequired("game.default_theme".to_string()).into());
        }
        Ok(())
    }

    fn validate_paytable(&self) -> SpinDripResult<()> {
        let table = &self.paytable;
        let probability = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        if !probability(table.jackpot_threshold) {
            return Err(invalid("paytable.jackpot_threshold", table.jackpot_threshold, "Must be a probability"));
        }
        if !probability(table.minor_threshold) || table.minor_threshold < table.jackpot_threshold {
            return Err(invalid(
                "paytable.minor_threshold",
                table.minor_threshold,
                "Must be a probability no lower than the jackpot threshold",
            ));
        }
        if table.jackpot_multiplier_span == 0 || table.minor_multiplier_span == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "Payout multiplier spans must be at least 1".to_string(),
            )
            .into());
        }
        if table.loss_resample_limit == 0 {
            return Err(invalid("paytable.loss_resample_limit", 0, "Resample limit cannot be zero"));
        }
        Ok(())
    }

    fn validate_timing(&self) -> SpinDripResult<()> {
        let timing = &self.timing;
        if timing.churn_duration_ms > 0 && timing.churn_tick_ms == 0 {
            return Err(invalid("timing.churn_tick_ms", 0, "Churn tick cannot be zero while churn is enabled"));
        }
        if timing.autoplay_interval_ms == 0 {
            return Err(invalid("timing.autoplay_interval_ms", 0, "Autoplay interval cannot be zero"));
        }
        Ok(())
    }

    fn validate_feed(&self) -> SpinDripResult<()> {
        self.feed.validate()
    }
}

impl FeedConfig {
    /// Catalog and timing checks for the win feed
    pub fn validate(&self) -> SpinDripResult<()> {
        let feed = self;
        if feed.capacity == 0 {
            return Err(invalid("feed.capacity", 0, "Feed capacity cannot be zero"));
        }
        if feed.featured_window == 0 {
            return Err(invalid("feed.featured_window", 0, "Featured window cannot be zero"));
        }
        if feed.min_interval_ms == 0 || feed.max_interval_ms < feed.min_interval_ms {
            return Err(ConfigurationError::ValidationFailed(format!(
                "Feed production window {}..{}ms is invalid",
                feed.min_interval_ms, feed.max_interval_ms
            ))
            .into());
        }
        if feed.rotation_interval_ms == 0 {
            return Err(invalid("feed.rotation_interval_ms", 0, "Rotation interval cannot be zero"));
        }
        if !(feed.jackpot_chance.is_finite() && (0.0..=1.0).contains(&feed.jackpot_chance)) {
            return Err(invalid("feed.jackpot_chance", feed.jackpot_chance, "Must be a probability"));
        }
        if feed.jackpot_min.is_zero() || feed.jackpot_max <= feed.jackpot_min {
            return Err(invalid("feed.jackpot_max", feed.jackpot_max, "Jackpot amount range is empty"));
        }
        if feed.regular_min.is_zero() || feed.regular_max <= feed.regular_min {
            return Err(invalid("feed.regular_max", feed.regular_max, "Regular amount range is empty"));
        }
        if feed.usernames.is_empty() {
            return Err(ConfigurationError::MissingRequired("feed.usernames".to_string()).into());
        }
        if feed.usernames.iter().any(|name| name.trim().is_empty()) {
            return Err(invalid("feed.usernames", "\"\"", "Usernames cannot be blank"));
        }
        if feed.games.is_empty() {
            return Err(ConfigurationError::MissingRequired("feed.games".to_string()).into());
        }
        if feed.games.iter().any(|game| game.trim().is_empty()) {
            return Err(invalid("feed.games", "\"\"", "Game names cannot be blank"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> crate::errors::SpinDripError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> SpinDripResult<SpinDripConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => SpinDripConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> SpinDripResult<SpinDripConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut SpinDripConfig) -> SpinDripResult<()> {
        if let Some(balance) = money_var("SPINDRIP_STARTING_BALANCE")? {
            config.game.starting_balance = balance;
        }
        if let Some(bet) = money_var("SPINDRIP_DEFAULT_BET")? {
            config.game.default_bet = bet;
        }
        if let Ok(theme) = env::var("SPINDRIP_THEME") {
            config.game.default_theme = theme;
        }
        if let Some(ms) = millis_var("SPINDRIP_CHURN_MS")? {
            config.timing.churn_duration_ms = ms;
        }
        if let Some(ms) = millis_var("SPINDRIP_AUTOPLAY_MS")? {
            config.timing.autoplay_interval_ms = ms;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &SpinDripConfig, path: &str) -> SpinDripResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn money_var(name: &str) -> SpinDripResult<Option<Money>> {
    match env::var(name) {
        Ok(raw) => raw.parse::<Money>().map(Some).map_err(|e| {
            ConfigurationError::InvalidValue {
                field: name.to_string(),
                value: raw,
                reason: e.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

fn millis_var(name: &str) -> SpinDripResult<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
            ConfigurationError::InvalidValue {
                field: name.to_string(),
                value: raw,
                reason: "Invalid millisecond value".to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: SpinDripConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SpinDripConfig::default(),
        }
    }

    pub fn game(mut self, game: GameConfig) -> Self {
        self.config.game = game;
        self
    }

    pub fn paytable(mut self, paytable: PaytableConfig) -> Self {
        self.config.paytable = paytable;
        self
    }

    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.config.timing = timing;
        self
    }

    pub fn feed(mut self, feed: FeedConfig) -> Self {
        self.config.feed = feed;
        self
    }

    pub fn starting_balance(mut self, balance: Money) -> Self {
        self.config.game.starting_balance = balance;
        self
    }

    /// Build and validate
    pub fn build(self) -> SpinDripResult<SpinDripConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> SpinDripResult<()> {
    ConfigLoader::new().save(&SpinDripConfig::default(), path)
}
