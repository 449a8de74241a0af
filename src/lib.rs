//! SpinDrip - Reel Slot Simulation Core
//!
//! Outcome generation and settlement for a three-reel wagering game, an
//! autoplay scheduler, and a synthetic "recent wins" feed. Everything runs
//! in-process for a single local player; randomness is injected so any
//! session can be replayed exactly.
//!
//! ```no_run
//! use spindrip::{GameSession, Money, SpinDripConfig};
//!
//! # async fn run() -> spindrip::SpinDripResult<()> {
//! let session = GameSession::new(SpinDripConfig::instant())?;
//! session.on_deposit(Money::from_dollars(20))?;
//! let result = session.request_spin(Money::from_dollars(1)).await?;
//! println!("{:?} won {}", result.symbols, result.win_amount);
//! # Ok(())
//! # }
//! ```

pub mod autoplay;
pub mod config;
pub mod errors;
pub mod feed;
pub mod games;
pub mod ledger;
pub mod money;
pub mod orchestrator;
pub mod rng;
pub mod scheduler;
pub mod session;

pub use autoplay::{Autoplay, AutoplayReason};
pub use config::{ConfigBuilder, ConfigLoader, SpinDripConfig};
pub use errors::{SpinDripError, SpinDripResult};
pub use feed::{FeedSnapshot, FeedStream, WinEvent, WinFeed};
pub use games::{simulate, BetRules, OutcomeEngine, SimulationReport, SpinResult, Theme, ThemeCatalog, Tier};
pub use ledger::Ledger;
pub use money::Money;
pub use orchestrator::{SessionStats, SpinEvent, SpinOrchestrator, SpinPhase};
pub use rng::{RandomSource, SeededRandom, SequenceRandom, SharedRandom};
pub use session::GameSession;
