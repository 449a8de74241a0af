pub mod bet;
pub mod catalog;
pub mod engine;
pub mod simulation;
pub mod types;

pub use bet::BetRules;
pub use catalog::{ThemeCatalog, DEFAULT_THEME_ID};
pub use engine::OutcomeEngine;
pub use simulation::{simulate, SimulationReport};
pub use types::*;
