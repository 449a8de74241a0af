//! Synthetic win feed
//!
//! Fabricated "other player" wins in a bounded newest-first buffer. Fully
//! independent of the spin path.

pub mod buffer;
pub mod event;
pub mod generator;

pub use buffer::FeedBuffer;
pub use event::{WinEvent, WinEventFactory};
pub use generator::{FeedSnapshot, FeedStream, WinFeed};
