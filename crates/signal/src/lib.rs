pub mod classify;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod extrema;
pub mod hotzone;
pub mod store;
pub mod wallet;

pub use config::{SignalFileConfig, StrategyConfig, StrategyKind};
pub use engine::{SignalEngine, SignalEngineConfig};
pub use store::{ObservationStore, RetentionPolicy};
