pub mod binance;
pub mod dune;
pub mod lifecycle;
pub mod poller;
pub mod writer;

pub use binance::BinanceSource;
pub use dune::DuneClient;
pub use lifecycle::{Engine, EngineHandle};
pub use poller::PollContext;
pub use writer::{ChannelSink, SignalWriter};
