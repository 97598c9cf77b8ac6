mod rest;

pub use rest::BinanceSource;
