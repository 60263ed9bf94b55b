mod rest;

pub use rest::BinanceClient;
