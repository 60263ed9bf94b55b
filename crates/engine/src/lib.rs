pub mod binance;
pub mod bridge;
pub mod checker;
pub mod evaluator;
pub mod message;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use binance::BinanceClient;
pub use checker::{AlarmChecker, TickReport};
pub use evaluator::is_triggered;
pub use scheduler::AlarmScheduler;
