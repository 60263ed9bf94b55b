pub mod config;
pub mod error;
pub mod notifier;
pub mod price;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use notifier::Notifier;
pub use price::PriceSource;
pub use types::*;
