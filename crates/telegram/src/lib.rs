pub mod args;
pub mod commands;
pub mod notifier;

pub use commands::{spawn_bot, BotDeps, BotHandle};
pub use notifier::TelegramNotifier;
