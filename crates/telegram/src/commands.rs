use std::sync::Arc;

use teloxide::{
    dispatching::{ShutdownToken, UpdateHandler},
    prelude::*,
    types::ParseMode,
    utils::command::BotCommands,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use common::{Alarm, Condition, Platform, PriceSource};
use engine::{message::format_usd, AlarmScheduler};
use store::AlarmStore;

use crate::args::{parse_alarm_args, parse_alarm_id, parse_symbol};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub store: AlarmStore,
    pub prices: Arc<dyn PriceSource>,
    pub scheduler: AlarmScheduler,
    /// Empty means the bot answers everyone.
    pub allowed_user_ids: Arc<Vec<i64>>,
}

/// Telegram bot commands exposed to users.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Display help commands")]
    Help,
    #[command(description = "<symbol> <price> <above/below> - Set an alarm")]
    Alarm(String),
    #[command(description = "List active alarms")]
    Alarms,
    #[command(description = "<id> - Delete a specific alarm")]
    DeleteAlarm(String),
    #[command(description = "<symbol> - Get current price")]
    Price(String),
    #[command(description = "Show price checker status")]
    Status,
}

/// Running dispatcher plus the token needed to stop it.
pub struct BotHandle {
    shutdown: ShutdownToken,
    task: JoinHandle<()>,
}

impl BotHandle {
    /// Ask the dispatcher to finish in-flight updates and stop polling.
    pub async fn shutdown(self) {
        match self.shutdown.shutdown() {
            Ok(done) => done.await,
            Err(_) => {
                // Dispatcher never got going; nothing to drain.
                self.task.abort();
            }
        }
        let _ = self.task.await;
        info!("Telegram bot stopped");
    }
}

/// Start the Telegram bot in long-polling mode on its own task.
pub fn spawn_bot(bot: Bot, deps: BotDeps) -> BotHandle {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    let mut dispatcher = Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .build();
    let shutdown = dispatcher.shutdown_token();
    let task = tokio::spawn(async move { dispatcher.dispatch().await });

    BotHandle { shutdown, task }
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Help].endpoint(handle_help))
        .branch(case![Command::Alarm(args)].endpoint(handle_alarm))
        .branch(case![Command::Alarms].endpoint(handle_alarms))
        .branch(case![Command::DeleteAlarm(args)].endpoint(handle_delete_alarm))
        .branch(case![Command::Price(args)].endpoint(handle_price))
        .branch(case![Command::Status].endpoint(handle_status));

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users outside a configured allow-list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = deps.allowed_user_ids.is_empty() || deps.allowed_user_ids.contains(&uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

async fn handle_start(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "👋 Hello! The bot is active.\nYou can type /help to see the commands.",
    )
    .await?;
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, help_text()).await?;
    Ok(())
}

async fn handle_alarm(bot: Bot, msg: Message, deps: Arc<BotDeps>, args: String) -> HandlerResult {
    let request = match parse_alarm_args(&args) {
        Ok(request) => request,
        Err(usage) => {
            bot.send_message(msg.chat.id, usage).await?;
            return Ok(());
        }
    };

    let created = deps
        .store
        .create_alarm(
            msg.chat.id.0,
            &request.symbol,
            request.target_price,
            request.condition,
            Platform::Telegram,
        )
        .await;

    let reply = match created {
        Ok(id) => format!(
            "✅ Alarm #{id} added:\n{} {} {}",
            request.symbol, request.condition, request.target_price
        ),
        Err(e) => {
            error!(chat_id = msg.chat.id.0, error = %e, "Error adding alarm");
            "❌ Failed to add alarm. Please try again.".to_string()
        }
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_alarms(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    match deps.store.list_active_alarms_for_owner(msg.chat.id.0).await {
        Ok(alarms) if alarms.is_empty() => {
            bot.send_message(msg.chat.id, "📭 You have no active alarms.").await?;
        }
        Ok(alarms) => {
            bot.send_message(msg.chat.id, format_alarm_list(&alarms))
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
        Err(e) => {
            error!(chat_id = msg.chat.id.0, error = %e, "Error listing alarms");
            bot.send_message(msg.chat.id, "❌ Failed to list alarms.").await?;
        }
    }
    Ok(())
}

async fn handle_delete_alarm(
    bot: Bot,
    msg: Message,
    deps: Arc<BotDeps>,
    args: String,
) -> HandlerResult {
    let id = match parse_alarm_id(&args) {
        Ok(id) => id,
        Err(usage) => {
            bot.send_message(msg.chat.id, usage).await?;
            return Ok(());
        }
    };

    let reply = match deps.store.delete_alarm_if_owned(id, msg.chat.id.0).await {
        Ok(true) => format!("🗑️ Alarm deleted: #{id}"),
        Ok(false) => "❌ No active alarm found with this ID.".to_string(),
        Err(e) => {
            error!(chat_id = msg.chat.id.0, alarm_id = id, error = %e, "Error deleting alarm");
            "❌ Failed to delete alarm. Please try again.".to_string()
        }
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_price(bot: Bot, msg: Message, deps: Arc<BotDeps>, args: String) -> HandlerResult {
    let symbol = match parse_symbol(&args) {
        Ok(symbol) => symbol,
        Err(usage) => {
            bot.send_message(msg.chat.id, usage).await?;
            return Ok(());
        }
    };

    match deps.prices.get_price(&symbol).await {
        Some(price) => {
            bot.send_message(
                msg.chat.id,
                format!("💰 Current price of {symbol}: *{}*", format_usd(price)),
            )
            .parse_mode(ParseMode::Markdown)
            .await?;
        }
        None => {
            bot.send_message(msg.chat.id, format!("❌ Could not retrieve price for {symbol}."))
                .await?;
        }
    }
    Ok(())
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let status = deps.scheduler.status().await;
    let minutes = deps.scheduler.interval().as_secs() / 60;
    let text = format!(
        "Price checker: {status}\n\
         Check interval: {minutes} min"
    );
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

fn help_text() -> String {
    format!(
        "📚 {}\n\n\
         Example: /alarm BTCUSDT 65000 below\n\
         Example: /price ETHUSDT",
        Command::descriptions()
    )
}

fn format_alarm_list(alarms: &[Alarm]) -> String {
    let mut message = String::from("📋 *Your Active Alarms:*\n\n");
    for alarm in alarms {
        let icon = match alarm.condition {
            Condition::Above => "📈",
            Condition::Below => "📉",
        };
        message.push_str(&format!(
            "#{}: {} - {} {icon} ({})\n",
            alarm.id, alarm.symbol, alarm.target_price, alarm.condition
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn alarm(id: i64, symbol: &str, target_price: f64, condition: Condition) -> Alarm {
        Alarm {
            id,
            owner: 42,
            symbol: symbol.into(),
            target_price,
            condition,
            platform: Platform::Telegram,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn alarm_list_shows_each_alarm_with_direction() {
        let text = format_alarm_list(&[
            alarm(3, "BTCUSDT", 70_000.0, Condition::Above),
            alarm(8, "ETHUSDT", 1_800.5, Condition::Below),
        ]);
        assert!(text.starts_with("📋 *Your Active Alarms:*"));
        assert!(text.contains("#3: BTCUSDT - 70000 📈 (above)"));
        assert!(text.contains("#8: ETHUSDT - 1800.5 📉 (below)"));
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for cmd in ["/start", "/help", "/alarm", "/alarms", "/delete_alarm", "/price", "/status"] {
            assert!(help.contains(cmd), "missing {cmd}");
        }
    }

    #[test]
    fn commands_parse_with_arguments() {
        let cmd = Command::parse("/alarm BTCUSDT 70000 above", "alarmbot").unwrap();
        assert!(matches!(cmd, Command::Alarm(args) if args == "BTCUSDT 70000 above"));

        let cmd = Command::parse("/delete_alarm 5", "alarmbot").unwrap();
        assert!(matches!(cmd, Command::DeleteAlarm(args) if args == "5"));
    }
}
