use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode, User, UserId};
use tracing::{debug, error, info, warn};

use crate::monitor::{Delivery, Monitor, Verdict};
use crate::parser::ClassificationResult;
use crate::platform::IncomingMessage;

fn display_name(user: &User) -> String {
    match user.last_name.as_deref() {
        Some(last) if !last.is_empty() => format!("{} {}", user.first_name, last),
        _ => user.first_name.clone(),
    }
}

/// Map a Telegram message into the monitor's view of it. Media captions
/// count as text; messages without either are skipped.
fn to_incoming(msg: &Message) -> Option<IncomingMessage> {
    let text = msg.text().or_else(|| msg.caption())?.to_string();
    let sender = msg.from.as_ref();

    Some(IncomingMessage {
        chat_id: msg.chat.id.0,
        chat_username: msg.chat.username().map(str::to_string),
        message_id: msg.id.0,
        topic_id: if msg.is_topic_message {
            msg.thread_id.map(|thread| thread.0 .0)
        } else {
            None
        },
        sender_id: sender.map(|user| user.id.0),
        sender_name: sender
            .map(display_name)
            .unwrap_or_else(|| "Unknown Sender".to_string()),
        text,
    })
}

/// Run the Telegram listener until the dispatcher stops
pub async fn run(monitor: Arc<Monitor>, bot: Bot) -> Result<()> {
    let target_group_id = monitor.target_group_id();

    info!("Listening to group {}", target_group_id);

    let handler = Update::filter_message()
        .filter(move |msg: Message| msg.chat.id.0 == target_group_id)
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![monitor])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, monitor: Arc<Monitor>) -> ResponseResult<()> {
    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    if let Verdict::Offer { result, delivery } = monitor.process_message(&incoming) {
        deliver(&bot, &monitor, &incoming, &result, delivery).await;
    }

    Ok(())
}

async fn deliver(
    bot: &Bot,
    monitor: &Monitor,
    incoming: &IncomingMessage,
    result: &ClassificationResult,
    delivery: Delivery,
) {
    match delivery {
        Delivery::AutoReply { user_id, text } => {
            match bot.send_message(ChatId::from(UserId(user_id)), text).await {
                Ok(_) => {
                    info!(
                        "Auto-response sent to {} ({}) for message {}",
                        incoming.sender_name, user_id, incoming.message_id
                    );
                }
                Err(e) => {
                    warn!(
                        "Failed to send auto-response to {} ({}): {}, notifying operator instead",
                        incoming.sender_name, user_id, e
                    );
                    let text = monitor.notification(incoming, result);
                    notify(bot, monitor.notify_user_id(), text, incoming.message_id).await;
                }
            }
        }
        Delivery::Notify { user_id, text } => {
            notify(bot, user_id, text, incoming.message_id).await;
        }
    }
}

async fn notify(bot: &Bot, user_id: u64, text: String, message_id: i32) {
    match bot
        .send_message(ChatId::from(UserId(user_id)), text)
        .parse_mode(ParseMode::Html)
        .await
    {
        Ok(_) => info!("Notification sent to {} for message {}", user_id, message_id),
        Err(e) => error!("Failed to send notification to {}: {}", user_id, e),
    }
}
