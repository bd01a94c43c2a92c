//! Per-chat message queues
//!
//! Every chat gets one worker task fed by an unbounded channel, so messages
//! from the same chat are answered one at a time and in arrival order while
//! different chats proceed in parallel. A worker that sits idle removes its
//! queue and exits; the next message for that chat starts a fresh one.

use crate::bot::RateBot;
use crate::interface::{ChatTransport, Message};
use crate::models::ChatId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Idle time after which a chat worker exits
const WORKER_IDLE: Duration = Duration::from_secs(300);

type Queues = Arc<Mutex<HashMap<ChatId, UnboundedSender<Message>>>>;

/// Routes inbound messages to their chat's worker
#[derive(Clone)]
pub struct ChatDispatcher {
    bot: RateBot,
    transport: Arc<dyn ChatTransport>,
    queues: Queues,
}

impl ChatDispatcher {
    pub fn new(bot: RateBot, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            bot,
            transport,
            queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Queue `message` behind earlier messages of the same chat
    pub async fn dispatch(&self, message: Message) {
        let chat_id = message.chat_id;
        let mut queues = self.queues.lock().await;

        let message = match queues.get(&chat_id) {
            Some(sender) => match sender.send(message) {
                Ok(()) => return,
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let sender = self.spawn_worker(chat_id);
        if sender.send(message).is_err() {
            warn!(chat_id, "Chat worker stopped before its first message");
        }
        queues.insert(chat_id, sender);
    }

    fn spawn_worker(&self, chat_id: ChatId) -> UnboundedSender<Message> {
        let (sender, receiver) = mpsc::unbounded_channel();
        debug!(chat_id, "Starting chat worker");
        tokio::spawn(run_worker(
            chat_id,
            receiver,
            self.bot.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.queues),
        ));
        sender
    }
}

async fn run_worker(
    chat_id: ChatId,
    mut receiver: UnboundedReceiver<Message>,
    bot: RateBot,
    transport: Arc<dyn ChatTransport>,
    queues: Queues,
) {
    loop {
        match tokio::time::timeout(WORKER_IDLE, receiver.recv()).await {
            Ok(Some(message)) => handle_message(&bot, transport.as_ref(), &message).await,
            Ok(None) => return,
            Err(_) => {
                // Senders only push while holding this lock, so an empty
                // queue here stays empty
                let mut queues = queues.lock().await;
                if receiver.is_empty() {
                    queues.remove(&chat_id);
                    debug!(chat_id, "Chat worker idle, exiting");
                    return;
                }
            }
        }
    }
}

/// Run the bot on one message and deliver any reply
pub async fn handle_message(bot: &RateBot, transport: &dyn ChatTransport, message: &Message) {
    let Some(reply) = bot.handle(message).await else {
        return;
    };
    if let Err(e) = transport.send(message.chat_id, reply).await {
        warn!(chat_id = message.chat_id, error = %e, "Failed to send reply");
    }
}
