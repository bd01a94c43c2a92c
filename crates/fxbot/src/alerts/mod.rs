//! Scheduled rate alerts
//!
//! Two kinds of subscription exist. Daily alerts send a chart report at a
//! fixed local time every day. Conditional alerts poll the latest rate and
//! notify when it climbs above a target and beats the stored high.

pub mod conditional;
pub mod daily;
pub mod scheduler;

pub use conditional::{ConditionalAlert, TickOutcome, in_active_window, reminder_due};
pub use daily::{DailyReport, DailySchedule};
pub use scheduler::AlertScheduler;

use crate::models::{ChatId, CurrencyPair};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What triggers an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlertKind {
    /// Report every day at a local time
    Daily { at: NaiveTime },
    /// Notify when the rate reaches `target`
    Conditional { target: f64 },
}

/// A registered alert for one chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSubscription {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub pair: CurrencyPair,
    pub kind: AlertKind,
}

impl AlertSubscription {
    pub fn new(chat_id: ChatId, pair: CurrencyPair, kind: AlertKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            pair,
            kind,
        }
    }
}
