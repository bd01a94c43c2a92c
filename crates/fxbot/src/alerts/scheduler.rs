//! Background tasks for alert subscriptions

use super::conditional::{ConditionalAlert, TickOutcome};
use super::daily::{DailyReport, DailySchedule};
use super::{AlertKind, AlertSubscription};
use crate::api::{RateProvider, validate_pair};
use crate::config::AlertConfig;
use crate::error::{BotError, Result};
use crate::interface::{BotResponse, ChatTransport};
use crate::models::{ChatId, CurrencyPair};
use crate::store::RateStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

/// Source of wall-clock time for alert decisions
type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Dependencies shared by every alert task
struct AlertContext {
    provider: Arc<dyn RateProvider>,
    store: Arc<dyn RateStore>,
    transport: Arc<dyn ChatTransport>,
    config: AlertConfig,
    clock: Clock,
}

impl AlertContext {
    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    async fn deliver(&self, chat_id: ChatId, response: BotResponse) {
        if let Err(e) = self.transport.send(chat_id, response).await {
            warn!(chat_id, error = %e, "Failed to deliver alert");
        }
    }
}

struct AlertJob {
    subscription: AlertSubscription,
    handle: JoinHandle<()>,
}

/// Owns one tokio task per subscription
pub struct AlertScheduler {
    context: Arc<AlertContext>,
    jobs: Mutex<HashMap<ChatId, Vec<AlertJob>>>,
}

impl AlertScheduler {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        store: Arc<dyn RateStore>,
        transport: Arc<dyn ChatTransport>,
        config: AlertConfig,
    ) -> Self {
        Self::with_clock(provider, store, transport, config, Arc::new(Utc::now))
    }

    fn with_clock(
        provider: Arc<dyn RateProvider>,
        store: Arc<dyn RateStore>,
        transport: Arc<dyn ChatTransport>,
        config: AlertConfig,
        clock: Clock,
    ) -> Self {
        Self {
            context: Arc::new(AlertContext {
                provider,
                store,
                transport,
                config,
                clock,
            }),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a report for `pair` every day at `schedule`
    pub async fn add_daily(
        &self,
        chat_id: ChatId,
        pair: CurrencyPair,
        schedule: DailySchedule,
    ) -> Result<AlertSubscription> {
        validate_pair(self.context.provider.as_ref(), &pair).await?;
        schedule.schedule()?;

        let subscription =
            AlertSubscription::new(chat_id, pair, AlertKind::Daily { at: schedule.at });
        let handle = tokio::spawn(run_daily(
            Arc::clone(&self.context),
            subscription.clone(),
            schedule,
        ));

        info!(chat_id, pair = %subscription.pair, at = %schedule.at, "Daily alert registered");
        self.register(subscription.clone(), handle).await;
        Ok(subscription)
    }

    /// Register a poll of `pair` that fires once the rate reaches `target`
    pub async fn add_conditional(
        &self,
        chat_id: ChatId,
        pair: CurrencyPair,
        target: f64,
    ) -> Result<AlertSubscription> {
        if !target.is_finite() || target <= 0.0 {
            return Err(BotError::InvalidNumericInput(
                "Target rate must be a positive number.".to_string(),
            ));
        }
        validate_pair(self.context.provider.as_ref(), &pair).await?;

        let subscription =
            AlertSubscription::new(chat_id, pair.clone(), AlertKind::Conditional { target });
        let alert = ConditionalAlert::new(pair, target, self.context.config.clone());
        let handle = tokio::spawn(run_conditional(
            Arc::clone(&self.context),
            chat_id,
            alert,
        ));

        info!(chat_id, pair = %subscription.pair, target, "Conditional alert registered");
        self.register(subscription.clone(), handle).await;
        Ok(subscription)
    }

    /// Subscriptions registered for `chat_id`
    pub async fn subscriptions(&self, chat_id: ChatId) -> Vec<AlertSubscription> {
        let jobs = self.jobs.lock().await;
        jobs.get(&chat_id)
            .map(|list| list.iter().map(|j| j.subscription.clone()).collect())
            .unwrap_or_default()
    }

    /// Abort every alert task, returning how many were stopped
    pub async fn shutdown(&self) -> usize {
        let mut jobs = self.jobs.lock().await;
        let mut stopped = 0;
        for (_, list) in jobs.drain() {
            for job in list {
                job.handle.abort();
                stopped += 1;
            }
        }
        info!(stopped, "Alert scheduler shut down");
        stopped
    }

    async fn register(&self, subscription: AlertSubscription, handle: JoinHandle<()>) {
        let mut jobs = self.jobs.lock().await;
        jobs.entry(subscription.chat_id).or_default().push(AlertJob {
            subscription,
            handle,
        });
    }
}

async fn run_daily(
    context: Arc<AlertContext>,
    subscription: AlertSubscription,
    schedule: DailySchedule,
) {
    let offset = context.config.local_offset();
    // Fire times are taken from this cursor, not from the clock, so a wake-up
    // slightly before the fire time cannot repeat it
    let mut cursor = context.now().with_timezone(&offset);

    loop {
        let next = match schedule.next_after(&cursor) {
            Ok(Some(next)) => next,
            Ok(None) => {
                warn!(id = %subscription.id, "Daily schedule has no upcoming time");
                return;
            }
            Err(e) => {
                warn!(id = %subscription.id, error = %e, "Daily schedule is invalid");
                return;
            }
        };
        let wait = (next.with_timezone(&Utc) - context.now())
            .to_std()
            .unwrap_or_default();
        debug!(id = %subscription.id, %next, "Waiting for daily alert");
        sleep(wait).await;
        cursor = next;

        let response = match DailyReport::build(
            context.provider.as_ref(),
            &subscription.pair,
            &context.config,
            next.date_naive(),
        )
        .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(pair = %subscription.pair, error = %e, "Daily report failed");
                BotResponse::error(format!(
                    "Could not fetch rates for {} right now. I will try again tomorrow.",
                    subscription.pair
                ))
            }
        };
        context.deliver(subscription.chat_id, response).await;
    }
}

async fn run_conditional(context: Arc<AlertContext>, chat_id: ChatId, alert: ConditionalAlert) {
    let offset = context.config.local_offset();
    let mut ticker = interval(context.config.check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let now = context.now().with_timezone(&offset);

        match alert
            .evaluate(context.provider.as_ref(), context.store.as_ref(), now)
            .await
        {
            Ok(TickOutcome::Persisted {
                rate,
                notified: true,
            }) => {
                context
                    .deliver(chat_id, BotResponse::text(alert.notification(rate)))
                    .await;
            }
            Ok(outcome) => debug!(pair = %alert.pair, ?outcome, "Conditional tick"),
            Err(e) => warn!(pair = %alert.pair, error = %e, "Conditional tick failed"),
        }
    }
}
