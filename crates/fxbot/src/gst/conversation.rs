//! Multi-turn calculator conversation keyed by user

use super::calculator::{Calculator, Direction, ReceiptType, parse_cost, parse_service_charge};
use crate::config::CalculatorConfig;
use crate::interface::{BotResponse, SessionManager};
use crate::models::UserId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Conversation step awaiting user input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationState {
    ChooseReceiptType,
    ChooseDirection,
    SetCost,
    SetServiceChargeRate,
    DisplayResult,
    End,
}

/// Answers collected so far for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstSession {
    pub state: ConversationState,
    pub receipt_type: Option<ReceiptType>,
    pub direction: Option<Direction>,
    pub cost: Option<f64>,
    pub svc_charge_rate: Option<f64>,
}

impl Default for GstSession {
    fn default() -> Self {
        Self {
            state: ConversationState::ChooseReceiptType,
            receipt_type: None,
            direction: None,
            cost: None,
            svc_charge_rate: None,
        }
    }
}

/// Result of feeding one message to a session
enum Step {
    Continue(GstSession, BotResponse),
    Finished(BotResponse),
}

/// Drives the calculator conversation for every user
#[derive(Clone)]
pub struct GstConversation {
    sessions: SessionManager<GstSession>,
    config: CalculatorConfig,
}

impl GstConversation {
    pub fn new(config: CalculatorConfig) -> Self {
        Self {
            sessions: SessionManager::new(config.session_ttl),
            config,
        }
    }

    /// Begin (or restart) a conversation for `user_id`
    pub async fn start(&self, user_id: UserId) -> BotResponse {
        debug!(user_id, "Starting GST conversation");
        self.sessions.set(user_id, GstSession::default()).await;
        receipt_type_prompt()
    }

    /// Whether `user_id` is mid-conversation
    pub async fn is_active(&self, user_id: UserId) -> bool {
        self.sessions.get(user_id).await.is_some()
    }

    /// Feed a message to the user's conversation, `None` when there is none
    ///
    /// The step runs under the session lock, so two messages from one user
    /// never read the same state.
    pub async fn handle(&self, user_id: UserId, text: &str) -> Option<BotResponse> {
        self.sessions
            .update(user_id, |session| match self.advance(session, text) {
                Step::Continue(next, reply) => {
                    debug!(user_id, state = ?next.state, "GST conversation advanced");
                    (Some(next), reply)
                }
                Step::Finished(reply) => {
                    debug!(user_id, "GST conversation finished");
                    (None, reply)
                }
            })
            .await
    }

    /// End the user's conversation
    pub async fn cancel(&self, user_id: UserId) -> BotResponse {
        if self.sessions.delete(user_id).await {
            BotResponse::text("GST calculation cancelled.")
        } else {
            BotResponse::text("There is no calculation to cancel.")
        }
    }

    /// Drop idle sessions
    pub async fn cleanup_expired(&self) -> usize {
        self.sessions.cleanup_expired().await
    }

    fn advance(&self, mut session: GstSession, text: &str) -> Step {
        match session.state {
            ConversationState::ChooseReceiptType => match text.parse::<ReceiptType>() {
                Ok(receipt_type) => {
                    session.receipt_type = Some(receipt_type);
                    session.state = ConversationState::ChooseDirection;
                    Step::Continue(session, direction_prompt())
                }
                Err(_) => Step::Continue(session, receipt_type_prompt()),
            },
            ConversationState::ChooseDirection => match text.parse::<Direction>() {
                Ok(direction) => {
                    session.direction = Some(direction);
                    session.state = ConversationState::SetCost;
                    Step::Continue(session, cost_prompt(direction))
                }
                Err(_) => Step::Continue(session, direction_prompt()),
            },
            ConversationState::SetCost => match parse_cost(text) {
                Ok(cost) => {
                    session.cost = Some(cost);
                    let needs_rate = session
                        .receipt_type
                        .is_some_and(ReceiptType::has_service_charge);
                    if needs_rate {
                        session.state = ConversationState::SetServiceChargeRate;
                        Step::Continue(session, self.service_charge_prompt())
                    } else {
                        session.state = ConversationState::DisplayResult;
                        self.finish(&session)
                    }
                }
                Err(e) => Step::Continue(session, BotResponse::error(e.user_message())),
            },
            ConversationState::SetServiceChargeRate => {
                match parse_service_charge(text, self.config.svc_charge_rate) {
                    Ok(rate) => {
                        session.svc_charge_rate = Some(rate);
                        session.state = ConversationState::DisplayResult;
                        self.finish(&session)
                    }
                    Err(e) => Step::Continue(
                        session,
                        BotResponse::error(e.user_message()).with_option("default"),
                    ),
                }
            }
            ConversationState::DisplayResult | ConversationState::End => self.finish(&session),
        }
    }

    fn finish(&self, session: &GstSession) -> Step {
        let (Some(receipt_type), Some(direction), Some(cost)) =
            (session.receipt_type, session.direction, session.cost)
        else {
            return Step::Finished(BotResponse::error(
                "The calculation was incomplete, please /start_gst again.",
            ));
        };

        let calculator = Calculator::new(
            receipt_type,
            direction,
            self.config.gst_rate,
            session.svc_charge_rate.unwrap_or(self.config.svc_charge_rate),
        );
        let result = calculator.calculate(cost);
        Step::Finished(BotResponse::text(format_result(&calculator, cost, result)))
    }

    fn service_charge_prompt(&self) -> BotResponse {
        BotResponse::text(format!(
            "What is the service charge in percent? Send \"default\" to use {:.0}%.",
            self.config.svc_charge_rate * 100.0
        ))
        .with_option("default")
    }
}

fn receipt_type_prompt() -> BotResponse {
    ReceiptType::ALL.into_iter().fold(
        BotResponse::text("What charges are on the receipt? Send /cancel to stop."),
        |response, t| response.with_option(t.label()),
    )
}

fn direction_prompt() -> BotResponse {
    Direction::ALL.into_iter().fold(
        BotResponse::text(
            "Forwards works out the charge from a base cost. Reverse works back from the charge. Which one?",
        ),
        |response, d| response.with_option(d.label()),
    )
}

fn cost_prompt(direction: Direction) -> BotResponse {
    match direction {
        Direction::Forwards => BotResponse::text("Enter the cost before charges:"),
        Direction::Reverse => BotResponse::text("Enter the charge amount on the receipt:"),
    }
}

fn format_result(calculator: &Calculator, cost: f64, result: f64) -> String {
    let mut lines = vec![format!(
        "{} ({})",
        calculator.receipt_type.label(),
        calculator.direction.label()
    )];
    lines.push(format!("GST rate: {:.2}%", calculator.gst_rate * 100.0));
    if calculator.receipt_type.has_service_charge() {
        lines.push(format!(
            "Service charge: {:.2}%",
            calculator.svc_charge_rate * 100.0
        ));
    }
    lines.push(format!("Input: {cost:.2}"));
    lines.push(format!("Result: {result:.2}"));
    lines.join("\n")
}
