//! Top-level advisor - one message in, one reply out
//!
//! INPUT → LOAD CONTEXT → RESPOND → APPEND TRANSCRIPT → WRITE CONTEXT → REPLY
//!
//! One message per conversation is processed to completion before the next;
//! the calling layer keeps input disabled while a reply is pending. Distinct
//! conversations never share dialogue state.

use crate::error::AdvisorError;
use crate::models::{AgentTag, Conversation, Message, TurnOutcome, TurnReply};
use crate::responder::{Responder, TurnRequest};
use crate::state::StateStore;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Fixed notice when the responder backend fails; the turn degrades instead
/// of erroring out.
const TRANSIENT_FAILURE_PROMPT: &str =
    "I'm having trouble understanding your request right now. Please try again in a moment.";

/// Default artificial reply latency, matching the original advisory UI.
const DEFAULT_REPLY_DELAY_MS: u64 = 1000;

/// Top-level advisor that coordinates one full turn
pub struct LoanAdvisor {
    responder: Arc<dyn Responder>,
    store: Arc<dyn StateStore>,
    reply_delay: Duration,
}

impl LoanAdvisor {
    pub fn new(responder: Arc<dyn Responder>, store: Arc<dyn StateStore>) -> Self {
        Self {
            responder,
            store,
            reply_delay: Duration::ZERO,
        }
    }

    /// Configure the artificial latency inserted before each reply. Tests
    /// leave this at zero.
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Reply delay from `REPLY_DELAY_MS`, defaulting to one second.
    pub fn reply_delay_from_env() -> Duration {
        let ms = std::env::var("REPLY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REPLY_DELAY_MS);
        Duration::from_millis(ms)
    }

    /// Handle one user message for one conversation: load any in-flight
    /// dialogue context, produce the reply, persist transcript and context,
    /// and return the outcome.
    pub async fn handle_turn(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        message_text: &str,
    ) -> Result<TurnOutcome> {
        info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            "Advisor: handling turn"
        );

        let previous_context = self.store.load_context(conversation_id).await?;

        let request = TurnRequest {
            user_id,
            conversation_id,
            message: message_text.to_string(),
            previous_context,
        };

        // Failures degrade to a router reply; the stored context is left
        // untouched so an in-flight dialogue survives a transient fault.
        let (reply, persist_context) = match self.responder.respond(request).await {
            Ok(reply) => (reply, true),
            Err(AdvisorError::RemoteResponderError(e)) => {
                warn!(conversation_id = %conversation_id, "Responder failed, degrading: {}", e);
                let fallback = TurnReply {
                    text: TRANSIENT_FAILURE_PROMPT.to_string(),
                    agent: AgentTag::IntentClassifier,
                    context: None,
                };
                (fallback, false)
            }
            Err(AdvisorError::ClassificationError(e)) => {
                warn!(conversation_id = %conversation_id, "Classification failed, degrading: {}", e);
                let fallback = TurnReply {
                    text: crate::responder::CLARIFY_PROMPT.to_string(),
                    agent: AgentTag::IntentClassifier,
                    context: None,
                };
                (fallback, false)
            }
            Err(e) => return Err(e),
        };

        let mut conversation = self
            .store
            .load_conversation(conversation_id)
            .await?
            .unwrap_or_else(|| Conversation::new(conversation_id, user_id));

        conversation.push(Message::user(message_text));
        conversation.push(Message::agent(reply.text.clone(), reply.agent));
        self.store.save_conversation(&conversation).await?;

        if persist_context {
            match &reply.context {
                Some(ctx) => self.store.save_context(conversation_id, ctx).await?,
                None => self.store.clear_context(conversation_id).await?,
            }
        }

        if !self.reply_delay.is_zero() {
            tokio::time::sleep(self.reply_delay).await;
        }

        Ok(TurnOutcome {
            conversation_id,
            reply_text: reply.text,
            agent_tag: reply.agent,
            updated_context: reply.context,
        })
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoanType, Stage};
    use crate::responder::RuleBasedResponder;
    use crate::state::InMemoryStateStore;
    use async_trait::async_trait;

    fn advisor_with_store() -> (LoanAdvisor, Arc<dyn StateStore>) {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let advisor = LoanAdvisor::new(Arc::new(RuleBasedResponder), store.clone());
        (advisor, store)
    }

    #[tokio::test]
    async fn test_full_eligibility_scenario_across_turns() {
        let (advisor, store) = advisor_with_store();
        let conversation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let outcome = advisor
            .handle_turn(conversation_id, user_id, "Am I eligible for a personal loan?")
            .await
            .unwrap();
        assert_eq!(outcome.agent_tag, AgentTag::LoanEligibilityChecker);
        assert_eq!(
            outcome.updated_context.as_ref().map(|c| c.stage),
            Some(Stage::EmploymentStatus)
        );

        let turns = [
            ("salaried", Stage::MonthlyIncome),
            ("40000", Stage::CreditScore),
            ("700", Stage::ExistingLoans),
            ("no", Stage::LoanAmount),
        ];
        for (message, expected_stage) in turns {
            let outcome = advisor
                .handle_turn(conversation_id, user_id, message)
                .await
                .unwrap();
            assert_eq!(
                outcome.updated_context.as_ref().map(|c| c.stage),
                Some(expected_stage),
                "after message {:?}",
                message
            );
        }

        let final_outcome = advisor
            .handle_turn(conversation_id, user_id, "500000")
            .await
            .unwrap();
        assert!(final_outcome.updated_context.is_none());
        assert!(final_outcome.reply_text.contains("Great news!"));
        assert!(final_outcome.reply_text.contains("₹7,20,000"));

        // Context is gone from the store once the assessment completed.
        assert!(store.load_context(conversation_id).await.unwrap().is_none());

        // Transcript has six user turns and six replies, titled from turn 1.
        let conversation = store
            .load_conversation(conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.message_count(), 12);
        assert_eq!(conversation.title, "Am I eligible for a personal l...");
    }

    #[tokio::test]
    async fn test_low_credit_score_scenario() {
        let (advisor, _) = advisor_with_store();
        let conversation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        for message in [
            "Am I eligible for a personal loan?",
            "salaried",
            "40000",
            "620",
            "no",
        ] {
            advisor
                .handle_turn(conversation_id, user_id, message)
                .await
                .unwrap();
        }

        let outcome = advisor
            .handle_turn(conversation_id, user_id, "500000")
            .await
            .unwrap();
        assert!(outcome
            .reply_text
            .contains("credit score is below the minimum threshold"));
    }

    #[tokio::test]
    async fn test_conversations_do_not_share_dialogue_state() {
        let (advisor, store) = advisor_with_store();
        let user_id = Uuid::new_v4();
        let conv_x = Uuid::new_v4();
        let conv_y = Uuid::new_v4();

        advisor
            .handle_turn(conv_x, user_id, "am i eligible for a home loan")
            .await
            .unwrap();
        advisor.handle_turn(conv_x, user_id, "salaried").await.unwrap();

        // A second conversation runs its own dialogue from scratch.
        advisor
            .handle_turn(conv_y, user_id, "can i get a car loan")
            .await
            .unwrap();

        let ctx_x = store.load_context(conv_x).await.unwrap().unwrap();
        let ctx_y = store.load_context(conv_y).await.unwrap().unwrap();
        assert_eq!(ctx_x.loan_type, LoanType::Home);
        assert_eq!(ctx_x.stage, Stage::MonthlyIncome);
        assert_eq!(ctx_y.loan_type, LoanType::Car);
        assert_eq!(ctx_y.stage, Stage::EmploymentStatus);

        // Reopening X later continues where it left off.
        advisor.handle_turn(conv_x, user_id, "60000").await.unwrap();
        let ctx_x = store.load_context(conv_x).await.unwrap().unwrap();
        assert_eq!(ctx_x.stage, Stage::CreditScore);
        assert_eq!(ctx_x.monthly_income, Some(60000.0));
    }

    #[tokio::test]
    async fn test_unknown_credit_score_flows_to_verdict() {
        let (advisor, _) = advisor_with_store();
        let conversation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        for message in [
            "am i eligible for an education loan",
            "student with a part-time job",
            "20000",
            "I don't know",
            "no",
        ] {
            advisor
                .handle_turn(conversation_id, user_id, message)
                .await
                .unwrap();
        }

        let outcome = advisor
            .handle_turn(conversation_id, user_id, "1000000")
            .await
            .unwrap();
        // maxEmi 10000 × 120 = 1200000, no haircut; requested fits.
        assert!(outcome.reply_text.contains("Great news!"));
        assert!(outcome.reply_text.contains("₹12,00,000"));
    }

    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        async fn respond(&self, _request: TurnRequest) -> Result<TurnReply> {
            Err(AdvisorError::RemoteResponderError("backend down".into()))
        }
    }

    #[tokio::test]
    async fn test_responder_failure_degrades_and_preserves_context() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let conversation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        // Seed an in-flight dialogue, then fail the next turn.
        let seeded = crate::models::DialogueContext {
            stage: Stage::CreditScore,
            monthly_income: Some(40000.0),
            employment_status: Some("salaried".into()),
            ..crate::models::DialogueContext::start(LoanType::Personal)
        };
        store.save_context(conversation_id, &seeded).await.unwrap();

        let advisor = LoanAdvisor::new(Arc::new(FailingResponder), store.clone());
        let outcome = advisor
            .handle_turn(conversation_id, user_id, "700")
            .await
            .unwrap();

        assert_eq!(outcome.agent_tag, AgentTag::IntentClassifier);
        assert!(outcome.reply_text.contains("having trouble"));

        // The suspended dialogue is still intact.
        let ctx = store.load_context(conversation_id).await.unwrap().unwrap();
        assert_eq!(ctx.stage, Stage::CreditScore);
        assert_eq!(ctx.credit_score, None);
    }
}
