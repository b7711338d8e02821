//! Responder capability
//!
//! One async seam produces the advisory reply for a turn. The local
//! rule-based implementation (classifier + sub-agents) and the remote
//! advisory backend are interchangeable; which one runs is picked from the
//! environment at startup. Uses a long-lived reqwest::Client for pooling.

use crate::classifier::{Intent, IntentClassifier};
use crate::coach::{FinancialLiteracyCoach, LoanApplicationGuide};
use crate::eligibility::EligibilityChecker;
use crate::error::AdvisorError;
use crate::models::{AgentTag, DialogueContext, LoanType, TurnReply};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

const GREETING_PROMPT: &str = "Hello! I'm your AI Loan Advisor. I can help you check loan eligibility, guide you through the application process, or explain financial concepts. What type of loan are you interested in?";

pub(crate) const CLARIFY_PROMPT: &str = "I'm here to help with your loan-related questions. Are you looking for information about loan eligibility, the application process, or understanding financial concepts?";

/// Input for one advisory turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub message: String,
    pub previous_context: Option<DialogueContext>,
}

/// Trait for producing one advisory reply per user message.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: TurnRequest) -> Result<TurnReply>;
}

/// Local rule-based responder: routes to the eligibility checker, the
/// application guide, the literacy coach, or answers as the router itself.
pub struct RuleBasedResponder;

impl RuleBasedResponder {
    fn clarify_loan_type(loan_type: LoanType) -> TurnReply {
        TurnReply {
            text: format!(
                "I see you're interested in a {} loan. Would you like to check your eligibility, learn about the application process, or understand the financial aspects?",
                loan_type
            ),
            agent: AgentTag::IntentClassifier,
            context: None,
        }
    }

    fn router_reply(text: &str) -> TurnReply {
        TurnReply {
            text: text.to_string(),
            agent: AgentTag::IntentClassifier,
            context: None,
        }
    }
}

#[async_trait]
impl Responder for RuleBasedResponder {
    async fn respond(&self, request: TurnRequest) -> Result<TurnReply> {
        // An in-flight eligibility sub-dialogue always overrides fresh
        // classification, whatever the message says.
        if let Some(ctx) = request.previous_context {
            if ctx.agent == AgentTag::LoanEligibilityChecker && !ctx.stage.is_terminal() {
                return Ok(EligibilityChecker::advance(ctx, &request.message));
            }
            // Terminal or foreign context: classify from scratch.
        }

        let intent = IntentClassifier::classify(&request.message);
        info!(conversation_id = %request.conversation_id, intent = ?intent, "intent classified");

        let reply = match intent {
            Intent::CheckEligibility(loan_type) => EligibilityChecker::begin(loan_type),
            Intent::ApplicationGuide(loan_type) => LoanApplicationGuide::guide(loan_type),
            Intent::ClarifyLoanType(loan_type) => Self::clarify_loan_type(loan_type),
            Intent::FinancialLiteracy(topic) => FinancialLiteracyCoach::explain(topic),
            Intent::Greeting => Self::router_reply(GREETING_PROMPT),
            Intent::Clarify => Self::router_reply(CLARIFY_PROMPT),
        };

        Ok(reply)
    }
}

//
// ================= Remote backend =================
//

#[derive(Debug, Serialize)]
struct RemoteRequest<'a> {
    user_id: Uuid,
    conversation_id: Uuid,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct RemoteReply {
    response: String,
    agent_type: String,
}

/// Remote advisory backend: `POST {base_url}/api/chat` with
/// `{user_id, conversation_id, message}`, answering
/// `{response, agent_type}`. Dialogue state lives server-side, so no
/// context comes back.
pub struct RemoteResponder {
    client: Client,
    base_url: String,
}

impl RemoteResponder {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Responder for RemoteResponder {
    async fn respond(&self, request: TurnRequest) -> Result<TurnReply> {
        let url = format!("{}/api/chat", self.base_url);
        let body = RemoteRequest {
            user_id: request.user_id,
            conversation_id: request.conversation_id,
            message: &request.message,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Remote responder request failed: {}", e);
                AdvisorError::RemoteResponderError(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Remote responder returned {}: {}", status, text);
            return Err(AdvisorError::RemoteResponderError(format!(
                "backend returned {}: {}",
                status, text
            )));
        }

        let reply: RemoteReply = response.json().await.map_err(|e| {
            error!("Failed to parse remote responder reply: {}", e);
            AdvisorError::RemoteResponderError(format!("invalid reply: {}", e))
        })?;

        Ok(TurnReply {
            text: reply.response,
            agent: agent_from_remote_type(&reply.agent_type),
            context: None,
        })
    }
}

/// Map the backend's agent_type string onto our tags; anything unknown is
/// attributed to the router rather than failing the turn.
fn agent_from_remote_type(agent_type: &str) -> AgentTag {
    match agent_type {
        "loan_eligibility" => AgentTag::LoanEligibilityChecker,
        "loan_application" => AgentTag::LoanApplicationGuide,
        "financial_literacy" => AgentTag::FinancialLiteracyCoach,
        _ => AgentTag::IntentClassifier,
    }
}

/// Pick the responder from the environment: a configured
/// `REMOTE_RESPONDER_URL` selects the remote backend, otherwise the local
/// rules run.
pub fn responder_from_env() -> Arc<dyn Responder> {
    match env::var("REMOTE_RESPONDER_URL") {
        Ok(url) if !url.trim().is_empty() => {
            info!("Responder backend: remote ({})", url);
            Arc::new(RemoteResponder::new(url))
        }
        _ => {
            info!("Responder backend: rule-based");
            Arc::new(RuleBasedResponder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    fn request(message: &str, context: Option<DialogueContext>) -> TurnRequest {
        TurnRequest {
            user_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            message: message.to_string(),
            previous_context: context,
        }
    }

    #[tokio::test]
    async fn test_fresh_eligibility_message_starts_dialogue() {
        let reply = RuleBasedResponder
            .respond(request("Am I eligible for a personal loan?", None))
            .await
            .unwrap();

        assert_eq!(reply.agent, AgentTag::LoanEligibilityChecker);
        let ctx = reply.context.expect("dialogue context created");
        assert_eq!(ctx.stage, Stage::EmploymentStatus);
        assert_eq!(ctx.loan_type, LoanType::Personal);
    }

    #[tokio::test]
    async fn test_in_flight_dialogue_overrides_classification() {
        let mut ctx = DialogueContext::start(LoanType::Personal);
        ctx.stage = Stage::MonthlyIncome;
        ctx.employment_status = Some("salaried".to_string());

        // The message mentions a loan type and an eligibility term, but the
        // open sub-dialogue must consume it as the income answer.
        let reply = RuleBasedResponder
            .respond(request("40000, and am i eligible for a home loan?", Some(ctx)))
            .await
            .unwrap();

        let ctx = reply.context.expect("dialogue continues");
        assert_eq!(ctx.stage, Stage::CreditScore);
        assert_eq!(ctx.loan_type, LoanType::Personal);
    }

    #[tokio::test]
    async fn test_terminal_context_is_classified_fresh() {
        let mut ctx = DialogueContext::start(LoanType::Personal);
        ctx.stage = Stage::Assessment;

        let reply = RuleBasedResponder
            .respond(request("what is a credit score?", Some(ctx)))
            .await
            .unwrap();

        assert_eq!(reply.agent, AgentTag::FinancialLiteracyCoach);
        assert!(reply.context.is_none());
    }

    #[tokio::test]
    async fn test_greeting_and_clarify_come_from_the_router() {
        let greeting = RuleBasedResponder
            .respond(request("hello", None))
            .await
            .unwrap();
        assert_eq!(greeting.agent, AgentTag::IntentClassifier);
        assert!(greeting.text.contains("AI Loan Advisor"));

        let clarify = RuleBasedResponder
            .respond(request("tell me something about the weather today", None))
            .await
            .unwrap();
        assert_eq!(clarify.agent, AgentTag::IntentClassifier);
        assert!(clarify.text.contains("loan-related questions"));
    }

    #[test]
    fn test_remote_agent_type_mapping() {
        assert_eq!(
            agent_from_remote_type("loan_eligibility"),
            AgentTag::LoanEligibilityChecker
        );
        assert_eq!(
            agent_from_remote_type("loan_application"),
            AgentTag::LoanApplicationGuide
        );
        assert_eq!(
            agent_from_remote_type("financial_literacy"),
            AgentTag::FinancialLiteracyCoach
        );
        assert_eq!(
            agent_from_remote_type("intent_classifier"),
            AgentTag::IntentClassifier
        );
        assert_eq!(agent_from_remote_type("???"), AgentTag::IntentClassifier);
    }
}
