//! Core data models for the loan advisory agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// First user message is truncated to this many characters for the title.
const TITLE_MAX_CHARS: usize = 30;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// Which sub-agent produced a reply (or owns an in-flight dialogue).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentTag {
    IntentClassifier,
    LoanEligibilityChecker,
    LoanApplicationGuide,
    FinancialLiteracyCoach,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Business,
    Home,
    Personal,
    Education,
    Car,
    Mortgage,
}

impl LoanType {
    /// Scan order for intent classification. First token found in this
    /// order wins, regardless of position in the message.
    pub const SCAN_ORDER: &'static [LoanType] = &[
        LoanType::Business,
        LoanType::Home,
        LoanType::Personal,
        LoanType::Education,
        LoanType::Car,
        LoanType::Mortgage,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            LoanType::Business => "business",
            LoanType::Home => "home",
            LoanType::Personal => "personal",
            LoanType::Education => "education",
            LoanType::Car => "car",
            LoanType::Mortgage => "mortgage",
        }
    }
}

/// Position in the eligibility checker's fixed slot-collection sequence.
/// Transitions only ever move forward in declaration order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    EmploymentStatus,
    MonthlyIncome,
    CreditScore,
    ExistingLoans,
    LoanAmount,
    Assessment,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Assessment)
    }
}

/// Credit score slot: a number the user reported, or the "unknown" sentinel
/// when they don't know it (or the answer had no parsable number in it).
/// On the wire this is either a number or the string `"unknown"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "CreditScoreWire", into = "CreditScoreWire")]
pub enum CreditScore {
    Known(u32),
    Unknown,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CreditScoreWire {
    Number(u32),
    Text(String),
}

impl From<CreditScoreWire> for CreditScore {
    fn from(wire: CreditScoreWire) -> Self {
        match wire {
            CreditScoreWire::Number(n) => CreditScore::Known(n),
            CreditScoreWire::Text(_) => CreditScore::Unknown,
        }
    }
}

impl From<CreditScore> for CreditScoreWire {
    fn from(score: CreditScore) -> Self {
        match score {
            CreditScore::Known(n) => CreditScoreWire::Number(n),
            CreditScore::Unknown => CreditScoreWire::Text("unknown".to_string()),
        }
    }
}

impl CreditScore {
    pub fn is_known(&self) -> bool {
        matches!(self, CreditScore::Known(_))
    }
}

//
// ================= Conversation =================
//

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_tag: Option<AgentTag>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            agent_tag: None,
        }
    }

    pub fn agent(content: impl Into<String>, tag: AgentTag) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            sender: Sender::Agent,
            timestamp: Utc::now(),
            agent_tag: Some(tag),
        }
    }
}

/// An append-only, chronological conversation owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_agent: Option<AgentTag>,
}

impl Conversation {
    pub fn new(id: Uuid, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            title: "New Conversation".to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            current_agent: None,
        }
    }

    /// Append a message. The first user message also sets the title.
    pub fn push(&mut self, message: Message) {
        if message.sender == Sender::User
            && !self.messages.iter().any(|m| m.sender == Sender::User)
        {
            self.title = derive_title(&message.content);
        }
        if let Some(tag) = message.agent_tag {
            self.current_agent = Some(tag);
        }
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Title is the first user message, truncated to 30 characters + ellipsis.
fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", truncated)
    } else {
        content.to_string()
    }
}

//
// ================= Dialogue Context =================
//

/// State of an in-flight eligibility sub-dialogue for one conversation.
/// Exists only between the first eligibility question and the terminal
/// assessment; keyed by conversation id in the store, never global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DialogueContext {
    pub agent: AgentTag,
    pub loan_type: LoanType,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<CreditScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_existing_loans: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_loan_amount: Option<f64>,
}

impl DialogueContext {
    /// Fresh context at the start of an eligibility check.
    pub fn start(loan_type: LoanType) -> Self {
        Self {
            agent: AgentTag::LoanEligibilityChecker,
            loan_type,
            stage: Stage::EmploymentStatus,
            employment_status: None,
            monthly_income: None,
            credit_score: None,
            has_existing_loans: None,
            requested_loan_amount: None,
        }
    }

    /// All slots, available once every collection stage has run.
    pub fn collected(&self) -> Option<CollectedSlots> {
        Some(CollectedSlots {
            loan_type: self.loan_type,
            employment_status: self.employment_status.clone()?,
            monthly_income: self.monthly_income?,
            credit_score: self.credit_score?,
            has_existing_loans: self.has_existing_loans?,
            requested_loan_amount: self.requested_loan_amount?,
        })
    }
}

/// Fully collected slot values, ready for the decision engine.
#[derive(Debug, Clone)]
pub struct CollectedSlots {
    pub loan_type: LoanType,
    pub employment_status: String,
    pub monthly_income: f64,
    pub credit_score: CreditScore,
    pub has_existing_loans: bool,
    pub requested_loan_amount: f64,
}

//
// ================= Eligibility Result =================
//

/// Verdict of the decision engine. Computed fresh each time, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub is_eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_loan_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub suggested_actions: Vec<String>,
}

//
// ================= Turn I/O =================
//

/// One sub-agent reply before the advisor persists anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub text: String,
    pub agent: AgentTag,
    /// Context to persist for the next turn; `None` clears any stored one.
    pub context: Option<DialogueContext>,
}

/// Result of a full `handle_turn` round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub conversation_id: Uuid,
    pub reply_text: String,
    pub agent_tag: AgentTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_context: Option<DialogueContext>,
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl fmt::Display for AgentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentTag::IntentClassifier => "IntentClassifier",
            AgentTag::LoanEligibilityChecker => "LoanEligibilityChecker",
            AgentTag::LoanApplicationGuide => "LoanApplicationGuide",
            AgentTag::FinancialLiteracyCoach => "FinancialLiteracyCoach",
        };
        write!(f, "{}", s)
    }
}
