//! Loan Advisory Agent
//!
//! A conversational loan advisor: an intent classifier routes each user
//! message to an eligibility checker (multi-turn slot-filling dialogue), an
//! application guide, or a financial literacy coach. Dialogue state and
//! conversation transcripts persist per conversation, in memory or in
//! Postgres, and the whole advisor is exposed over a REST API.

pub mod agent;
pub mod api;
pub mod applications;
pub mod classifier;
pub mod coach;
pub mod decision;
pub mod eligibility;
pub mod error;
pub mod formatter;
pub mod models;
pub mod responder;
pub mod state;

pub use agent::LoanAdvisor;
pub use classifier::{Intent, IntentClassifier};
pub use error::{AdvisorError, Result};
pub use models::{
    AgentTag, Conversation, CreditScore, DialogueContext, LoanType, Message, Sender, Stage,
    TurnOutcome,
};
pub use responder::{Responder, RuleBasedResponder, TurnRequest};
pub use state::{InMemoryStateStore, StateStore};
