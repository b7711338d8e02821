//! Stateless informational sub-agents
//!
//! Single-turn responders: the Financial Literacy Coach answers concept
//! questions with canned explanations, the Loan Application Guide opens the
//! application walkthrough. Neither holds dialogue state.

use crate::classifier::LiteracyTopic;
use crate::models::{AgentTag, LoanType, TurnReply};

const CREDIT_SCORE_EXPLANATION: &str = "A credit score is a number that represents your creditworthiness. It ranges from 300 to 900 in India, with higher scores indicating better credit health. Would you like to know how to improve your credit score?";

const INTEREST_EXPLANATION: &str = "Interest is the cost of borrowing money, typically expressed as an annual percentage rate (APR). Would you like me to explain how interest rates affect your loan amount?";

const EMI_EXPLANATION: &str = "EMI stands for Equated Monthly Installment. It's the amount you pay every month to repay your loan, including both principal and interest. Would you like me to explain how EMIs are calculated?";

const GENERAL_EXPLANATION: &str = "Financial literacy is key to making informed loan decisions. What specific financial aspect would you like to learn more about: credit scores, interest rates, EMIs, or budgeting?";

/// Canned-explanation responder for financial concepts.
pub struct FinancialLiteracyCoach;

impl FinancialLiteracyCoach {
    pub fn explain(topic: LiteracyTopic) -> TurnReply {
        let text = match topic {
            LiteracyTopic::CreditScore => CREDIT_SCORE_EXPLANATION,
            LiteracyTopic::Interest => INTEREST_EXPLANATION,
            LiteracyTopic::Emi => EMI_EXPLANATION,
            LiteracyTopic::General => GENERAL_EXPLANATION,
        };

        TurnReply {
            text: text.to_string(),
            agent: AgentTag::FinancialLiteracyCoach,
            context: None,
        }
    }
}

/// Single-turn application-process responder.
pub struct LoanApplicationGuide;

impl LoanApplicationGuide {
    pub fn guide(loan_type: LoanType) -> TurnReply {
        TurnReply {
            text: format!(
                "I can guide you through the {} loan application process. Would you like to know about the required documents or the steps involved?",
                loan_type
            ),
            agent: AgentTag::LoanApplicationGuide,
            context: None,
        }
    }
}
