//! Intent Classifier
//!
//! Classifies a fresh (non-continuing) user message into the sub-agent that
//! should handle it. Deterministic, first-match-wins over an ordered rule
//! list; the router consults the dialogue context store before calling this,
//! so an in-flight eligibility sub-dialogue never reaches classification.

use crate::models::LoanType;

/// Static keyword lists — zero allocation
const ELIGIBILITY_TERMS: &[&str] = &[
    "eligible", "qualify", "can i get", "eligibility", "requirements",
];

const APPLICATION_TERMS: &[&str] = &[
    "apply", "application", "process", "documents", "how to get",
];

const GREETING_WORDS: &[&str] = &["hello", "hi", "hey"];

/// Financial-literacy terms, most specific first. The first matching term
/// picks the canned explanation topic.
const FINANCIAL_TERMS: &[(&str, LiteracyTopic)] = &[
    ("credit score", LiteracyTopic::CreditScore),
    ("interest", LiteracyTopic::Interest),
    ("emi", LiteracyTopic::Emi),
    ("financial", LiteracyTopic::General),
    ("budget", LiteracyTopic::General),
    ("debt", LiteracyTopic::General),
];

/// Messages shorter than this are treated as greetings.
const SHORT_MESSAGE_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteracyTopic {
    CreditScore,
    Interest,
    Emi,
    General,
}

/// Outcome of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Start the eligibility sub-dialogue for this loan type.
    CheckEligibility(LoanType),
    /// Hand off to the application guide for this loan type.
    ApplicationGuide(LoanType),
    /// A loan type was mentioned but no recognizable intent; ask which
    /// direction the user wants to go.
    ClarifyLoanType(LoanType),
    /// Explain a financial concept.
    FinancialLiteracy(LiteracyTopic),
    /// Greeting or very short message.
    Greeting,
    /// Nothing matched; ask a generic clarifying question.
    Clarify,
}

/// Intent classifier
pub struct IntentClassifier;

impl IntentClassifier {
    /// Classify a user message. Rules are evaluated top to bottom and the
    /// first match wins; empty input falls through to the generic prompt.
    pub fn classify(message: &str) -> Intent {
        let text = message.to_lowercase();

        if text.trim().is_empty() {
            return Intent::Clarify;
        }

        // Loan-type scan in fixed list order, not message order.
        let matched_loan_type = LoanType::SCAN_ORDER
            .iter()
            .copied()
            .find(|loan_type| text.contains(loan_type.token()));

        if let Some(loan_type) = matched_loan_type {
            if contains_any(&text, ELIGIBILITY_TERMS) {
                return Intent::CheckEligibility(loan_type);
            }
            if contains_any(&text, APPLICATION_TERMS) {
                return Intent::ApplicationGuide(loan_type);
            }
            return Intent::ClarifyLoanType(loan_type);
        }

        if let Some((_, topic)) = FINANCIAL_TERMS
            .iter()
            .find(|(term, _)| text.contains(term))
        {
            return Intent::FinancialLiteracy(*topic);
        }

        if is_greeting(&text) || text.chars().count() < SHORT_MESSAGE_CHARS {
            return Intent::Greeting;
        }

        Intent::Clarify
    }
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

/// Word-boundary match so "this" or "history" don't read as greetings.
fn is_greeting(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETING_WORDS.contains(&word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility_intent_with_loan_type() {
        let cases = vec![
            "Am I eligible for a personal loan?",
            "do i qualify for a home loan",
            "can i get a car loan",
            "what are the requirements for an education loan",
            "business loan eligibility",
        ];

        for c in cases {
            match IntentClassifier::classify(c) {
                Intent::CheckEligibility(_) => {}
                other => panic!("expected CheckEligibility for {:?}, got {:?}", c, other),
            }
        }
    }

    #[test]
    fn test_token_order_in_message_is_irrelevant() {
        // "eligible" before and after the loan type both route the same way.
        assert_eq!(
            IntentClassifier::classify("eligible for a mortgage?"),
            Intent::CheckEligibility(LoanType::Mortgage)
        );
        assert_eq!(
            IntentClassifier::classify("mortgage - am i eligible?"),
            Intent::CheckEligibility(LoanType::Mortgage)
        );
    }

    #[test]
    fn test_first_loan_type_in_scan_order_wins() {
        // Both "home" and "business" appear; scan order puts business first.
        assert_eq!(
            IntentClassifier::classify("am i eligible for a home business loan"),
            Intent::CheckEligibility(LoanType::Business)
        );
    }

    #[test]
    fn test_application_intent() {
        assert_eq!(
            IntentClassifier::classify("how do I apply for a home loan"),
            Intent::ApplicationGuide(LoanType::Home)
        );
        assert_eq!(
            IntentClassifier::classify("documents needed for a car loan"),
            Intent::ApplicationGuide(LoanType::Car)
        );
    }

    #[test]
    fn test_eligibility_beats_application_when_both_match() {
        assert_eq!(
            IntentClassifier::classify("am i eligible to apply for a personal loan"),
            Intent::CheckEligibility(LoanType::Personal)
        );
    }

    #[test]
    fn test_loan_type_without_intent_asks_for_direction() {
        assert_eq!(
            IntentClassifier::classify("tell me about education loans please"),
            Intent::ClarifyLoanType(LoanType::Education)
        );
    }

    #[test]
    fn test_financial_literacy_specificity() {
        assert_eq!(
            IntentClassifier::classify("what is a credit score and how does interest work"),
            Intent::FinancialLiteracy(LiteracyTopic::CreditScore)
        );
        assert_eq!(
            IntentClassifier::classify("explain interest rates to me please"),
            Intent::FinancialLiteracy(LiteracyTopic::Interest)
        );
        assert_eq!(
            IntentClassifier::classify("how is my monthly emi calculated"),
            Intent::FinancialLiteracy(LiteracyTopic::Emi)
        );
        assert_eq!(
            IntentClassifier::classify("i want to get better at budgeting my money"),
            Intent::FinancialLiteracy(LiteracyTopic::General)
        );
    }

    #[test]
    fn test_greetings_and_short_messages() {
        assert_eq!(IntentClassifier::classify("Hello there!"), Intent::Greeting);
        assert_eq!(IntentClassifier::classify("hi"), Intent::Greeting);
        assert_eq!(IntentClassifier::classify("ok"), Intent::Greeting);
        // "this" must not be read as "hi"
        assert_eq!(
            IntentClassifier::classify("this is a message about nothing in particular"),
            Intent::Clarify
        );
    }

    #[test]
    fn test_empty_input_falls_through_to_clarify() {
        assert_eq!(IntentClassifier::classify(""), Intent::Clarify);
        assert_eq!(IntentClassifier::classify("   "), Intent::Clarify);
    }
}
