//! Loan Eligibility Checker
//!
//! Multi-turn slot-filling state machine. Each user message advances the
//! dialogue exactly one stage, in fixed forward order:
//! employmentStatus → monthlyIncome → creditScore → existingLoans →
//! loanAmount → assessment. The terminal stage invokes the decision engine,
//! renders the verdict, and clears the context.

use crate::decision;
use crate::formatter::render_assessment;
use crate::models::{AgentTag, CreditScore, DialogueContext, LoanType, Stage, TurnReply};
use tracing::{debug, warn};

/// Phrases that map the credit-score answer to the "unknown" sentinel.
const UNKNOWN_SCORE_PHRASES: &[&str] = &["don't know", "dont know", "not sure"];

const CREDIT_SCORE_EXPLAINER: &str = "No problem. A credit score is a number that represents your creditworthiness. It ranges from 300 to 900 in India, with higher scores indicating better credit health. ";

const EXISTING_LOANS_QUESTION: &str =
    "Do you have any existing loans or EMIs that you're currently paying? (Yes/No)";

/// The slot-filling sub-agent.
pub struct EligibilityChecker;

impl EligibilityChecker {
    /// Open a new sub-dialogue for the given loan type. The first question
    /// goes out immediately; the stored context awaits the answer.
    pub fn begin(loan_type: LoanType) -> TurnReply {
        TurnReply {
            text: format!(
                "I'd be happy to check your eligibility for a {} loan. Let me ask you a few questions. What is your current employment status?",
                loan_type
            ),
            agent: AgentTag::LoanEligibilityChecker,
            context: Some(DialogueContext::start(loan_type)),
        }
    }

    /// Consume one user message and advance the dialogue. A returned
    /// `context: None` means the sub-dialogue is over.
    pub fn advance(mut ctx: DialogueContext, message: &str) -> TurnReply {
        debug!(stage = ?ctx.stage, loan_type = %ctx.loan_type, "eligibility dialogue advancing");

        match ctx.stage {
            Stage::EmploymentStatus => {
                ctx.employment_status = Some(message.trim().to_string());
                ctx.stage = Stage::MonthlyIncome;
                let text = format!(
                    "Thank you. For a {} loan, we'll need to assess your financial situation. What is your approximate monthly income (in INR)?",
                    ctx.loan_type
                );
                continue_with(ctx, text)
            }

            Stage::MonthlyIncome => match extract_amount(message) {
                Some(income) => {
                    ctx.monthly_income = Some(income);
                    ctx.stage = Stage::CreditScore;
                    continue_with(
                        ctx,
                        "That's helpful information. Do you know your credit score? If you don't know the exact number, you can say 'I don't know'.".to_string(),
                    )
                }
                // Stage does not advance; ask again rather than store garbage.
                None => continue_with(
                    ctx,
                    "I couldn't find a number in that. What is your approximate monthly income (in INR)?".to_string(),
                ),
            },

            Stage::CreditScore => {
                let score = extract_credit_score(message);
                ctx.credit_score = Some(score);
                ctx.stage = Stage::ExistingLoans;

                let text = if score.is_known() {
                    EXISTING_LOANS_QUESTION.to_string()
                } else {
                    format!("{}{}", CREDIT_SCORE_EXPLAINER, EXISTING_LOANS_QUESTION)
                };
                continue_with(ctx, text)
            }

            Stage::ExistingLoans => {
                ctx.has_existing_loans = Some(message.to_lowercase().contains("yes"));
                ctx.stage = Stage::LoanAmount;
                let text = format!(
                    "Thank you. How much {} loan amount are you looking for (in INR)?",
                    ctx.loan_type
                );
                continue_with(ctx, text)
            }

            Stage::LoanAmount => match extract_amount(message) {
                Some(amount) => {
                    ctx.requested_loan_amount = Some(amount);
                    ctx.stage = Stage::Assessment;
                    Self::assess(ctx)
                }
                None => {
                    let text = format!(
                        "I couldn't find a number in that. How much {} loan amount are you looking for (in INR)?",
                        ctx.loan_type
                    );
                    continue_with(ctx, text)
                }
            },

            // A terminal context should have been cleared already; start over.
            Stage::Assessment => Self::restart(ctx.loan_type),
        }
    }

    /// Restart the dialogue from the first question (defensive reset for an
    /// unrecognized or stale context).
    pub fn restart(loan_type: LoanType) -> TurnReply {
        warn!(loan_type = %loan_type, "eligibility context unusable, restarting dialogue");
        TurnReply {
            text: format!(
                "Let's check your eligibility for a {} loan. What is your current employment status?",
                loan_type
            ),
            agent: AgentTag::LoanEligibilityChecker,
            context: Some(DialogueContext::start(loan_type)),
        }
    }

    /// Terminal stage: run the decision engine and clear the context.
    fn assess(ctx: DialogueContext) -> TurnReply {
        let Some(slots) = ctx.collected() else {
            // A slot is missing despite reaching assessment; the context is
            // corrupt, so reset instead of guessing values.
            return Self::restart(ctx.loan_type);
        };

        let result = decision::decide(
            slots.loan_type,
            slots.monthly_income,
            slots.credit_score,
            slots.has_existing_loans,
            slots.requested_loan_amount,
        );

        debug!(
            eligible = result.is_eligible,
            max_loan_amount = ?result.max_loan_amount,
            "assessment complete"
        );

        TurnReply {
            text: render_assessment(&result, &slots),
            agent: AgentTag::LoanEligibilityChecker,
            context: None,
        }
    }
}

fn continue_with(ctx: DialogueContext, text: String) -> TurnReply {
    TurnReply {
        text,
        agent: AgentTag::LoanEligibilityChecker,
        context: Some(ctx),
    }
}

/// Strip everything except digits and the decimal point, then parse.
/// Returns `None` when no valid number remains (e.g. "quite a lot").
fn extract_amount(message: &str) -> Option<f64> {
    let digits: String = message
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Credit score answers: an explicit "don't know" (or no usable number at
/// all) becomes the unknown sentinel, otherwise the first integer wins.
fn extract_credit_score(message: &str) -> CreditScore {
    let lower = message.to_lowercase();
    if UNKNOWN_SCORE_PHRASES.iter().any(|p| lower.contains(p)) {
        return CreditScore::Unknown;
    }

    let digits: String = message.chars().filter(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .map(CreditScore::Known)
        .unwrap_or(CreditScore::Unknown)
}
