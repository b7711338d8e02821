//! Eligibility Decision Engine
//!
//! Pure function from collected slots to an eligibility verdict, following
//! simplified Indian banking affordability rules: 50% of income as maximum
//! EMI, a tenure multiplier per loan type, and a 30% haircut for existing
//! obligations. No I/O, no shared state; identical inputs give identical
//! results.

use crate::formatter::format_inr;
use crate::models::{CreditScore, EligibilityResult, LoanType};

/// Minimum monthly income across all loan types, in INR.
const MIN_MONTHLY_INCOME: f64 = 15000.0;

/// Minimum known credit score accepted by most lenders.
const MIN_CREDIT_SCORE: u32 = 650;

/// Share of monthly income that can go toward an EMI.
const MAX_EMI_RATIO: f64 = 0.5;

/// Affordability haircut applied when existing loans are being serviced.
const EXISTING_LOANS_FACTOR: f64 = 0.7;

/// Tenure multiplier (months) used to scale the maximum EMI into a maximum
/// loan amount. Personal loans are the default 3-year term.
pub fn term_months(loan_type: LoanType) -> f64 {
    match loan_type {
        LoanType::Home | LoanType::Mortgage => 300.0, // 25 years
        LoanType::Business => 60.0,                   // 5 years
        LoanType::Car => 84.0,                        // 7 years
        LoanType::Education => 120.0,                 // 10 years
        LoanType::Personal => 36.0,
    }
}

/// Decide eligibility. Rules run in order; the first applicable terminates.
pub fn decide(
    loan_type: LoanType,
    monthly_income: f64,
    credit_score: CreditScore,
    has_existing_loans: bool,
    requested_loan_amount: f64,
) -> EligibilityResult {
    if monthly_income < MIN_MONTHLY_INCOME {
        return EligibilityResult {
            is_eligible: false,
            max_loan_amount: None,
            reason: Some(
                "Your monthly income is below the minimum requirement for most loan types."
                    .to_string(),
            ),
            suggested_actions: vec![
                "Look for loan options specifically designed for low-income individuals."
                    .to_string(),
            ],
        };
    }

    if let CreditScore::Known(score) = credit_score {
        if score < MIN_CREDIT_SCORE {
            return EligibilityResult {
                is_eligible: false,
                max_loan_amount: None,
                reason: Some(
                    "Your credit score is below the minimum threshold required by most lenders."
                        .to_string(),
                ),
                suggested_actions: vec![
                    "Work on improving your credit score before applying.".to_string(),
                    "Consider a secured loan option that requires collateral.".to_string(),
                ],
            };
        }
    }

    let max_emi = monthly_income * MAX_EMI_RATIO;
    let mut affordable = max_emi * term_months(loan_type);
    if has_existing_loans {
        affordable *= EXISTING_LOANS_FACTOR;
    }

    if requested_loan_amount <= affordable {
        EligibilityResult {
            is_eligible: true,
            max_loan_amount: Some(affordable),
            reason: None,
            suggested_actions: vec![],
        }
    } else {
        EligibilityResult {
            is_eligible: false,
            max_loan_amount: Some(affordable),
            reason: Some(
                "The requested loan amount exceeds your estimated affordability.".to_string(),
            ),
            suggested_actions: vec![format!(
                "Consider reducing your loan request to under {}.",
                format_inr(affordable)
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_income_short_circuits() {
        // Regardless of everything else, income below 15000 is ineligible.
        let result = decide(
            LoanType::Home,
            10000.0,
            CreditScore::Known(800),
            false,
            1.0,
        );
        assert!(!result.is_eligible);
        assert!(result.reason.unwrap().contains("monthly income"));
        assert_eq!(result.suggested_actions.len(), 1);
        assert!(result.max_loan_amount.is_none());
    }

    #[test]
    fn test_low_credit_score_is_ineligible() {
        let result = decide(
            LoanType::Personal,
            40000.0,
            CreditScore::Known(620),
            false,
            100000.0,
        );
        assert!(!result.is_eligible);
        assert!(result.reason.unwrap().contains("credit score"));
        assert_eq!(result.suggested_actions.len(), 2);
    }

    #[test]
    fn test_unknown_credit_score_skips_the_score_rule() {
        let result = decide(
            LoanType::Personal,
            40000.0,
            CreditScore::Unknown,
            false,
            100000.0,
        );
        assert!(result.is_eligible);
    }

    #[test]
    fn test_personal_loan_affordability() {
        // maxEmi = 20000, multiplier 36 => affordable 720000.
        let result = decide(
            LoanType::Personal,
            40000.0,
            CreditScore::Known(700),
            false,
            500000.0,
        );
        assert!(result.is_eligible);
        assert_eq!(result.max_loan_amount, Some(720000.0));
        assert!(result.suggested_actions.is_empty());
    }

    #[test]
    fn test_requested_above_affordable() {
        let result = decide(
            LoanType::Personal,
            40000.0,
            CreditScore::Known(700),
            false,
            800000.0,
        );
        assert!(!result.is_eligible);
        assert_eq!(result.max_loan_amount, Some(720000.0));
        assert!(result.reason.unwrap().contains("exceeds"));
        assert_eq!(result.suggested_actions.len(), 1);
        assert!(result.suggested_actions[0].contains("₹7,20,000"));
    }

    #[test]
    fn test_existing_loans_apply_exact_seventy_percent() {
        let without = decide(
            LoanType::Car,
            50000.0,
            CreditScore::Known(720),
            false,
            100000.0,
        );
        let with = decide(
            LoanType::Car,
            50000.0,
            CreditScore::Known(720),
            true,
            100000.0,
        );
        let base = without.max_loan_amount.unwrap();
        let reduced = with.max_loan_amount.unwrap();
        assert!((reduced - base * 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_term_multipliers_per_loan_type() {
        assert_eq!(term_months(LoanType::Home), 300.0);
        assert_eq!(term_months(LoanType::Mortgage), 300.0);
        assert_eq!(term_months(LoanType::Business), 60.0);
        assert_eq!(term_months(LoanType::Car), 84.0);
        assert_eq!(term_months(LoanType::Education), 120.0);
        assert_eq!(term_months(LoanType::Personal), 36.0);
    }

    #[test]
    fn test_affordability_is_monotonic_in_income() {
        let mut previous = 0.0;
        for income in [15000.0, 20000.0, 40000.0, 80000.0, 160000.0] {
            let result = decide(
                LoanType::Education,
                income,
                CreditScore::Known(700),
                true,
                1.0,
            );
            let affordable = result.max_loan_amount.unwrap();
            assert!(affordable >= previous, "affordability dropped at {}", income);
            previous = affordable;
        }
    }

    #[test]
    fn test_determinism() {
        let a = decide(
            LoanType::Business,
            60000.0,
            CreditScore::Known(690),
            true,
            1000000.0,
        );
        let b = decide(
            LoanType::Business,
            60000.0,
            CreditScore::Known(690),
            true,
            1000000.0,
        );
        assert_eq!(a.is_eligible, b.is_eligible);
        assert_eq!(a.max_loan_amount, b.max_loan_amount);
        assert_eq!(a.suggested_actions, b.suggested_actions);
    }
}
