//! Response Formatter
//!
//! Renders structured sub-agent output into human-readable text. Purely
//! presentational; no decision logic lives here.

use crate::models::{CollectedSlots, EligibilityResult};

/// Format a rupee amount with Indian digit grouping: the last three digits,
/// then groups of two (₹7,20,000). Amounts are rounded to whole rupees.
pub fn format_inr(amount: f64) -> String {
    let rupees = amount.round() as i64;
    let negative = rupees < 0;
    let digits = rupees.abs().to_string();

    let mut grouped = String::new();
    let len = digits.len();
    if len <= 3 {
        grouped.push_str(&digits);
    } else {
        let head = &digits[..len - 3];
        let tail = &digits[len - 3..];

        // Group the head in pairs from the right.
        let head_bytes = head.as_bytes();
        let mut parts: Vec<&str> = Vec::new();
        let mut end = head_bytes.len();
        while end > 2 {
            parts.push(&head[end - 2..end]);
            end -= 2;
        }
        parts.push(&head[..end]);
        parts.reverse();

        grouped.push_str(&parts.join(","));
        grouped.push(',');
        grouped.push_str(tail);
    }

    if negative {
        format!("-₹{}", grouped)
    } else {
        format!("₹{}", grouped)
    }
}

/// Render the terminal assessment: headline, slot summary, maximum
/// affordable amount, and suggested actions.
pub fn render_assessment(result: &EligibilityResult, slots: &CollectedSlots) -> String {
    let mut out = String::new();

    if result.is_eligible {
        out.push_str(&format!(
            "Great news! Based on the information you've provided, you appear to be eligible for a {} loan of {}.\n\n",
            slots.loan_type,
            format_inr(slots.requested_loan_amount)
        ));
    } else {
        out.push_str(&format!(
            "Based on the information you've provided, you may face challenges in qualifying for a {} loan of {}.\n\n",
            slots.loan_type,
            format_inr(slots.requested_loan_amount)
        ));
        if let Some(reason) = &result.reason {
            out.push_str(&format!("Reason: {}\n\n", reason));
        }
    }

    out.push_str("Here's a summary of your information:\n");
    out.push_str(&format!("- Employment Status: {}\n", slots.employment_status));
    out.push_str(&format!(
        "- Monthly Income: {}\n",
        format_inr(slots.monthly_income)
    ));
    out.push_str(&format!(
        "- Requested Loan Amount: {}\n",
        format_inr(slots.requested_loan_amount)
    ));

    if let Some(max_amount) = result.max_loan_amount {
        out.push_str(&format!(
            "\nYour estimated maximum affordable loan amount is {}.\n",
            format_inr(max_amount)
        ));
    }

    if !result.suggested_actions.is_empty() {
        out.push_str("\nHere are some suggestions:\n");
        for action in &result.suggested_actions {
            out.push_str(&format!("- {}\n", action));
        }
    }

    if result.is_eligible {
        out.push_str(
            "\nPlease note that this is an initial assessment. Actual loan approval will depend on the lender's specific criteria, documentation verification, and a detailed credit assessment. Would you like to learn about the application process for this loan?",
        );
    } else {
        out.push_str("\nWould you like to know how to improve your chances of loan approval?");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreditScore, LoanType};

    #[test]
    fn test_indian_grouping() {
        assert_eq!(format_inr(0.0), "₹0");
        assert_eq!(format_inr(500.0), "₹500");
        assert_eq!(format_inr(1000.0), "₹1,000");
        assert_eq!(format_inr(15000.0), "₹15,000");
        assert_eq!(format_inr(720000.0), "₹7,20,000");
        assert_eq!(format_inr(1234567.0), "₹12,34,567");
        assert_eq!(format_inr(100000000.0), "₹10,00,00,000");
    }

    #[test]
    fn test_rounds_to_whole_rupees() {
        assert_eq!(format_inr(719999.6), "₹7,20,000");
    }

    fn sample_slots() -> CollectedSlots {
        CollectedSlots {
            loan_type: LoanType::Personal,
            employment_status: "salaried".to_string(),
            monthly_income: 40000.0,
            credit_score: CreditScore::Known(700),
            has_existing_loans: false,
            requested_loan_amount: 500000.0,
        }
    }

    #[test]
    fn test_eligible_rendering() {
        let result = EligibilityResult {
            is_eligible: true,
            max_loan_amount: Some(720000.0),
            reason: None,
            suggested_actions: vec![],
        };
        let text = render_assessment(&result, &sample_slots());

        assert!(text.starts_with("Great news!"));
        assert!(text.contains("personal loan of ₹5,00,000"));
        assert!(text.contains("- Employment Status: salaried"));
        assert!(text.contains("- Monthly Income: ₹40,000"));
        assert!(text.contains("maximum affordable loan amount is ₹7,20,000"));
        assert!(text.contains("application process"));
    }

    #[test]
    fn test_ineligible_rendering_lists_suggestions() {
        let result = EligibilityResult {
            is_eligible: false,
            max_loan_amount: Some(720000.0),
            reason: Some("The requested loan amount exceeds your estimated affordability.".into()),
            suggested_actions: vec![
                "Consider reducing your loan request to under ₹7,20,000.".to_string(),
            ],
        };
        let text = render_assessment(&result, &sample_slots());

        assert!(text.contains("may face challenges"));
        assert!(text.contains("Reason: The requested loan amount exceeds"));
        assert!(text.contains("- Consider reducing your loan request to under ₹7,20,000."));
        assert!(text.contains("improve your chances"));
    }
}
