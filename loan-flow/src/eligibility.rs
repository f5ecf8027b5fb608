//! EMI arithmetic and the eligibility rules applied at the end of the flow.

use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive};

use crate::customer::Customer;

/// Tunables for the eligibility rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Nominal annual interest rate in percent
    pub annual_rate_percent: f64,
    pub min_credit_score: u32,
    /// Share of self-declared income that may go to EMIs
    pub affordability_ratio: f64,
    /// Loans above this multiple of registered income need a salary slip
    pub large_loan_multiplier: f64,
    /// Accepted relative deviation between slip and registered income
    pub salary_tolerance: f64,
    /// Detected salaries above this multiple of registered income are read as annual
    pub annual_salary_multiplier: f64,
    /// Detected salaries above this are discarded as implausible
    pub max_plausible_salary: f64,
    /// Range used by [`MissingProfilePolicy::RandomScore`]
    pub fallback_score_range: RangeInclusive<u32>,
    pub missing_profile: MissingProfilePolicy,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            annual_rate_percent: 11.0,
            min_credit_score: 700,
            affordability_ratio: 0.5,
            large_loan_multiplier: 20.0,
            salary_tolerance: 0.30,
            annual_salary_multiplier: 8.0,
            max_plausible_salary: 5_000_000.0,
            fallback_score_range: 650..=820,
            missing_profile: MissingProfilePolicy::RandomScore,
        }
    }
}

/// What the final check does when the applicant has no stored profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProfilePolicy {
    /// Use the self-declared income and a random credit score
    #[default]
    RandomScore,
    /// Reject the application
    Reject,
}

/// Equated monthly installment for `principal` over `months` at `annual_rate_percent`.
///
/// EMI = P·r·(1+r)ⁿ / ((1+r)ⁿ − 1) with r the monthly rate; zero when `months <= 0`.
pub fn compute_emi(principal: f64, months: i64, annual_rate_percent: f64) -> f64 {
    if months <= 0 {
        return 0.0;
    }
    let r = annual_rate_percent / 100.0 / 12.0;
    if r <= 0.0 {
        return principal / months as f64;
    }
    let growth = (1.0 + r).powi(months as i32);
    principal * r * growth / (growth - 1.0)
}

/// Answers captured by the conversation that the final check needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub loan_amount: f64,
    pub tenure_months: u32,
    /// Self-declared monthly income
    pub income: f64,
    pub existing_emi: f64,
}

/// Income and score the lender has on file for the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegisteredProfile {
    pub monthly_income: f64,
    pub credit_score: u32,
}

impl From<&Customer> for RegisteredProfile {
    fn from(customer: &Customer) -> Self {
        Self {
            monthly_income: customer.monthly_income,
            credit_score: customer.credit_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Too large to decide without a salary slip
    SalarySlipRequired { emi: f64 },
    Rejected(Rejection),
    Approved { emi: f64, credit_score: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    LowCreditScore { score: u32 },
    EmiExceedsAllowance { emi: f64, allowed: f64 },
    ProfileMissing,
    SalaryUnverifiable,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::LowCreditScore { score } => {
                write!(f, "Loan rejected: credit score {score} below minimum.")
            }
            Rejection::EmiExceedsAllowance { emi, allowed } => {
                write!(f, "Loan rejected: EMI {emi:.0} exceeds allowed {allowed:.0}.")
            }
            Rejection::ProfileMissing => {
                f.write_str("Loan rejected: no customer profile found. Please sign up first.")
            }
            Rejection::SalaryUnverifiable => f.write_str(
                "Salary validation is not possible: no registered income on file. Application closed.",
            ),
        }
    }
}

impl EligibilityPolicy {
    pub fn emi(&self, principal: f64, months: u32) -> f64 {
        compute_emi(principal, i64::from(months), self.annual_rate_percent)
    }

    /// Room left for a new EMI once existing obligations are paid.
    pub fn allowed_emi(&self, income: f64, existing_emi: f64) -> f64 {
        (self.affordability_ratio * income - existing_emi).max(0.0)
    }

    pub fn requires_salary_slip(&self, loan_amount: f64, registered_income: f64) -> bool {
        loan_amount > self.large_loan_multiplier * registered_income
    }

    /// Full final check: large-loan gate, then credit score, then affordability.
    pub fn assess(&self, application: &LoanApplication, profile: &RegisteredProfile) -> Decision {
        if self.requires_salary_slip(application.loan_amount, profile.monthly_income) {
            return Decision::SalarySlipRequired {
                emi: self.emi(application.loan_amount, application.tenure_months),
            };
        }
        self.assess_affordability(application, profile.credit_score)
    }

    /// Credit score gate and affordability only.
    pub fn assess_affordability(
        &self,
        application: &LoanApplication,
        credit_score: u32,
    ) -> Decision {
        if credit_score < self.min_credit_score {
            return Decision::Rejected(Rejection::LowCreditScore {
                score: credit_score,
            });
        }

        let emi = self.emi(application.loan_amount, application.tenure_months);
        let allowed = self.allowed_emi(application.income, application.existing_emi);
        if emi > allowed {
            return Decision::Rejected(Rejection::EmiExceedsAllowance { emi, allowed });
        }

        Decision::Approved { emi, credit_score }
    }
}

/// Pre-approved limit shown by the quick eligibility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub credit_score: u32,
    pub pre_approved_limit: f64,
}

impl Quote {
    pub fn for_customer(customer: &Customer) -> Self {
        Self {
            credit_score: customer.credit_score,
            pre_approved_limit: customer.monthly_income * 12.0,
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Credit score: {} • Approx pre-approved: INR {:.0}",
            self.credit_score, self.pre_approved_limit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(loan_amount: f64, tenure_months: u32) -> LoanApplication {
        LoanApplication {
            loan_amount,
            tenure_months,
            income: 50_000.0,
            existing_emi: 0.0,
        }
    }

    fn profile(credit_score: u32) -> RegisteredProfile {
        RegisteredProfile {
            monthly_income: 50_000.0,
            credit_score,
        }
    }

    #[test]
    fn emi_matches_amortization_formula() {
        let r: f64 = 0.11 / 12.0;
        for (p, n) in [(200_000.0, 24), (1_000.0, 6), (750_000.0, 84)] {
            let growth = (1.0 + r).powi(n);
            let expected = p * r * growth / (growth - 1.0);
            assert!((compute_emi(p, n as i64, 11.0) - expected).abs() < 1e-6);
        }
        let emi = compute_emi(200_000.0, 24, 11.0);
        assert!((emi - 9321.5).abs() < 1.0, "emi was {emi}");
    }

    #[test]
    fn emi_is_zero_without_tenure() {
        assert_eq!(compute_emi(200_000.0, 0, 11.0), 0.0);
        assert_eq!(compute_emi(200_000.0, -3, 11.0), 0.0);
        assert_eq!(compute_emi(0.0, 12, 11.0), 0.0);
    }

    #[test]
    fn emi_decreases_with_tenure() {
        let mut previous = f64::INFINITY;
        for n in 1..=120 {
            let emi = compute_emi(500_000.0, n, 11.0);
            assert!(emi < previous, "n={n}");
            previous = emi;
        }
    }

    #[test]
    fn approves_affordable_loan() {
        let policy = EligibilityPolicy::default();
        match policy.assess(&application(200_000.0, 24), &profile(750)) {
            Decision::Approved { emi, credit_score } => {
                assert!((emi - 9321.5).abs() < 1.0);
                assert_eq!(credit_score, 750);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
        assert_eq!(policy.allowed_emi(50_000.0, 0.0), 25_000.0);
    }

    #[test]
    fn large_loan_needs_salary_slip_before_score_check() {
        let policy = EligibilityPolicy::default();
        for score in [300, 699, 750, 900] {
            let decision = policy.assess(&application(2_000_000.0, 24), &profile(score));
            assert!(matches!(decision, Decision::SalarySlipRequired { .. }), "score={score}");
        }
        // exactly 20x is not "above"
        let decision = policy.assess(&application(1_000_000.0, 84), &profile(750));
        assert!(!matches!(decision, Decision::SalarySlipRequired { .. }));
    }

    #[test]
    fn rejects_low_score_and_unaffordable_emi() {
        let policy = EligibilityPolicy::default();
        assert_eq!(
            policy.assess(&application(100_000.0, 24), &profile(699)),
            Decision::Rejected(Rejection::LowCreditScore { score: 699 })
        );

        let mut stretched = application(900_000.0, 12);
        stretched.existing_emi = 10_000.0;
        match policy.assess(&stretched, &profile(780)) {
            Decision::Rejected(Rejection::EmiExceedsAllowance { allowed, .. }) => {
                assert_eq!(allowed, 15_000.0)
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn allowance_never_negative() {
        let policy = EligibilityPolicy::default();
        assert_eq!(policy.allowed_emi(10_000.0, 20_000.0), 0.0);
    }

    #[test]
    fn quote_is_twelve_months_of_income() {
        let customer = Customer {
            customer_id: "100001".into(),
            name: "Asha".into(),
            password: "pw".into(),
            monthly_income: 50_000.0,
            age: 30,
            employment_type: "Salaried".into(),
            existing_emi: 0.0,
            credit_score: 750,
        };
        let quote = Quote::for_customer(&customer);
        assert_eq!(quote.pre_approved_limit, 600_000.0);
        assert_eq!(
            quote.to_string(),
            "Credit score: 750 • Approx pre-approved: INR 600000"
        );
    }
}
