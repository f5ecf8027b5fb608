use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    Context, NextAction, Reply, ReplyKind, Result, Stage, TaskResult,
    customer::CustomerStore,
    eligibility::{
        Decision, EligibilityPolicy, LoanApplication, MissingProfilePolicy, RegisteredProfile,
        Rejection,
    },
};

use super::session_keys;

/// Eligibility rules plus access to the registered customer profile.
///
/// Shared by the final check after the last question and by the salary
/// slip upload.
pub struct Underwriter {
    customers: Arc<dyn CustomerStore>,
    policy: EligibilityPolicy,
}

impl Underwriter {
    pub fn new(customers: Arc<dyn CustomerStore>, policy: EligibilityPolicy) -> Self {
        Self { customers, policy }
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Registered income and score for the applicant, with the missing
    /// profile policy applied. `None` means the application must be rejected.
    pub async fn registered_profile(
        &self,
        context: &Context,
        application: &LoanApplication,
    ) -> Result<Option<RegisteredProfile>> {
        if let Some(customer) = self.customers.lookup(context.customer_id()).await? {
            return Ok(Some(RegisteredProfile::from(&customer)));
        }

        match self.policy.missing_profile {
            MissingProfilePolicy::Reject => {
                warn!(customer_id = %context.customer_id(), "No customer profile, rejecting");
                Ok(None)
            }
            MissingProfilePolicy::RandomScore => {
                let credit_score = rand::rng()
                    .random_range(self.policy.fallback_score_range.clone());
                warn!(
                    customer_id = %context.customer_id(),
                    credit_score,
                    "No customer profile, using declared income and a random score"
                );
                Ok(Some(RegisteredProfile {
                    monthly_income: application.income,
                    credit_score,
                }))
            }
        }
    }

    /// Turn a decision into the reply and transition for this turn.
    pub fn conclude(
        &self,
        context: &mut Context,
        application: &LoanApplication,
        decision: Decision,
    ) -> Result<TaskResult> {
        match decision {
            Decision::SalarySlipRequired { emi } => {
                context.set(session_keys::EMI, emi)?;
                info!(
                    customer_id = %context.customer_id(),
                    loan_amount = application.loan_amount,
                    decision = "salary_slip_required",
                    "Large loan, asking for salary slip"
                );
                Ok(TaskResult::new_with_status(
                    Reply::new(
                        ReplyKind::UploadRequired,
                        format!(
                            "The requested amount is above {:.0}x your registered monthly income. \
                             Please upload your latest salary slip to continue.",
                            self.policy.large_loan_multiplier
                        ),
                    ),
                    NextAction::GoTo(Stage::AwaitSalaryUpload),
                    "Waiting for salary slip",
                ))
            }
            Decision::Rejected(rejection) => Ok(reject(context, rejection)),
            Decision::Approved { emi, credit_score } => {
                context.set(session_keys::EMI, emi)?;
                info!(
                    customer_id = %context.customer_id(),
                    emi,
                    credit_score,
                    decision = "approved",
                    "Application eligible"
                );
                Ok(TaskResult::new_with_status(
                    Reply::new(
                        ReplyKind::ConfirmationRequired,
                        format!(
                            "Eligible!\n{}\nDo you want to proceed? (yes/no)",
                            summary(application, emi, credit_score)
                        ),
                    ),
                    NextAction::Continue,
                    "Waiting for confirmation",
                ))
            }
        }
    }
}

pub(crate) fn reject(context: &Context, rejection: Rejection) -> TaskResult {
    info!(
        customer_id = %context.customer_id(),
        decision = "rejected",
        reason = ?rejection,
        "Application rejected"
    );
    TaskResult::new_with_status(
        Reply::new(ReplyKind::Rejected, rejection.to_string()),
        NextAction::End,
        "Application rejected",
    )
}

pub(crate) fn summary(application: &LoanApplication, emi: f64, credit_score: u32) -> String {
    format!(
        "Loan: INR {:.0}\nTenure: {} months\nEstimated EMI: INR {:.0}\nCredit score: {}",
        application.loan_amount, application.tenure_months, emi, credit_score
    )
}
