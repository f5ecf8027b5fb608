use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::{
    Context, Input, NextAction, Reply, ReplyKind, Result, Stage, Task, TaskResult,
    eligibility::{LoanApplication, Rejection},
    reconcile::reconcile,
};

use super::{
    session_keys,
    underwriting::{Underwriter, reject, summary},
};

const UPLOAD_REMINDER: &str = "Please upload your salary slip using the upload option to continue.";

/// Waits for a salary slip and checks it against the registered income.
///
/// A slip within tolerance goes through the normal score and affordability
/// rules. A slip outside tolerance is not rejected: the application moves on
/// to confirmation flagged for manual verification.
pub struct SalaryUploadTask {
    underwriter: Arc<Underwriter>,
}

impl SalaryUploadTask {
    pub fn new(underwriter: Arc<Underwriter>) -> Self {
        Self { underwriter }
    }
}

#[async_trait]
impl Task for SalaryUploadTask {
    fn stage(&self) -> Stage {
        Stage::AwaitSalaryUpload
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let Input::Upload(upload) = input else {
            return Ok(TaskResult::new(
                Reply::new(ReplyKind::UploadRequired, UPLOAD_REMINDER),
                NextAction::WaitForInput,
            ));
        };

        let application = LoanApplication::from_context(context)?;
        let Some(profile) = self
            .underwriter
            .registered_profile(context, &application)
            .await?
        else {
            return Ok(reject(context, Rejection::ProfileMissing));
        };

        let policy = self.underwriter.policy();
        let Some(check) = reconcile(policy, profile.monthly_income, upload) else {
            return Ok(reject(context, Rejection::SalaryUnverifiable));
        };

        info!(
            customer_id = %context.customer_id(),
            file_name = %upload.file_name,
            detected = check.detected,
            monthly = check.monthly,
            source = ?check.source,
            within_tolerance = check.within_tolerance,
            "Salary slip reconciled"
        );

        if check.within_tolerance {
            let decision = policy.assess_affordability(&application, profile.credit_score);
            return self.underwriter.conclude(context, &application, decision);
        }

        let emi = policy.emi(application.loan_amount, application.tenure_months);
        context.set(session_keys::EMI, emi)?;

        Ok(TaskResult::new_with_status(
            Reply::new(
                ReplyKind::ManualVerification,
                format!(
                    "Salary on the slip (INR {:.0}/month) does not match your registered income \
                     (INR {:.0}/month). Your application will need manual verification.\n{}\n\
                     Do you want to proceed? (yes/no)",
                    check.monthly,
                    profile.monthly_income,
                    summary(&application, emi, profile.credit_score)
                ),
            ),
            NextAction::Continue,
            "Salary mismatch, flagged for manual verification",
        ))
    }
}
