use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    Context, Input, NextAction, Reply, ReplyKind, Result, Stage, Task, TaskResult,
    customer::CustomerStore,
    eligibility::LoanApplication,
    sanction::{SanctionGenerator, SanctionRequest},
};

use super::{session_keys, types::{KycDetails, require}};

/// Yes/no on an eligible application. "yes" produces the sanction letter.
pub struct ConfirmTask {
    customers: Arc<dyn CustomerStore>,
    sanctions: Arc<dyn SanctionGenerator>,
}

impl ConfirmTask {
    pub fn new(customers: Arc<dyn CustomerStore>, sanctions: Arc<dyn SanctionGenerator>) -> Self {
        Self {
            customers,
            sanctions,
        }
    }

    async fn sanction(&self, context: &Context) -> Result<TaskResult> {
        let Some(customer) = self.customers.lookup(context.customer_id()).await? else {
            warn!(customer_id = %context.customer_id(), "Profile disappeared before sanction");
            return Ok(TaskResult::new(
                Reply::new(ReplyKind::Rejected, "Master profile missing."),
                NextAction::End,
            ));
        };

        let application = LoanApplication::from_context(context)?;
        let request = SanctionRequest {
            customer,
            kyc: KycDetails::from_context(context)?,
            loan_amount: application.loan_amount,
            tenure_months: application.tenure_months,
            emi: require(context, session_keys::EMI)?,
        };

        let path = self.sanctions.generate(&request).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(
            customer_id = %context.customer_id(),
            loan_amount = request.loan_amount,
            file_name = %file_name,
            "Loan sanctioned"
        );

        Ok(TaskResult::new_with_status(
            Reply::new(
                ReplyKind::Sanctioned,
                format!("🎉 Loan sanctioned! Download: {file_name}"),
            ),
            NextAction::End,
            format!("Sanction letter generated: {file_name}"),
        )
        .with_artifact(path))
    }
}

#[async_trait]
impl Task for ConfirmTask {
    fn stage(&self) -> Stage {
        Stage::Confirm
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let answer = input.as_text().to_lowercase();
        if answer == "yes" || answer == "y" {
            return self.sanction(context).await;
        }

        info!(customer_id = %context.customer_id(), "Application cancelled by customer");
        Ok(TaskResult::new(
            Reply::new(ReplyKind::Cancelled, "Application cancelled."),
            NextAction::End,
        ))
    }
}
